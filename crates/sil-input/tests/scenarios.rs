// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use sil_input::usage::{PAGE_BUTTON, PAGE_GENERIC_DESKTOP};
use sil_input::{
    database, BuiltinDeviceDatabase, DeviceId, DeviceProfile, DpadMode, HidDescriptor, HidJoystick,
    JoystickEvent, LogicalButton, ProfileEntry, TableDeviceDatabase, TriggerSource, ValueAxis,
};

const PAD: DeviceId = DeviceId(7);

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn dualshock() -> HidJoystick {
    let descriptor = HidDescriptor::new(
        database::VENDOR_SONY,
        database::PRODUCT_DUALSHOCK4,
        0x0100,
        "Wireless Controller",
    )
    .with_numbered_buttons(14)
    .with_axis(ValueAxis::X, 0, 255)
    .with_axis(ValueAxis::Y, 0, 255)
    .with_axis(ValueAxis::Z, 0, 255)
    .with_axis(ValueAxis::RX, 0, 255)
    .with_axis(ValueAxis::RY, 0, 255)
    .with_axis(ValueAxis::RZ, 0, 255)
    .with_axis(ValueAxis::Hat, 0, 7);
    let db = BuiltinDeviceDatabase::default();
    HidJoystick::new(PAD, &descriptor, Some(&db))
}

fn dpad_changes(events: &[JoystickEvent]) -> Vec<(i8, i8)> {
    events
        .iter()
        .filter_map(|event| match *event {
            JoystickEvent::DpadChange { x, y, .. } => Some((x, y)),
            _ => None,
        })
        .collect()
}

#[test]
fn hat_positions_drive_the_dpad() {
    init_logs();
    let mut pad = dualshock();
    assert_eq!(pad.dpad_mode(), DpadMode::Hat);
    let hat = ValueAxis::Hat.usage();
    let mut events = Vec::new();

    pad.value_event(&mut events, PAGE_GENERIC_DESKTOP, hat, 0, 1);
    assert_eq!(pad.dpad(), (0, -1));
    pad.value_event(&mut events, PAGE_GENERIC_DESKTOP, hat, 4, 2);
    assert_eq!(pad.dpad(), (0, 1));
    pad.value_event(&mut events, PAGE_GENERIC_DESKTOP, hat, 7, 3);
    assert_eq!(pad.dpad(), (-1, -1));
    pad.value_event(&mut events, PAGE_GENERIC_DESKTOP, hat, 8, 4);
    assert_eq!(pad.dpad(), (0, 0));
    // Repeating the centred position changes nothing.
    pad.value_event(&mut events, PAGE_GENERIC_DESKTOP, hat, 8, 5);

    assert_eq!(
        dpad_changes(&events),
        vec![(0, -1), (0, 1), (-1, -1), (0, 0)]
    );
}

#[test]
fn analog_trigger_uses_hysteresis() {
    init_logs();
    let descriptor = HidDescriptor::new(0x2222, 0x0001, 1, "Racing pad")
        .with_numbered_buttons(4)
        .with_axis(ValueAxis::Z, 0, 255);
    let db = TableDeviceDatabase::new(vec![ProfileEntry {
        vendor: 0x2222,
        product: 0x0001,
        version: None,
        name: None,
        profile: DeviceProfile {
            name: "Racing pad".into(),
            buttons: vec![(LogicalButton::A, 0)],
            dpad: DpadMode::None,
            dpad_buttons: Vec::new(),
            sticks: Vec::new(),
            triggers: vec![(LogicalButton::R2, TriggerSource::Axis(ValueAxis::Z))],
        },
    }]);
    let mut pad = HidJoystick::new(PAD, &descriptor, Some(&db));
    let trigger = pad.button_mapping(LogicalButton::R2);
    assert_eq!(trigger, Some(4));
    let z = ValueAxis::Z.usage();
    let mut events = Vec::new();

    pad.value_event(&mut events, PAGE_GENERIC_DESKTOP, z, 127, 1);
    assert!(events.is_empty());

    pad.value_event(&mut events, PAGE_GENERIC_DESKTOP, z, 136, 2);
    assert_eq!(
        events,
        vec![JoystickEvent::ButtonDown {
            device: PAD,
            button: 4,
            time: 2
        }]
    );
    assert!(pad.is_button_pressed(4));

    pad.value_event(&mut events, PAGE_GENERIC_DESKTOP, z, 119, 3);
    assert_eq!(events.len(), 1);

    pad.value_event(&mut events, PAGE_GENERIC_DESKTOP, z, 115, 4);
    assert_eq!(
        events[1],
        JoystickEvent::ButtonUp {
            device: PAD,
            button: 4,
            time: 4
        }
    );
    assert!(!pad.is_button_pressed(4));
}

#[test]
fn dualshock_layout_is_canonical() {
    let pad = dualshock();
    assert_eq!(pad.num_buttons(), 16);
    assert_eq!(pad.num_sticks(), 2);
    assert_eq!(pad.stick_axes(0), Some((ValueAxis::X, ValueAxis::Y)));
    assert_eq!(pad.stick_axes(1), Some((ValueAxis::Z, ValueAxis::RZ)));
    assert_eq!(pad.button_mapping(LogicalButton::A), Some(1));
    assert_eq!(pad.button_mapping(LogicalButton::X), Some(0));
    assert_eq!(pad.button_mapping(LogicalButton::L2), Some(14));
    assert_eq!(pad.button_mapping(LogicalButton::R2), Some(15));
}

#[test]
fn sticks_report_once_per_timestamp() {
    let mut pad = dualshock();
    let mut events = Vec::new();
    let (x, y, z) = (
        ValueAxis::X.usage(),
        ValueAxis::Y.usage(),
        ValueAxis::Z.usage(),
    );

    pad.value_event(&mut events, PAGE_GENERIC_DESKTOP, x, 0, 10);
    pad.value_event(&mut events, PAGE_GENERIC_DESKTOP, y, 255, 10);
    pad.value_event(&mut events, PAGE_GENERIC_DESKTOP, z, 255, 10);
    assert!(events.is_empty());

    // A button report with a new timestamp releases the held-back sticks.
    pad.button_event(&mut events, PAGE_BUTTON, 1, 1, 11);
    assert_eq!(events.len(), 3);
    assert!(matches!(
        events[0],
        JoystickEvent::StickChange { stick: 0, time: 10, .. }
    ));
    assert!(matches!(
        events[1],
        JoystickEvent::StickChange { stick: 1, time: 10, .. }
    ));
    assert!(matches!(
        events[2],
        JoystickEvent::ButtonDown { button: 0, time: 11, .. }
    ));
    assert_eq!(pad.stick_position(0), Some((-1.0, 1.0)));
}

#[test]
fn disconnect_flushes_pending_sticks() {
    let mut pad = dualshock();
    let mut events = Vec::new();
    pad.connect(&mut events, 0);
    pad.value_event(&mut events, PAGE_GENERIC_DESKTOP, ValueAxis::X.usage(), 255, 1);
    pad.disconnect(&mut events, 2);

    assert_eq!(events.len(), 3);
    assert_eq!(events[0], JoystickEvent::Connected { device: PAD, time: 0 });
    assert!(matches!(events[1], JoystickEvent::StickChange { time: 1, .. }));
    assert_eq!(
        events[2],
        JoystickEvent::Disconnected { device: PAD, time: 2 }
    );
}

#[test]
fn dpad_buttons_still_report_as_buttons() {
    let descriptor = HidDescriptor::new(
        database::VENDOR_GENERIC_PAD,
        database::PRODUCT_GENERIC_PAD,
        0,
        "USB Gamepad",
    )
    .with_numbered_buttons(12);
    let db = BuiltinDeviceDatabase::default();
    let mut pad = HidJoystick::new(PAD, &descriptor, Some(&db));
    assert_eq!(pad.dpad_mode(), DpadMode::Buttons);
    assert_eq!(pad.num_sticks(), 0);
    let mut events = Vec::new();

    // Buttons 9 and 11 are up and left.
    pad.button_event(&mut events, PAGE_BUTTON, 9, 1, 1);
    pad.button_event(&mut events, PAGE_BUTTON, 11, 1, 2);
    pad.button_event(&mut events, PAGE_BUTTON, 9, 0, 3);

    assert_eq!(dpad_changes(&events), vec![(0, -1), (-1, -1), (-1, 0)]);
    assert!(matches!(
        events[0],
        JoystickEvent::ButtonDown { button: 8, .. }
    ));
}

#[test]
fn events_flow_through_a_channel() {
    let (mut tx, rx) = flume::unbounded::<JoystickEvent>();
    let mut pad = dualshock();
    pad.connect(&mut tx, 0);
    pad.button_event(&mut tx, PAGE_BUTTON, 2, 1, 1);
    pad.flush_events(&mut tx);
    drop(tx);

    let received: Vec<JoystickEvent> = rx.iter().collect();
    assert_eq!(received.len(), 2);
    assert!(received.iter().all(|event| event.device() == PAD));
}
