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

//! The per-device state machine turning HID reports into joystick events.

use crate::database::{DeviceDatabase, DeviceProfile, DpadMode, LogicalButton, TriggerSource};
use crate::descriptor::{
    decode_hat, default_sticks, normalize_buttons, normalize_values, HidDescriptor, ValueRange,
};
use crate::event::{DeviceId, EventSink, JoystickEvent};
use crate::usage::{self, Direction, ValueAxis};

/// Scaled trigger value at or above which a released trigger is pressed.
pub const TRIGGER_PRESS: f32 = 1.0 / 16.0;

/// Scaled trigger value below which a pressed trigger is released.
pub const TRIGGER_RELEASE: f32 = -3.0 / 32.0;

#[derive(Debug, Clone)]
struct Stick {
    axes: (ValueAxis, ValueAxis),
    position: (f32, f32),
    reported: (f32, f32),
    /// Timestamp of an unreported change.
    pending: Option<u64>,
}

impl Stick {
    fn new(axes: (ValueAxis, ValueAxis)) -> Self {
        Self {
            axes,
            position: (0.0, 0.0),
            reported: (0.0, 0.0),
            pending: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Trigger {
    axis: ValueAxis,
    button: usize,
}

/// A joystick normalised into buttons, sticks, a D-pad and triggers.
///
/// Feed it the device's raw reports through [`button_event`](Self::button_event)
/// and [`value_event`](Self::value_event), then call
/// [`flush_events`](Self::flush_events) once the batch is done. Reports must
/// come from one thread at a time.
///
/// Stick axes usually arrive as separate reports carrying the same
/// timestamp. Changes are held back until a report with another timestamp
/// arrives or the batch is flushed, so each stick produces at most one
/// [`JoystickEvent::StickChange`] per timestamp.
#[derive(Debug, Clone)]
pub struct HidJoystick {
    device: DeviceId,
    vendor: u16,
    product: u16,
    version: u16,
    name: String,
    serial: String,
    /// Sorted `(page << 16) | usage` keys of the physical buttons.
    buttons: Vec<u32>,
    /// Physical buttons followed by synthetic trigger buttons.
    pressed: Vec<bool>,
    native_dpad: bool,
    values: [Option<ValueRange>; ValueAxis::COUNT],
    sticks: Vec<Stick>,
    triggers: Vec<Trigger>,
    button_map: [Option<usize>; LogicalButton::COUNT],
    dpad_mode: DpadMode,
    dpad_buttons: [Option<usize>; 4],
    dpad_held: [bool; 4],
    dpad: (i8, i8),
}

impl HidJoystick {
    /// Builds the normaliser for a device.
    ///
    /// A profile found in `database` overrides the automatic button map,
    /// D-pad mode, sticks and triggers.
    pub fn new(
        device: DeviceId,
        descriptor: &HidDescriptor,
        database: Option<&dyn DeviceDatabase>,
    ) -> Self {
        let (buttons, native_dpad) = normalize_buttons(&descriptor.buttons);
        let values = normalize_values(&descriptor.values);

        let mut button_map = [None; LogicalButton::COUNT];
        for (slot, index) in button_map.iter_mut().zip(0..buttons.len()) {
            *slot = Some(index);
        }
        let dpad_mode = if native_dpad {
            DpadMode::Native
        } else if values[ValueAxis::Hat.slot()].is_some() {
            DpadMode::Hat
        } else {
            DpadMode::None
        };
        let sticks = default_sticks(&values).into_iter().map(Stick::new).collect();

        let mut joystick = Self {
            device,
            vendor: descriptor.vendor,
            product: descriptor.product,
            version: descriptor.version,
            name: descriptor.name.clone(),
            serial: descriptor.serial.clone(),
            buttons,
            pressed: Vec::new(),
            native_dpad,
            values,
            sticks,
            triggers: Vec::new(),
            button_map,
            dpad_mode,
            dpad_buttons: [None; 4],
            dpad_held: [false; 4],
            dpad: (0, 0),
        };

        let profile = database.and_then(|db| {
            db.lookup(
                descriptor.vendor,
                descriptor.product,
                descriptor.version,
                &descriptor.name,
            )
        });
        if let Some(profile) = profile {
            joystick.apply_profile(&profile);
        }
        joystick.pressed = vec![false; joystick.num_buttons()];

        log::debug!(
            "{device} '{}': {} button(s), {} stick(s), {} trigger(s), D-pad {:?}",
            joystick.name,
            joystick.num_buttons(),
            joystick.sticks.len(),
            joystick.triggers.len(),
            joystick.dpad_mode
        );
        joystick
    }

    fn apply_profile(&mut self, profile: &DeviceProfile) {
        log::debug!("{}: using device profile '{}'", self.device, profile.name);
        let physical = self.buttons.len();

        self.button_map = [None; LogicalButton::COUNT];
        for &(logical, index) in &profile.buttons {
            if index < physical {
                self.button_map[logical.slot()] = Some(index);
            } else {
                log::debug!(
                    "{}: {logical:?} maps to missing button {index}",
                    self.device
                );
            }
        }

        self.dpad_mode = match profile.dpad {
            DpadMode::Native if !self.native_dpad => DpadMode::None,
            DpadMode::Hat if self.values[ValueAxis::Hat.slot()].is_none() => DpadMode::None,
            mode => mode,
        };
        for &(direction, index) in &profile.dpad_buttons {
            if index < physical {
                self.dpad_buttons[direction.slot()] = Some(index);
            }
        }

        self.sticks = profile.sticks.iter().copied().map(Stick::new).collect();

        for &(logical, source) in &profile.triggers {
            match source {
                TriggerSource::Button(index) if index < physical => {
                    self.button_map[logical.slot()] = Some(index);
                }
                TriggerSource::Axis(axis)
                    if axis != ValueAxis::Hat && self.values[axis.slot()].is_some() =>
                {
                    let button = physical + self.triggers.len();
                    self.triggers.push(Trigger { axis, button });
                    self.button_map[logical.slot()] = Some(button);
                }
                _ => log::debug!(
                    "{}: trigger {logical:?} source {source:?} is not available",
                    self.device
                ),
            }
        }
    }

    /// Reports that the device was attached.
    pub fn connect(&mut self, sink: &mut dyn EventSink, time: u64) {
        sink.emit(JoystickEvent::Connected {
            device: self.device,
            time,
        });
    }

    /// Reports that the device was detached, flushing pending changes first.
    pub fn disconnect(&mut self, sink: &mut dyn EventSink, time: u64) {
        self.flush_events(sink);
        sink.emit(JoystickEvent::Disconnected {
            device: self.device,
            time,
        });
    }

    /// Handles a button report. Non-zero `value` means pressed.
    pub fn button_event(
        &mut self,
        sink: &mut dyn EventSink,
        page: u16,
        usage: u16,
        value: i32,
        time: u64,
    ) {
        self.flush_stale(sink, time);
        let down = value != 0;

        if let Some(direction) = usage::dpad_direction(page, usage) {
            if self.dpad_mode == DpadMode::Native {
                let mut held = self.dpad_held;
                held[direction.slot()] = down;
                self.update_dpad(sink, held, time);
            }
            return;
        }

        let Ok(index) = self.buttons.binary_search(&usage::key(page, usage)) else {
            log::trace!(
                "{}: ignoring unknown button {page:#x}:{usage:#x}",
                self.device
            );
            return;
        };
        self.set_button(sink, index, down, time);

        if self.dpad_mode == DpadMode::Buttons {
            let mut held = self.dpad_held;
            for direction in Direction::ALL {
                if self.dpad_buttons[direction.slot()] == Some(index) {
                    held[direction.slot()] = down;
                }
            }
            self.update_dpad(sink, held, time);
        }
    }

    /// Handles a value report.
    pub fn value_event(
        &mut self,
        sink: &mut dyn EventSink,
        page: u16,
        usage: u16,
        raw: i32,
        time: u64,
    ) {
        let Some(axis) = ValueAxis::from_usage(page, usage) else {
            return;
        };
        let Some(range) = self.values[axis.slot()] else {
            return;
        };
        self.flush_stale(sink, time);

        if axis == ValueAxis::Hat {
            if self.dpad_mode == DpadMode::Hat {
                let hat = i64::from(raw) - i64::from(range.min);
                if !(0..=7).contains(&hat) {
                    log::trace!("{}: hat value {raw} is centred", self.device);
                }
                self.update_dpad(sink, decode_hat(hat), time);
            }
            return;
        }

        let scaled = range.scale(raw);
        for i in 0..self.triggers.len() {
            let trigger = self.triggers[i];
            if trigger.axis != axis {
                continue;
            }
            let pressed = self.pressed[trigger.button];
            if !pressed && scaled >= TRIGGER_PRESS {
                self.set_button(sink, trigger.button, true, time);
            } else if pressed && scaled < TRIGGER_RELEASE {
                self.set_button(sink, trigger.button, false, time);
            }
        }

        let value = scaled.clamp(-1.0, 1.0);
        for stick in &mut self.sticks {
            if stick.axes.0 == axis {
                stick.position.0 = value;
            } else if stick.axes.1 == axis {
                stick.position.1 = value;
            } else {
                continue;
            }
            stick.pending = Some(time);
        }
    }

    /// Emits every stick change still held back.
    ///
    /// Call once after each batch of reports.
    pub fn flush_events(&mut self, sink: &mut dyn EventSink) {
        for index in 0..self.sticks.len() {
            self.flush_stick(sink, index);
        }
    }

    /// Emits held-back stick changes stamped with a different time.
    fn flush_stale(&mut self, sink: &mut dyn EventSink, time: u64) {
        for index in 0..self.sticks.len() {
            if self.sticks[index].pending.is_some_and(|t| t != time) {
                self.flush_stick(sink, index);
            }
        }
    }

    fn flush_stick(&mut self, sink: &mut dyn EventSink, index: usize) {
        let stick = &mut self.sticks[index];
        let Some(time) = stick.pending.take() else {
            return;
        };
        if stick.position == stick.reported {
            return;
        }
        stick.reported = stick.position;
        sink.emit(JoystickEvent::StickChange {
            device: self.device,
            stick: index,
            x: stick.position.0,
            y: stick.position.1,
            time,
        });
    }

    fn set_button(&mut self, sink: &mut dyn EventSink, button: usize, down: bool, time: u64) {
        if self.pressed[button] == down {
            return;
        }
        self.pressed[button] = down;
        let device = self.device;
        sink.emit(if down {
            JoystickEvent::ButtonDown {
                device,
                button,
                time,
            }
        } else {
            JoystickEvent::ButtonUp {
                device,
                button,
                time,
            }
        });
    }

    fn update_dpad(&mut self, sink: &mut dyn EventSink, held: [bool; 4], time: u64) {
        self.dpad_held = held;
        let axis = |negative: Direction, positive: Direction| {
            i8::from(held[positive.slot()]) - i8::from(held[negative.slot()])
        };
        let dpad = (
            axis(Direction::Left, Direction::Right),
            axis(Direction::Up, Direction::Down),
        );
        if dpad == self.dpad {
            return;
        }
        self.dpad = dpad;
        sink.emit(JoystickEvent::DpadChange {
            device: self.device,
            x: dpad.0,
            y: dpad.1,
            time,
        });
    }

    /// The device's identity in events.
    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// USB vendor ID.
    pub fn vendor(&self) -> u16 {
        self.vendor
    }

    /// USB product ID.
    pub fn product(&self) -> u16 {
        self.product
    }

    /// Device version.
    pub fn version(&self) -> u16 {
        self.version
    }

    /// Product name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Serial number, empty if unknown.
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Physical buttons plus one synthetic button per analog trigger.
    pub fn num_buttons(&self) -> usize {
        self.buttons.len() + self.triggers.len()
    }

    /// Number of sticks.
    pub fn num_sticks(&self) -> usize {
        self.sticks.len()
    }

    /// The button index a logical button reports as.
    pub fn button_mapping(&self, button: LogicalButton) -> Option<usize> {
        self.button_map[button.slot()]
    }

    /// Where D-pad state comes from.
    pub fn dpad_mode(&self) -> DpadMode {
        self.dpad_mode
    }

    /// The value inputs stick `index` reads.
    pub fn stick_axes(&self, index: usize) -> Option<(ValueAxis, ValueAxis)> {
        self.sticks.get(index).map(|stick| stick.axes)
    }

    /// Current position of stick `index`, including held-back changes.
    pub fn stick_position(&self, index: usize) -> Option<(f32, f32)> {
        self.sticks.get(index).map(|stick| stick.position)
    }

    /// Returns `true` if button `index` is down.
    pub fn is_button_pressed(&self, index: usize) -> bool {
        self.pressed.get(index).copied().unwrap_or(false)
    }

    /// Current D-pad direction; `y` is -1 for up.
    pub fn dpad(&self) -> (i8, i8) {
        self.dpad
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{ProfileEntry, TableDeviceDatabase};
    use crate::usage::{PAGE_BUTTON, PAGE_GENERIC_DESKTOP, USAGE_DPAD_DOWN, USAGE_DPAD_UP};

    const DEVICE: DeviceId = DeviceId(1);

    #[test]
    fn buttons_emit_on_transitions_only() {
        let descriptor = HidDescriptor::new(1, 2, 3, "pad").with_numbered_buttons(4);
        let mut pad = HidJoystick::new(DEVICE, &descriptor, None);
        let mut events = Vec::new();

        pad.button_event(&mut events, PAGE_BUTTON, 2, 1, 10);
        pad.button_event(&mut events, PAGE_BUTTON, 2, 1, 11);
        pad.button_event(&mut events, PAGE_BUTTON, 2, 0, 12);
        pad.button_event(&mut events, PAGE_BUTTON, 99, 1, 13);

        assert_eq!(
            events,
            vec![
                JoystickEvent::ButtonDown {
                    device: DEVICE,
                    button: 1,
                    time: 10
                },
                JoystickEvent::ButtonUp {
                    device: DEVICE,
                    button: 1,
                    time: 12
                },
            ]
        );
        assert_eq!(pad.button_mapping(LogicalButton::A), Some(0));
        assert_eq!(pad.button_mapping(LogicalButton::Home), None);
    }

    #[test]
    fn native_dpad_usages_drive_the_dpad() {
        let descriptor = HidDescriptor::new(1, 2, 3, "pad")
            .with_numbered_buttons(2)
            .with_button(PAGE_GENERIC_DESKTOP, USAGE_DPAD_UP)
            .with_button(PAGE_GENERIC_DESKTOP, USAGE_DPAD_DOWN);
        let mut pad = HidJoystick::new(DEVICE, &descriptor, None);
        assert_eq!(pad.dpad_mode(), DpadMode::Native);
        assert_eq!(pad.num_buttons(), 2);

        let mut events = Vec::new();
        pad.button_event(&mut events, PAGE_GENERIC_DESKTOP, USAGE_DPAD_UP, 1, 1);
        pad.button_event(&mut events, PAGE_GENERIC_DESKTOP, USAGE_DPAD_UP, 0, 2);
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            JoystickEvent::DpadChange {
                device: DEVICE,
                x: 0,
                y: -1,
                time: 1
            }
        );
        assert_eq!(pad.dpad(), (0, 0));
    }

    #[test]
    fn stick_axes_are_coalesced_per_timestamp() {
        let descriptor = HidDescriptor::new(1, 2, 3, "pad")
            .with_axis(ValueAxis::X, 0, 255)
            .with_axis(ValueAxis::Y, 0, 255);
        let mut pad = HidJoystick::new(DEVICE, &descriptor, None);
        assert_eq!(pad.num_sticks(), 1);
        let mut events = Vec::new();

        pad.value_event(&mut events, PAGE_GENERIC_DESKTOP, ValueAxis::X.usage(), 255, 5);
        pad.value_event(&mut events, PAGE_GENERIC_DESKTOP, ValueAxis::Y.usage(), 0, 5);
        assert!(events.is_empty());

        pad.value_event(&mut events, PAGE_GENERIC_DESKTOP, ValueAxis::X.usage(), 0, 6);
        assert_eq!(
            events,
            vec![JoystickEvent::StickChange {
                device: DEVICE,
                stick: 0,
                x: 1.0,
                y: -1.0,
                time: 5
            }]
        );

        pad.flush_events(&mut events);
        assert_eq!(events.len(), 2);
        assert_eq!(pad.stick_position(0), Some((-1.0, -1.0)));

        pad.flush_events(&mut events);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn profile_triggers_become_synthetic_buttons() {
        let descriptor = HidDescriptor::new(0x1234, 1, 0, "pad")
            .with_numbered_buttons(3)
            .with_axis(ValueAxis::X, 0, 255)
            .with_axis(ValueAxis::Y, 0, 255)
            .with_axis(ValueAxis::Z, 0, 255)
            .with_axis(ValueAxis::RZ, 0, 255);
        let db = TableDeviceDatabase::new(vec![ProfileEntry {
            vendor: 0x1234,
            product: 1,
            version: None,
            name: None,
            profile: DeviceProfile {
                name: "test".into(),
                buttons: vec![(LogicalButton::A, 0), (LogicalButton::B, 7)],
                dpad: DpadMode::Hat,
                dpad_buttons: Vec::new(),
                sticks: vec![(ValueAxis::X, ValueAxis::Y)],
                triggers: vec![
                    (LogicalButton::L2, TriggerSource::Axis(ValueAxis::Z)),
                    (LogicalButton::R2, TriggerSource::Axis(ValueAxis::RZ)),
                    (LogicalButton::L3, TriggerSource::Axis(ValueAxis::RX)),
                ],
            },
        }]);
        let pad = HidJoystick::new(DEVICE, &descriptor, Some(&db));

        assert_eq!(pad.num_buttons(), 5);
        assert_eq!(pad.num_sticks(), 1);
        assert_eq!(pad.button_mapping(LogicalButton::A), Some(0));
        assert_eq!(pad.button_mapping(LogicalButton::B), None);
        assert_eq!(pad.button_mapping(LogicalButton::L2), Some(3));
        assert_eq!(pad.button_mapping(LogicalButton::R2), Some(4));
        assert_eq!(pad.button_mapping(LogicalButton::L3), None);
        // No hat on this device.
        assert_eq!(pad.dpad_mode(), DpadMode::None);
    }

    #[test]
    fn descriptor_fields_are_kept() {
        let descriptor = HidDescriptor::new(7, 8, 9, "Stick").with_serial("SN1");
        let pad = HidJoystick::new(DeviceId(3), &descriptor, None);
        assert_eq!(
            (pad.vendor(), pad.product(), pad.version()),
            (7, 8, 9)
        );
        assert_eq!(pad.name(), "Stick");
        assert_eq!(pad.serial(), "SN1");
        assert_eq!(pad.device(), DeviceId(3));
        assert_eq!(pad.num_sticks(), 0);
        assert!(!pad.is_button_pressed(0));
    }
}
