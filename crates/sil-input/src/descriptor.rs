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

//! Raw HID device descriptions and their normalisation.

use crate::usage::{self, ValueAxis};

/// Maximum number of buttons a joystick keeps track of.
pub const MAX_BUTTONS: usize = 256;

/// A button input of a HID device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HidButton {
    /// Usage page.
    pub page: u16,
    /// Usage within the page.
    pub usage: u16,
}

/// A value input of a HID device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HidValue {
    /// Usage page.
    pub page: u16,
    /// Usage within the page.
    pub usage: u16,
    /// Smallest value the device reports.
    pub logical_min: i32,
    /// Largest value the device reports.
    pub logical_max: i32,
}

/// Everything the platform layer tells us about a joystick when it appears.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HidDescriptor {
    /// USB vendor ID.
    pub vendor: u16,
    /// USB product ID.
    pub product: u16,
    /// Device version.
    pub version: u16,
    /// Product name.
    pub name: String,
    /// Serial number, empty if unknown.
    pub serial: String,
    /// Button inputs, in any order.
    pub buttons: Vec<HidButton>,
    /// Value inputs, in any order.
    pub values: Vec<HidValue>,
}

impl HidDescriptor {
    /// Creates a descriptor with no inputs.
    pub fn new(vendor: u16, product: u16, version: u16, name: impl Into<String>) -> Self {
        Self {
            vendor,
            product,
            version,
            name: name.into(),
            ..Default::default()
        }
    }

    /// Sets the serial number.
    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = serial.into();
        self
    }

    /// Adds a button input.
    pub fn with_button(mut self, page: u16, usage: u16) -> Self {
        self.buttons.push(HidButton { page, usage });
        self
    }

    /// Adds Button-page inputs `1..=count`.
    pub fn with_numbered_buttons(mut self, count: u16) -> Self {
        self.buttons.extend((1..=count).map(|usage| HidButton {
            page: usage::PAGE_BUTTON,
            usage,
        }));
        self
    }

    /// Adds a value input.
    pub fn with_value(mut self, page: u16, usage: u16, logical_min: i32, logical_max: i32) -> Self {
        self.values.push(HidValue {
            page,
            usage,
            logical_min,
            logical_max,
        });
        self
    }

    /// Adds a Generic Desktop value input.
    pub fn with_axis(self, axis: ValueAxis, logical_min: i32, logical_max: i32) -> Self {
        self.with_value(
            usage::PAGE_GENERIC_DESKTOP,
            axis.usage(),
            logical_min,
            logical_max,
        )
    }
}

/// The logical range of an accepted value input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ValueRange {
    pub(crate) min: i32,
    pub(crate) max: i32,
}

impl ValueRange {
    /// Maps `raw` linearly onto [-1, 1].
    pub(crate) fn scale(self, raw: i32) -> f32 {
        let span = i64::from(self.max) - i64::from(self.min);
        let offset = i64::from(raw) - i64::from(self.min);
        (offset as f64 / span as f64 * 2.0 - 1.0) as f32
    }
}

/// Splits buttons into sorted real buttons and native D-pad presence.
pub(crate) fn normalize_buttons(buttons: &[HidButton]) -> (Vec<u32>, bool) {
    let mut native_dpad = false;
    let mut keys: Vec<u32> = buttons
        .iter()
        .filter(|b| {
            let dpad = usage::dpad_direction(b.page, b.usage).is_some();
            native_dpad |= dpad;
            !dpad
        })
        .map(|b| usage::key(b.page, b.usage))
        .collect();
    keys.sort_unstable();
    keys.dedup();
    if keys.len() > MAX_BUTTONS {
        log::debug!(
            "Device reports {} buttons, keeping the first {MAX_BUTTONS}",
            keys.len()
        );
        keys.truncate(MAX_BUTTONS);
    }
    (keys, native_dpad)
}

/// Accepts the recognised value inputs with a usable range.
pub(crate) fn normalize_values(values: &[HidValue]) -> [Option<ValueRange>; ValueAxis::COUNT] {
    let mut ranges = [None; ValueAxis::COUNT];
    for value in values {
        let Some(axis) = ValueAxis::from_usage(value.page, value.usage) else {
            continue;
        };
        let range = ValueRange {
            min: value.logical_min,
            max: value.logical_max,
        };
        if range.min >= range.max {
            log::debug!(
                "Rejecting {axis:?}: logical range {}..={} is empty",
                range.min,
                range.max
            );
            continue;
        }
        if axis == ValueAxis::Hat && i64::from(range.max) - i64::from(range.min) != 7 {
            log::debug!(
                "Rejecting hat switch: logical range {}..={} is not eight positions",
                range.min,
                range.max
            );
            continue;
        }
        ranges[axis.slot()] = Some(range);
    }
    ranges
}

/// Picks stick axes from the available value inputs.
pub(crate) fn default_sticks(
    values: &[Option<ValueRange>; ValueAxis::COUNT],
) -> Vec<(ValueAxis, ValueAxis)> {
    use ValueAxis::{RX, RY, RZ, X, Y, Z};
    let has = |axis: ValueAxis| values[axis.slot()].is_some();

    if has(Z) && has(RX) && !has(RY) && !has(RZ) {
        return vec![(X, Y), (Z, RX)];
    }
    if has(Z) && has(RZ) && !has(RX) && !has(RY) {
        return vec![(X, Y), (Z, RZ)];
    }
    let mut sticks = vec![(X, Y), (RX, RY), (Z, RZ)];
    let count = if !(has(X) && has(Y)) {
        0
    } else if !(has(RX) && has(RY)) {
        1
    } else if !(has(Z) && has(RZ)) {
        2
    } else {
        3
    };
    sticks.truncate(count);
    sticks
}

/// Decodes a hat position (relative to its logical minimum) into held
/// directions, in [`Direction`](crate::usage::Direction) slot order.
pub(crate) fn decode_hat(hat: i64) -> [bool; 4] {
    if !(0..=7).contains(&hat) {
        return [false; 4];
    }
    [
        hat == 7 || hat <= 1,
        (3..=5).contains(&hat),
        hat >= 5,
        (1..=3).contains(&hat),
    ]
}
