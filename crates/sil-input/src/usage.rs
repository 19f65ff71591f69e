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

//! HID usage pages and usages understood by the joystick normaliser.
//!
//! Buttons are identified by a 32-bit key `(page << 16) | usage`.

/// The Generic Desktop usage page.
pub const PAGE_GENERIC_DESKTOP: u16 = 0x01;
/// The Simulation Controls usage page.
pub const PAGE_SIMULATION: u16 = 0x02;
/// The Button usage page.
pub const PAGE_BUTTON: u16 = 0x09;

/// Generic Desktop: X axis.
pub const USAGE_X: u16 = 0x30;
/// Generic Desktop: Y axis.
pub const USAGE_Y: u16 = 0x31;
/// Generic Desktop: Z axis.
pub const USAGE_Z: u16 = 0x32;
/// Generic Desktop: X rotation.
pub const USAGE_RX: u16 = 0x33;
/// Generic Desktop: Y rotation.
pub const USAGE_RY: u16 = 0x34;
/// Generic Desktop: Z rotation.
pub const USAGE_RZ: u16 = 0x35;
/// Generic Desktop: hat switch.
pub const USAGE_HAT_SWITCH: u16 = 0x39;
/// Generic Desktop: D-pad up.
pub const USAGE_DPAD_UP: u16 = 0x90;
/// Generic Desktop: D-pad down.
pub const USAGE_DPAD_DOWN: u16 = 0x91;
/// Generic Desktop: D-pad right.
pub const USAGE_DPAD_RIGHT: u16 = 0x92;
/// Generic Desktop: D-pad left.
pub const USAGE_DPAD_LEFT: u16 = 0x93;

/// Packs a usage page and usage into a button key.
pub const fn key(page: u16, usage: u16) -> u32 {
    ((page as u32) << 16) | usage as u32
}

/// Returns the D-pad direction of a native D-pad usage.
pub(crate) fn dpad_direction(page: u16, usage: u16) -> Option<Direction> {
    if page != PAGE_GENERIC_DESKTOP {
        return None;
    }
    match usage {
        USAGE_DPAD_UP => Some(Direction::Up),
        USAGE_DPAD_DOWN => Some(Direction::Down),
        USAGE_DPAD_LEFT => Some(Direction::Left),
        USAGE_DPAD_RIGHT => Some(Direction::Right),
        _ => None,
    }
}

/// One of the four D-pad directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    /// Up.
    Up,
    /// Down.
    Down,
    /// Left.
    Left,
    /// Right.
    Right,
}

impl Direction {
    /// Every direction, in slot order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub(crate) fn slot(self) -> usize {
        self as usize
    }
}

/// The value inputs the normaliser understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ValueAxis {
    /// X axis.
    X,
    /// Y axis.
    Y,
    /// Z axis.
    Z,
    /// X rotation.
    RX,
    /// Y rotation.
    RY,
    /// Z rotation.
    RZ,
    /// Hat switch.
    Hat,
}

impl ValueAxis {
    /// Number of value inputs.
    pub const COUNT: usize = 7;

    /// Every value input, in slot order.
    pub const ALL: [ValueAxis; Self::COUNT] = [
        ValueAxis::X,
        ValueAxis::Y,
        ValueAxis::Z,
        ValueAxis::RX,
        ValueAxis::RY,
        ValueAxis::RZ,
        ValueAxis::Hat,
    ];

    /// Maps a HID usage to the value input it reports.
    pub fn from_usage(page: u16, usage: u16) -> Option<Self> {
        if page != PAGE_GENERIC_DESKTOP {
            return None;
        }
        match usage {
            USAGE_X => Some(ValueAxis::X),
            USAGE_Y => Some(ValueAxis::Y),
            USAGE_Z => Some(ValueAxis::Z),
            USAGE_RX => Some(ValueAxis::RX),
            USAGE_RY => Some(ValueAxis::RY),
            USAGE_RZ => Some(ValueAxis::RZ),
            USAGE_HAT_SWITCH => Some(ValueAxis::Hat),
            _ => None,
        }
    }

    /// The Generic Desktop usage of this input.
    pub fn usage(self) -> u16 {
        match self {
            ValueAxis::X => USAGE_X,
            ValueAxis::Y => USAGE_Y,
            ValueAxis::Z => USAGE_Z,
            ValueAxis::RX => USAGE_RX,
            ValueAxis::RY => USAGE_RY,
            ValueAxis::RZ => USAGE_RZ,
            ValueAxis::Hat => USAGE_HAT_SWITCH,
        }
    }

    pub(crate) fn slot(self) -> usize {
        self as usize
    }
}
