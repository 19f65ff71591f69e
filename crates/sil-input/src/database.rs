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

//! Canonical layouts for known devices.

use crate::usage::{Direction, ValueAxis};
use serde::{Deserialize, Serialize};

/// Gamepad buttons by role rather than position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalButton {
    /// Bottom face button.
    A,
    /// Right face button.
    B,
    /// Left face button.
    X,
    /// Top face button.
    Y,
    /// Left shoulder.
    L1,
    /// Right shoulder.
    R1,
    /// Left trigger.
    L2,
    /// Right trigger.
    R2,
    /// Left stick click.
    L3,
    /// Right stick click.
    R3,
    /// Start / options.
    Start,
    /// Select / share.
    Select,
    /// Home / system.
    Home,
}

impl LogicalButton {
    /// Number of logical buttons.
    pub const COUNT: usize = 13;

    /// Every logical button, in slot order.
    pub const ALL: [LogicalButton; Self::COUNT] = [
        LogicalButton::A,
        LogicalButton::B,
        LogicalButton::X,
        LogicalButton::Y,
        LogicalButton::L1,
        LogicalButton::R1,
        LogicalButton::L2,
        LogicalButton::R2,
        LogicalButton::L3,
        LogicalButton::R3,
        LogicalButton::Start,
        LogicalButton::Select,
        LogicalButton::Home,
    ];

    pub(crate) fn slot(self) -> usize {
        self as usize
    }
}

/// Where D-pad state comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DpadMode {
    /// Generic Desktop D-pad usages.
    Native,
    /// The hat switch.
    Hat,
    /// Ordinary buttons mapped to directions.
    Buttons,
    /// No D-pad.
    #[default]
    None,
}

/// Where a trigger reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerSource {
    /// A physical button index.
    Button(usize),
    /// An analog value, digitised with hysteresis into a synthetic button.
    Axis(ValueAxis),
}

/// The canonical layout of one device model.
///
/// Button indices refer to the device's buttons sorted by `(page, usage)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Display name for logs.
    pub name: String,
    /// Logical button assignments.
    #[serde(default)]
    pub buttons: Vec<(LogicalButton, usize)>,
    /// D-pad source.
    #[serde(default)]
    pub dpad: DpadMode,
    /// Buttons acting as D-pad directions in [`DpadMode::Buttons`].
    #[serde(default)]
    pub dpad_buttons: Vec<(Direction, usize)>,
    /// Stick axes, in stick order. Replaces the automatic assignment.
    #[serde(default)]
    pub sticks: Vec<(ValueAxis, ValueAxis)>,
    /// Trigger assignments.
    #[serde(default)]
    pub triggers: Vec<(LogicalButton, TriggerSource)>,
}

/// Looks up canonical layouts.
pub trait DeviceDatabase: Send + Sync {
    /// Returns the profile for a device, if known.
    fn lookup(&self, vendor: u16, product: u16, version: u16, name: &str) -> Option<DeviceProfile>;
}

/// One row of a [`TableDeviceDatabase`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEntry {
    /// USB vendor ID.
    pub vendor: u16,
    /// USB product ID.
    pub product: u16,
    /// Device version; `None` matches any.
    #[serde(default)]
    pub version: Option<u16>,
    /// Product name; `None` matches any.
    #[serde(default)]
    pub name: Option<String>,
    /// The layout.
    pub profile: DeviceProfile,
}

impl ProfileEntry {
    fn matches(&self, vendor: u16, product: u16, version: u16, name: &str) -> bool {
        self.vendor == vendor
            && self.product == product
            && self.version.map_or(true, |v| v == version)
            && self.name.as_deref().map_or(true, |n| n == name)
    }
}

/// A device database backed by a list of entries; the first match wins.
#[derive(Debug, Clone, Default)]
pub struct TableDeviceDatabase {
    entries: Vec<ProfileEntry>,
}

impl TableDeviceDatabase {
    /// Creates a database from entries.
    pub fn new(entries: Vec<ProfileEntry>) -> Self {
        Self { entries }
    }

    /// Parses a RON list of [`ProfileEntry`].
    pub fn from_ron(source: &str) -> Result<Self, ron::error::SpannedError> {
        Ok(Self::new(ron::from_str(source)?))
    }

    /// Adds an entry after the existing ones.
    pub fn push(&mut self, entry: ProfileEntry) {
        self.entries.push(entry);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DeviceDatabase for TableDeviceDatabase {
    fn lookup(&self, vendor: u16, product: u16, version: u16, name: &str) -> Option<DeviceProfile> {
        self.entries
            .iter()
            .find(|entry| entry.matches(vendor, product, version, name))
            .map(|entry| entry.profile.clone())
    }
}

/// Sony's USB vendor ID.
pub const VENDOR_SONY: u16 = 0x054C;
/// DualShock 4, first revision.
pub const PRODUCT_DUALSHOCK4: u16 = 0x05C4;
/// DualShock 4, second revision.
pub const PRODUCT_DUALSHOCK4_V2: u16 = 0x09CC;
/// Vendor ID of the generic eight-button pad.
pub const VENDOR_GENERIC_PAD: u16 = 0x0810;
/// Product ID of the generic eight-button pad.
pub const PRODUCT_GENERIC_PAD: u16 = 0xE501;

/// The layouts shipped with the library.
#[derive(Debug, Clone)]
pub struct BuiltinDeviceDatabase {
    table: TableDeviceDatabase,
}

impl Default for BuiltinDeviceDatabase {
    fn default() -> Self {
        let dualshock = dualshock4_profile();
        let entries = vec![
            ProfileEntry {
                vendor: VENDOR_SONY,
                product: PRODUCT_DUALSHOCK4,
                version: None,
                name: None,
                profile: dualshock.clone(),
            },
            ProfileEntry {
                vendor: VENDOR_SONY,
                product: PRODUCT_DUALSHOCK4_V2,
                version: None,
                name: None,
                profile: dualshock,
            },
            ProfileEntry {
                vendor: VENDOR_GENERIC_PAD,
                product: PRODUCT_GENERIC_PAD,
                version: None,
                name: None,
                profile: generic_pad_profile(),
            },
        ];
        Self {
            table: TableDeviceDatabase::new(entries),
        }
    }
}

impl DeviceDatabase for BuiltinDeviceDatabase {
    fn lookup(&self, vendor: u16, product: u16, version: u16, name: &str) -> Option<DeviceProfile> {
        self.table.lookup(vendor, product, version, name)
    }
}

/// Fourteen buttons (square, cross, circle, triangle, L1, R1, L2, R2, share,
/// options, L3, R3, PS, touchpad), sticks on X/Y and Z/RZ, analog triggers
/// on RX/RY, D-pad on the hat.
fn dualshock4_profile() -> DeviceProfile {
    use LogicalButton::*;
    DeviceProfile {
        name: "DualShock 4".into(),
        buttons: vec![
            (X, 0),
            (A, 1),
            (B, 2),
            (Y, 3),
            (L1, 4),
            (R1, 5),
            (Select, 8),
            (Start, 9),
            (L3, 10),
            (R3, 11),
            (Home, 12),
        ],
        dpad: DpadMode::Hat,
        dpad_buttons: Vec::new(),
        sticks: vec![
            (ValueAxis::X, ValueAxis::Y),
            (ValueAxis::Z, ValueAxis::RZ),
        ],
        triggers: vec![
            (L2, TriggerSource::Axis(ValueAxis::RX)),
            (R2, TriggerSource::Axis(ValueAxis::RY)),
        ],
    }
}

/// Eight buttons plus four D-pad buttons, no sticks.
fn generic_pad_profile() -> DeviceProfile {
    use LogicalButton::*;
    DeviceProfile {
        name: "Generic eight-button pad".into(),
        buttons: vec![
            (X, 0),
            (A, 1),
            (B, 2),
            (Y, 3),
            (L1, 4),
            (R1, 5),
            (Select, 6),
            (Start, 7),
        ],
        dpad: DpadMode::Buttons,
        dpad_buttons: vec![
            (Direction::Up, 8),
            (Direction::Down, 9),
            (Direction::Left, 10),
            (Direction::Right, 11),
        ],
        sticks: Vec::new(),
        triggers: Vec::new(),
    }
}
