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

//! # SIL Input
//!
//! Normalises HID joysticks into a canonical gamepad: numbered buttons,
//! analog sticks in [-1, 1], a D-pad and digitised analog triggers.
//!
//! A [`HidJoystick`] is built once per attached device from its
//! [`HidDescriptor`] and an optional [`DeviceDatabase`] of known layouts.
//! Raw reports go in; [`JoystickEvent`]s come out through an [`EventSink`].

pub mod database;
pub mod descriptor;
pub mod event;
pub mod joystick;
pub mod usage;

pub use database::{
    BuiltinDeviceDatabase, DeviceDatabase, DeviceProfile, DpadMode, LogicalButton, ProfileEntry,
    TableDeviceDatabase, TriggerSource,
};
pub use descriptor::{HidButton, HidDescriptor, HidValue, MAX_BUTTONS};
pub use event::{DeviceId, EventSink, JoystickEvent};
pub use joystick::{HidJoystick, TRIGGER_PRESS, TRIGGER_RELEASE};
pub use usage::{Direction, ValueAxis};
