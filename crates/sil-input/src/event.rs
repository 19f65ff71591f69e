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

//! The canonical joystick event stream and where it goes.

use std::fmt;

/// Identifies a joystick to event consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "joystick {}", self.0)
    }
}

/// A normalised joystick event.
///
/// Timestamps are whatever the caller feeds in with the input reports.
#[derive(Debug, Clone, PartialEq)]
pub enum JoystickEvent {
    /// The device was attached.
    Connected {
        /// The device.
        device: DeviceId,
        /// When it happened.
        time: u64,
    },
    /// The device was detached.
    Disconnected {
        /// The device.
        device: DeviceId,
        /// When it happened.
        time: u64,
    },
    /// A button (or digitised trigger) was pressed.
    ButtonDown {
        /// The device.
        device: DeviceId,
        /// Button index.
        button: usize,
        /// When it happened.
        time: u64,
    },
    /// A button (or digitised trigger) was released.
    ButtonUp {
        /// The device.
        device: DeviceId,
        /// Button index.
        button: usize,
        /// When it happened.
        time: u64,
    },
    /// The D-pad direction changed. `y` is -1 for up.
    DpadChange {
        /// The device.
        device: DeviceId,
        /// Horizontal direction, -1, 0 or 1.
        x: i8,
        /// Vertical direction, -1, 0 or 1.
        y: i8,
        /// When it happened.
        time: u64,
    },
    /// A stick moved.
    StickChange {
        /// The device.
        device: DeviceId,
        /// Stick index.
        stick: usize,
        /// Horizontal position in [-1, 1].
        x: f32,
        /// Vertical position in [-1, 1].
        y: f32,
        /// When it happened.
        time: u64,
    },
}

impl JoystickEvent {
    /// The device the event comes from.
    pub fn device(&self) -> DeviceId {
        match self {
            JoystickEvent::Connected { device, .. }
            | JoystickEvent::Disconnected { device, .. }
            | JoystickEvent::ButtonDown { device, .. }
            | JoystickEvent::ButtonUp { device, .. }
            | JoystickEvent::DpadChange { device, .. }
            | JoystickEvent::StickChange { device, .. } => *device,
        }
    }

    /// The event's timestamp.
    pub fn time(&self) -> u64 {
        match self {
            JoystickEvent::Connected { time, .. }
            | JoystickEvent::Disconnected { time, .. }
            | JoystickEvent::ButtonDown { time, .. }
            | JoystickEvent::ButtonUp { time, .. }
            | JoystickEvent::DpadChange { time, .. }
            | JoystickEvent::StickChange { time, .. } => *time,
        }
    }
}

/// Receives normalised events.
pub trait EventSink {
    /// Delivers one event.
    fn emit(&mut self, event: JoystickEvent);
}

impl EventSink for Vec<JoystickEvent> {
    fn emit(&mut self, event: JoystickEvent) {
        self.push(event);
    }
}

impl EventSink for flume::Sender<JoystickEvent> {
    fn emit(&mut self, event: JoystickEvent) {
        if let Err(e) = self.send(event) {
            log::error!("Failed to send joystick event: {e}. Receiver likely disconnected.");
        }
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: JoystickEvent) {
        (**self).emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flume_sink_delivers_in_order() {
        let (mut sender, receiver) = flume::unbounded();
        let device = DeviceId(4);
        sender.emit(JoystickEvent::Connected { device, time: 1 });
        sender.emit(JoystickEvent::ButtonDown {
            device,
            button: 2,
            time: 2,
        });
        let events: Vec<_> = receiver.drain().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].device(), device);
        assert_eq!(events[1].time(), 2);
    }

    #[test]
    fn disconnected_receiver_is_not_fatal() {
        let (mut sender, receiver) = flume::unbounded::<JoystickEvent>();
        drop(receiver);
        sender.emit(JoystickEvent::Disconnected {
            device: DeviceId(1),
            time: 0,
        });
    }
}
