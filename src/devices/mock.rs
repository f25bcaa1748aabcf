//! Mock pad for hardware-free testing
//!
//! A fully scriptable [`PadDevice`]: tests set whatever state the
//! scenario needs, then call [`MockPad::publish_update`] to make the
//! server emit a frame, or [`MockPad::disconnect`] to simulate the
//! hardware going away.
//!
//! Enable the `mock` feature to use this from outside the crate:
//!
//! ```bash
//! cargo test
//! cargo build --features mock
//! ```

use crate::device::{ConnectionType, DeviceType, EventSink, PadDevice};
use crate::types::{
    AnalogButtons, BaseInputs, BatteryStatus, DeviceOrientation, MotionData, TouchPoint,
};

/// Scriptable in-memory pad
pub struct MockPad {
    device_type: DeviceType,
    connection_type: ConnectionType,
    mac: u64,
    battery: BatteryStatus,
    orientation: DeviceOrientation,
    base: BaseInputs,
    /// Measured pressures; `None` fields keep the synthesised value
    measured_analog: Option<AnalogButtons>,
    touches: [Option<TouchPoint>; 2],
    motion_timestamp_us: u64,
    accel: MotionData,
    gyro: MotionData,
    sink: Option<EventSink>,
}

impl MockPad {
    pub fn new(device_type: DeviceType) -> Self {
        Self {
            device_type,
            connection_type: ConnectionType::Other,
            mac: 0,
            battery: BatteryStatus::NotApplicable,
            orientation: DeviceOrientation::Normal,
            base: BaseInputs::default(),
            measured_analog: None,
            touches: [None, None],
            motion_timestamp_us: 0,
            accel: MotionData::zero(),
            gyro: MotionData::zero(),
            sink: None,
        }
    }

    pub fn with_mac(mut self, mac: u64) -> Self {
        self.mac = mac;
        self
    }

    pub fn with_connection_type(mut self, connection_type: ConnectionType) -> Self {
        self.connection_type = connection_type;
        self
    }

    pub fn with_battery(mut self, battery: BatteryStatus) -> Self {
        self.battery = battery;
        self
    }

    /// Battery state from a charge percentage, as a hardware-backed
    /// device would derive it
    pub fn with_battery_level(self, level: u8, charging: bool) -> Self {
        self.with_battery(BatteryStatus::from_level(level, charging))
    }

    // === Scripted state ===

    pub fn set_buttons(&mut self, buttons: u16) {
        self.base.buttons = buttons;
    }

    pub fn set_base_inputs(&mut self, base: BaseInputs) {
        self.base = base;
    }

    pub fn set_measured_analog(&mut self, analog: AnalogButtons) {
        self.measured_analog = Some(analog);
    }

    pub fn set_touch(&mut self, touch_num: u8, touch: Option<TouchPoint>) {
        self.touches[touch_num as usize] = touch;
    }

    pub fn set_motion(&mut self, timestamp_us: u64, accel: MotionData, gyro: MotionData) {
        self.motion_timestamp_us = timestamp_us;
        self.accel = accel;
        self.gyro = gyro;
    }

    // === Signals ===

    /// Raise `updated`: the server fans a data frame out to subscribers
    pub fn publish_update(&self) {
        if let Some(sink) = &self.sink {
            sink.updated();
        }
    }

    /// Raise `disconnected`: the server frees the slot
    pub fn disconnect(&self) {
        if let Some(sink) = &self.sink {
            sink.disconnected();
        }
    }

    /// Is the pad currently registered with a server?
    pub fn is_attached(&self) -> bool {
        self.sink.is_some()
    }
}

impl PadDevice for MockPad {
    fn device_type(&self) -> DeviceType {
        self.device_type
    }

    fn orientation(&self) -> DeviceOrientation {
        self.orientation
    }

    fn set_orientation(&mut self, orientation: DeviceOrientation) {
        self.orientation = orientation;
    }

    fn base_inputs(&self) -> BaseInputs {
        self.base
    }

    fn connection_type(&self) -> ConnectionType {
        self.connection_type
    }

    fn mac(&self) -> u64 {
        self.mac
    }

    fn battery(&self) -> BatteryStatus {
        self.battery
    }

    fn analog_inputs(&self, analog: &mut AnalogButtons) {
        if let Some(measured) = self.measured_analog {
            *analog = measured;
        }
    }

    fn touch(&self, touch_num: u8) -> Option<TouchPoint> {
        self.touches.get(touch_num as usize).copied().flatten()
    }

    fn motion_timestamp(&self) -> u64 {
        self.motion_timestamp_us
    }

    fn accelerometer(&self) -> MotionData {
        self.accel
    }

    fn gyro(&self) -> MotionData {
        self.gyro
    }

    fn attach(&mut self, sink: EventSink) {
        self.sink = Some(sink);
    }

    fn detach(&mut self) {
        self.sink = None;
    }
}
