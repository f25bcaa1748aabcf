//! Data frame emission
//!
//! One device update fans out to every subscribed client. The frame is
//! assembled once; per client only the packet number and the CRC differ,
//! so those two fields are patched in place between sends, reusing the
//! same buffer.

use crate::device::{DeviceId, PadDevice};
use crate::protocol::header::finish_packet;
use crate::protocol::messages::{self, InputSnapshot, SlotInfo};
use crate::types::AnalogButtons;
use std::net::UdpSocket;

use super::subscriptions::SubscriptionTable;

/// Descriptor fields read off a device
pub(crate) fn slot_info(device: &dyn PadDevice) -> SlotInfo {
    SlotInfo {
        device_type: device.device_type(),
        connection_type: device.connection_type(),
        mac: device.mac(),
        battery: device.battery(),
    }
}

/// Read everything a data frame needs off a device, in one lock hold
///
/// Analog pressures start synthesised from the digital bitmap (255 when
/// pressed, 0 otherwise); the device then overwrites whatever it actually
/// measures. Motion fields are gated by the device type and remapped into
/// the pad frame per the configured orientation.
pub(crate) fn snapshot_device(device: &dyn PadDevice) -> (SlotInfo, InputSnapshot) {
    let info = slot_info(device);

    let base = device.base_inputs();

    let mut analog = AnalogButtons::synthesize(base.buttons);
    device.analog_inputs(&mut analog);

    let touch = [device.touch(0), device.touch(1)];

    let orientation = device.orientation();
    let device_type = info.device_type;
    let (motion_timestamp_us, accel) = if device_type.has_accelerometer() {
        (
            device.motion_timestamp(),
            orientation.apply_accel(device.accelerometer()),
        )
    } else {
        (0, Default::default())
    };
    let gyro = if device_type.has_gyro() {
        orientation.apply_gyro(device.gyro())
    } else {
        Default::default()
    };

    let snapshot = InputSnapshot {
        base,
        analog,
        touch,
        motion_timestamp_us,
        accel,
        gyro,
    };
    (info, snapshot)
}

/// Send one data frame to every subscriber of `device`
///
/// Send failures are logged and skipped; UDP is lossy by contract and one
/// unreachable client must not starve the rest.
pub(crate) fn fan_out(
    socket: &UdpSocket,
    server_id: u32,
    slot_id: u8,
    device: DeviceId,
    info: &SlotInfo,
    snapshot: &InputSnapshot,
    table: &mut SubscriptionTable,
) {
    let subscribers = table.subscribers(device);
    if subscribers.is_empty() {
        return;
    }

    let mut frame = messages::data_frame(server_id, slot_id, info, snapshot);

    for record in subscribers {
        let n = table.next_packet_number(record.client_id);
        messages::set_packet_number(&mut frame, n);
        finish_packet(&mut frame);

        if let Err(e) = socket.send_to(&frame, record.addr) {
            log::warn!(
                "SetuPad: Failed to send data frame to {} ({}): {}",
                record.addr,
                record.client_id,
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{ConnectionType, DeviceType, EventSink};
    use crate::types::{
        BaseInputs, BatteryStatus, DeviceOrientation, MotionData, TouchPoint, BUTTON_B,
    };

    struct FakePad {
        device_type: DeviceType,
        orientation: DeviceOrientation,
        base: BaseInputs,
        accel: MotionData,
        gyro: MotionData,
        measured_l2: Option<u8>,
    }

    impl Default for FakePad {
        fn default() -> Self {
            Self {
                device_type: DeviceType::GyroFull,
                orientation: DeviceOrientation::Normal,
                base: BaseInputs::default(),
                accel: MotionData::new(1.0, 2.0, 3.0),
                gyro: MotionData::new(4.0, 5.0, 6.0),
                measured_l2: None,
            }
        }
    }

    impl PadDevice for FakePad {
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
            ConnectionType::Usb
        }
        fn battery(&self) -> BatteryStatus {
            BatteryStatus::Full
        }
        fn analog_inputs(&self, analog: &mut crate::types::AnalogButtons) {
            if let Some(l2) = self.measured_l2 {
                analog.l2 = l2;
            }
        }
        fn touch(&self, touch_num: u8) -> Option<TouchPoint> {
            (touch_num == 1).then_some(TouchPoint { id: 9, x: 10, y: 20 })
        }
        fn motion_timestamp(&self) -> u64 {
            777
        }
        fn accelerometer(&self) -> MotionData {
            self.accel
        }
        fn gyro(&self) -> MotionData {
            self.gyro
        }
        fn attach(&mut self, _sink: EventSink) {}
        fn detach(&mut self) {}
    }

    #[test]
    fn test_snapshot_full_motion() {
        let pad = FakePad::default();
        let (info, snap) = snapshot_device(&pad);
        assert_eq!(info.device_type, DeviceType::GyroFull);
        assert_eq!(info.connection_type, ConnectionType::Usb);
        assert_eq!(snap.motion_timestamp_us, 777);
        assert_eq!(snap.accel, MotionData::new(1.0, 2.0, 3.0));
        assert_eq!(snap.gyro, MotionData::new(4.0, 5.0, 6.0));
        assert_eq!(snap.touch[0], None);
        assert_eq!(snap.touch[1], Some(TouchPoint { id: 9, x: 10, y: 20 }));
    }

    #[test]
    fn test_snapshot_applies_orientation() {
        let pad = FakePad {
            orientation: DeviceOrientation::SidewaysLeft,
            ..Default::default()
        };
        let (_, snap) = snapshot_device(&pad);
        assert_eq!(snap.accel, MotionData::new(3.0, 2.0, -1.0));
        assert_eq!(snap.gyro, MotionData::new(-6.0, 5.0, 4.0));
    }

    #[test]
    fn test_snapshot_gates_motion_by_device_type() {
        let pad = FakePad {
            device_type: DeviceType::NoMotion,
            ..Default::default()
        };
        let (_, snap) = snapshot_device(&pad);
        assert_eq!(snap.motion_timestamp_us, 0);
        assert_eq!(snap.accel, MotionData::zero());
        assert_eq!(snap.gyro, MotionData::zero());

        let pad = FakePad {
            device_type: DeviceType::AccelerometerOnly,
            ..Default::default()
        };
        let (_, snap) = snapshot_device(&pad);
        assert_eq!(snap.motion_timestamp_us, 777);
        assert_eq!(snap.accel, MotionData::new(1.0, 2.0, 3.0));
        assert_eq!(snap.gyro, MotionData::zero());
    }

    #[test]
    fn test_snapshot_merges_measured_analog_over_synthesised() {
        let pad = FakePad {
            base: BaseInputs {
                buttons: BUTTON_B,
                ..Default::default()
            },
            measured_l2: Some(42),
            ..Default::default()
        };
        let (_, snap) = snapshot_device(&pad);
        assert_eq!(snap.analog.cross, 255); // synthesised from the B bit
        assert_eq!(snap.analog.l2, 42); // measured overwrite
        assert_eq!(snap.analog.r2, 0);
    }
}
