//! Outbound DSU message bodies
//!
//! Three messages leave the server: the version reply, the slot
//! descriptor reply and the 100-byte data frame. All are fixed-size
//! buffers written at exact offsets. The data frame comes back with its
//! CRC unpatched: the emitter stamps a per-client packet number into it
//! and runs [`super::header::finish_packet`] once per recipient.

use super::constants::{
    DATA_PACKET_SIZE, FULL_HEADER_SIZE, MSG_DATA, MSG_PORTS, MSG_VERSION, PACKET_NUMBER_OFFSET,
    PORTS_PACKET_SIZE, PROTOCOL_VERSION, SLOTS_PER_SERVER, SLOT_DESCRIPTOR_SIZE,
    SLOT_STATE_CONNECTED, VERSION_PACKET_SIZE,
};
use super::header::{begin_packet, finish_packet};
use crate::device::{ConnectionType, DeviceType};
use crate::types::{AnalogButtons, BaseInputs, BatteryStatus, MotionData, TouchPoint};

/// Descriptor fields of an occupied slot
#[derive(Debug, Clone, Copy)]
pub struct SlotInfo {
    pub device_type: DeviceType,
    pub connection_type: ConnectionType,
    /// 48-bit hardware address in the low bits; 0 means "no unique identity"
    pub mac: u64,
    pub battery: BatteryStatus,
}

/// Everything the emitter reads off a device for one data frame
#[derive(Debug, Clone, Copy)]
pub struct InputSnapshot {
    pub base: BaseInputs,
    pub analog: AnalogButtons,
    pub touch: [Option<TouchPoint>; 2],
    /// Microseconds; zero when the device has no accelerometer
    pub motion_timestamp_us: u64,
    /// Pad frame, G; zero when the device has no accelerometer
    pub accel: MotionData,
    /// Pad frame, deg/s; zero unless the device has a gyroscope
    pub gyro: MotionData,
}

/// Write the 11-byte slot descriptor at the front of `out`
///
/// For unoccupied slots only the slot id is meaningful; the remaining ten
/// bytes stay zero, state byte included. `slot_id` being in range is a
/// precondition: the request handler validates sender-supplied slot ids
/// before they get here.
pub fn write_slot_descriptor(out: &mut [u8], slot_id: u8, occupant: Option<&SlotInfo>) {
    assert!(
        (slot_id as usize) < SLOTS_PER_SERVER,
        "slot id {} out of range",
        slot_id
    );
    debug_assert!(out.len() >= SLOT_DESCRIPTOR_SIZE);

    out[..SLOT_DESCRIPTOR_SIZE].fill(0);
    out[0] = slot_id;

    if let Some(info) = occupant {
        out[1] = SLOT_STATE_CONNECTED;
        out[2] = info.device_type.wire_byte();
        out[3] = info.connection_type.wire_byte();
        // MAC travels high byte first
        out[4] = (info.mac >> 40) as u8;
        out[5] = (info.mac >> 32) as u8;
        out[6] = (info.mac >> 24) as u8;
        out[7] = (info.mac >> 16) as u8;
        out[8] = (info.mac >> 8) as u8;
        out[9] = info.mac as u8;
        out[10] = info.battery.wire_byte();
    }
}

/// Build a complete VERSION reply
pub fn version_reply(server_id: u32) -> [u8; VERSION_PACKET_SIZE] {
    let mut buf = [0u8; VERSION_PACKET_SIZE];
    begin_packet(&mut buf, server_id, MSG_VERSION);
    buf[FULL_HEADER_SIZE..FULL_HEADER_SIZE + 2].copy_from_slice(&PROTOCOL_VERSION.to_le_bytes());
    finish_packet(&mut buf);
    buf
}

/// Build a complete PORTS reply for one slot
pub fn ports_reply(
    server_id: u32,
    slot_id: u8,
    occupant: Option<&SlotInfo>,
) -> [u8; PORTS_PACKET_SIZE] {
    let mut buf = [0u8; PORTS_PACKET_SIZE];
    begin_packet(&mut buf, server_id, MSG_PORTS);
    write_slot_descriptor(&mut buf[FULL_HEADER_SIZE..], slot_id, occupant);
    // trailing pad byte stays zero
    finish_packet(&mut buf);
    buf
}

/// Build a DATA frame with a zero packet number and unpatched CRC
///
/// The emitter builds this once per device update, then per subscriber
/// stamps the packet number and finishes the CRC.
pub fn data_frame(
    server_id: u32,
    slot_id: u8,
    info: &SlotInfo,
    snapshot: &InputSnapshot,
) -> [u8; DATA_PACKET_SIZE] {
    let mut buf = [0u8; DATA_PACKET_SIZE];
    begin_packet(&mut buf, server_id, MSG_DATA);
    write_slot_descriptor(&mut buf[FULL_HEADER_SIZE..], slot_id, Some(info));
    buf[31] = 1; // connected
    // 32..36: per-client packet number, stamped by the emitter

    let base = &snapshot.base;
    buf[36..38].copy_from_slice(&base.buttons.to_le_bytes());
    buf[38] = base.home as u8;
    buf[39] = base.touch_button as u8;
    buf[40] = base.left_x;
    buf[41] = base.left_y;
    buf[42] = base.right_x;
    buf[43] = base.right_y;
    buf[44..56].copy_from_slice(&snapshot.analog.as_bytes());

    for (i, touch) in snapshot.touch.iter().enumerate() {
        let at = 56 + i * 6;
        if let Some(t) = touch {
            buf[at] = 1;
            buf[at + 1] = t.id;
            buf[at + 2..at + 4].copy_from_slice(&t.x.to_le_bytes());
            buf[at + 4..at + 6].copy_from_slice(&t.y.to_le_bytes());
        }
    }

    buf[68..76].copy_from_slice(&snapshot.motion_timestamp_us.to_le_bytes());
    write_motion(&mut buf[76..88], snapshot.accel);
    write_motion(&mut buf[88..100], snapshot.gyro);

    buf
}

/// Stamp the per-client packet number; caller re-finishes the CRC
#[inline]
pub fn set_packet_number(frame: &mut [u8; DATA_PACKET_SIZE], n: u32) {
    frame[PACKET_NUMBER_OFFSET..PACKET_NUMBER_OFFSET + 4].copy_from_slice(&n.to_le_bytes());
}

#[inline]
fn write_motion(out: &mut [u8], m: MotionData) {
    out[0..4].copy_from_slice(&m.x.to_le_bytes());
    out[4..8].copy_from_slice(&m.y.to_le_bytes());
    out[8..12].copy_from_slice(&m.z.to_le_bytes());
}
