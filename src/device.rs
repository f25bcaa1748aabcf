//! PadDevice trait - the abstraction every input source implements
//!
//! To expose a new kind of device (gamepad backend, phone sensor bridge,
//! simulated pad), implement this trait and hand an `Arc<Mutex<..>>` of it
//! to [`crate::server::PadServer::add_device`]. See
//! [`crate::devices::mock::MockPad`] for a complete implementation example.
//!
//! # Lifecycle
//!
//! 1. Created by the embedding application
//! 2. Registered via `add_device`, which installs an [`EventSink`] through
//!    [`attach`](PadDevice::attach)
//! 3. The device calls [`EventSink::updated`] whenever it has a fresh input
//!    snapshot; the server then queries the `*_inputs`/motion getters and
//!    fans a data frame out to subscribed clients
//! 4. The device calls [`EventSink::disconnected`] when its backing
//!    hardware goes away; the server revokes the sink via
//!    [`detach`](PadDevice::detach) and frees the slot
//!
//! # Threading
//!
//! Snapshot getters are only called from the thread driving the server
//! loop, while the device itself holds the lock. `updated`/`disconnected`
//! may be raised from any thread; the events are drained on the loop
//! thread.

use crate::types::{
    AnalogButtons, BaseInputs, BatteryStatus, DeviceOrientation, MotionData, TouchPoint,
};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Stable identity of a registered device
///
/// Assigned by the server at registration and never reused. All
/// subscription state keys on this id rather than the slot number, so
/// slots shifting down after a disconnect never invalidates bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub(crate) u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device#{}", self.0)
    }
}

/// Motion capability reported in the slot descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DeviceType {
    NoMotion = 0,
    AccelerometerOnly = 1,
    GyroFull = 2,
}

impl DeviceType {
    #[inline]
    pub fn wire_byte(self) -> u8 {
        self as u8
    }

    /// Does the device have an accelerometer?
    #[inline]
    pub fn has_accelerometer(self) -> bool {
        !matches!(self, Self::NoMotion)
    }

    /// Does the device have a gyroscope?
    #[inline]
    pub fn has_gyro(self) -> bool {
        matches!(self, Self::GyroFull)
    }
}

/// Physical connection reported in the slot descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ConnectionType {
    #[default]
    Other = 0,
    Usb = 1,
    Bluetooth = 2,
}

impl ConnectionType {
    #[inline]
    pub fn wire_byte(self) -> u8 {
        self as u8
    }
}

/// Event a device pushes to its server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    /// A fresh input snapshot is available
    Updated(DeviceId),
    /// The backing hardware went away
    Disconnected(DeviceId),
}

/// Device-side handle for raising events at the owning server
///
/// Installed by the server at registration, revoked on disconnect. Cheap
/// to clone. Events sent after revocation go nowhere.
#[derive(Debug, Clone)]
pub struct EventSink {
    device_id: DeviceId,
    tx: Sender<DeviceEvent>,
}

impl EventSink {
    pub(crate) fn new(device_id: DeviceId, tx: Sender<DeviceEvent>) -> Self {
        Self { device_id, tx }
    }

    /// Announce a fresh input snapshot
    pub fn updated(&self) {
        // The receiver only disappears when the server is being torn down
        let _ = self.tx.send(DeviceEvent::Updated(self.device_id));
    }

    /// Announce that the backing hardware went away
    pub fn disconnected(&self) {
        let _ = self.tx.send(DeviceEvent::Disconnected(self.device_id));
    }
}

/// Input source abstraction consumed by [`crate::server::PadServer`]
///
/// Only `device_type`, the orientation accessors and `base_inputs` are
/// required; everything else defaults to "not present".
pub trait PadDevice: Send {
    /// Motion capability; decides which motion fields are emitted
    fn device_type(&self) -> DeviceType;

    /// How the pad is physically held; motion axes are remapped accordingly
    fn orientation(&self) -> DeviceOrientation;

    /// Change the physical orientation
    fn set_orientation(&mut self, orientation: DeviceOrientation);

    /// Current digital buttons and stick positions
    fn base_inputs(&self) -> BaseInputs;

    /// Connection kind reported to clients
    fn connection_type(&self) -> ConnectionType {
        ConnectionType::Other
    }

    /// 48-bit hardware address in the low bits; 0 means "no unique identity"
    fn mac(&self) -> u64 {
        0
    }

    /// Battery state reported to clients
    fn battery(&self) -> BatteryStatus {
        BatteryStatus::NotApplicable
    }

    /// Overwrite any subset of the synthesised analog pressures with
    /// measured values; the default leaves the synthesised values alone
    fn analog_inputs(&self, _analog: &mut AnalogButtons) {}

    /// Active touch for slot `touch_num` (0 or 1)
    fn touch(&self, _touch_num: u8) -> Option<TouchPoint> {
        None
    }

    /// Timestamp of the last motion sample, in microseconds
    ///
    /// Only queried when `device_type` is not `NoMotion`.
    fn motion_timestamp(&self) -> u64 {
        0
    }

    /// Latest accelerometer sample in G, device frame
    fn accelerometer(&self) -> MotionData {
        MotionData::zero()
    }

    /// Latest gyroscope sample in deg/s, device frame
    fn gyro(&self) -> MotionData {
        MotionData::zero()
    }

    /// Called by the server at registration; the device keeps the sink and
    /// raises events through it
    fn attach(&mut self, sink: EventSink);

    /// Called by the server when the device leaves; the device must drop
    /// its sink and raise no further events
    fn detach(&mut self);
}

/// Shared handle to a registered device
pub type SharedPad = Arc<Mutex<dyn PadDevice>>;

/// Format a 48-bit MAC for log output
pub fn format_mac(mac: u64) -> String {
    format!(
        "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        (mac >> 40) & 0xFF,
        (mac >> 32) & 0xFF,
        (mac >> 24) & 0xFF,
        (mac >> 16) & 0xFF,
        (mac >> 8) & 0xFF,
        mac & 0xFF
    )
}
