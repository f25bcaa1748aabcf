//! SetuPad - Cemuhook DSU server library
//!
//! Bridges physical input devices (gamepads, phone sensors, simulated
//! pads) to emulators speaking the DSU ("DualShock UDP") protocol: Cemu,
//! Citra, Dolphin, melonDS and friends subscribe over UDP and receive
//! motion and button frames whenever a registered device updates.
//!
//! ## Features
//!
//! - `mock`: Enable the scriptable mock pad for hardware-free testing

pub mod config;
pub mod device;
pub mod devices;
pub mod error;
pub mod protocol;
pub mod server;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use device::{DeviceId, PadDevice, SharedPad};
pub use error::{Error, Result};
pub use server::PadServer;
