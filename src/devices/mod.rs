//! Device implementations
//!
//! Real input sources (evdev pads, phone sensor bridges, HID backends)
//! live in the embedding application; this crate only ships the
//! scriptable mock used for hardware-free testing.

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockPad;
