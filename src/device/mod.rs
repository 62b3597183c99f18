//! Audio Devices
//!
//! The engine talks to hardware through [`DeviceBackend`]. A simulated backend is
//! always compiled in; the `cpal` feature adds the platform's default devices.

mod backend;
#[cfg(feature = "cpal")]
mod host;
mod simulated;

pub use backend::{default_backend, Device, DeviceBackend, DeviceCallback, DeviceConfig, Direction};
#[cfg(feature = "cpal")]
pub use host::CpalBackend;
pub use simulated::SimulatedBackend;
