//! Interface to the scanner access library.
//!
//! `libsane` implements these traits on top of the real SANE library. The core
//! only ever talks to a device through [`DeviceHandle`], which keeps it testable
//! without hardware.

use crate::{
    auth::Authentication,
    descriptor::{ControlInfo, OptionDescriptor, Parameters},
    result::Result,
};
use std::{fmt, sync::Arc};

/// Entry of the device list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub vendor: String,
    pub model: String,
    pub ty: String,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{name}' (vendor '{vendor}', model '{model}', type '{ty}')",
            name = self.name,
            vendor = self.vendor,
            model = self.model,
            ty = self.ty,
        )
    }
}

/// Which devices a device list should contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceType {
    #[default]
    AllDevices,
    NoCameraAndVirtualDevices,
}

impl DeviceType {
    pub fn accepts(&self, device: &DeviceInfo) -> bool {
        match self {
            Self::AllDevices => true,
            Self::NoCameraAndVirtualDevices => !matches!(
                device.ty.as_str(),
                "still camera" | "video camera" | "virtual device"
            ),
        }
    }
}

/// The library itself.
pub trait Backend: Send + Sync {
    /// `sane_init`. Returns the backend version code.
    fn init(&self, auth: Arc<Authentication>) -> Result<i32>;

    /// `sane_exit`.
    fn exit(&self);

    /// `sane_get_devices`.
    fn devices(&self, local_only: bool) -> Result<Vec<DeviceInfo>>;

    /// `sane_open`. The device is closed when the handle is dropped.
    fn open(&self, name: &str) -> Result<Arc<dyn DeviceHandle>>;
}

/// An open device.
///
/// The handle is shared with the acquisition thread, so implementations must be
/// callable from any thread.
pub trait DeviceHandle: Send + Sync {
    /// Descriptor of option `index`, `None` when out of range.
    fn option_descriptor(&self, index: i32) -> Option<OptionDescriptor>;

    /// `SANE_ACTION_GET_VALUE` into `data`, which is sized to the descriptor.
    fn get_value(&self, index: i32, data: &mut [u8]) -> Result<()>;

    /// `SANE_ACTION_SET_VALUE`. The backend may write the effective value back.
    fn set_value(&self, index: i32, data: &mut [u8]) -> Result<ControlInfo>;

    fn parameters(&self) -> Result<Parameters>;

    fn start(&self) -> Result<()>;

    /// Reads the next chunk of the current frame. `Err(SaneError::EOF)` ends the frame.
    fn read(&self, buf: &mut [u8]) -> Result<usize>;

    fn cancel(&self);
}
