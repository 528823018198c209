pub mod auth;
pub mod backend;
pub mod codec;
pub mod context;
pub mod descriptor;
pub mod names;
pub mod options;
pub mod result;
pub mod scan;
pub mod session;
pub mod value;

#[cfg(test)]
mod fake;

pub use auth::{Authentication, Credentials};
pub use backend::{Backend, DeviceHandle, DeviceInfo, DeviceType};
pub use context::{Context, ContextGuard};
pub use descriptor::{
    Capabilities, Constraint, ControlInfo, FrameFormat, OptionDescriptor, Parameters, Unit,
    ValueType,
};
pub use names::OptionName;
pub use options::{OptionModel, OptionState, OptionType, ScanOption};
pub use result::{OpenStatus, Result, SaneError, ScanStatus};
pub use scan::{ImageFormat, ScanImage};
pub use session::{AreaDetector, ScanArea, Session, SessionEvent};
pub use value::Value;
