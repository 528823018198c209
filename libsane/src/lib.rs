//! [`scankit::Backend`] on top of the system SANE library.

mod backend;
mod descriptor;
mod device;
mod result;
mod utils;

pub use backend::SaneBackend;
pub use device::SaneDevice;
