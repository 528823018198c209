use crate::{
    device::SaneDevice,
    result::{sane_try, Result},
    utils::{copy_to_c_buffer, cstr2bstr, cstr2string, slice_from_c_array},
};
use bstr::ByteSlice;
use libsane_sys::*;
use scankit::{Authentication, Backend, DeviceHandle, DeviceInfo};
use std::{
    fmt::Debug,
    ptr::null_mut,
    sync::{Arc, Mutex, MutexGuard},
};

/// Credentials for the authorization callback. SANE takes one callback per
/// process, so there is a single slot.
static AUTH: Mutex<Option<Arc<Authentication>>> = Mutex::new(None);

fn auth_slot() -> MutexGuard<'static, Option<Arc<Authentication>>> {
    AUTH.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

unsafe extern "C" fn authorize(
    resource: SANE_String_Const,
    username: *mut SANE_Char,
    password: *mut SANE_Char,
) {
    let Some(resource) = cstr2bstr(resource) else {
        return;
    };
    let resource = resource.to_str_lossy();

    let credentials = auth_slot()
        .as_ref()
        .and_then(|auth| auth.credentials(&resource));

    let Some(credentials) = credentials else {
        log::warn!("No credentials for '{resource}'");
        return;
    };

    copy_to_c_buffer(&credentials.username, username, SANE_MAX_USERNAME_LEN as usize);
    copy_to_c_buffer(&credentials.password, password, SANE_MAX_PASSWORD_LEN as usize);
}

/// The system SANE library.
pub struct SaneBackend {
    __private_field: (),
}

impl SaneBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            __private_field: (),
        })
    }
}

impl Backend for SaneBackend {
    fn init(&self, auth: Arc<Authentication>) -> Result<i32> {
        *auth_slot() = Some(auth);

        let mut version: SANE_Int = 0;

        log::trace!("Call sane_init({:p}, {:p})", &mut version, authorize as *const ());
        sane_try!(sane_init(&mut version, Some(authorize)));

        log::info!(
            "Initialized sane {}.{}.{}",
            (version >> 24) & 0xff,
            (version >> 16) & 0xff,
            version & 0xffff,
        );

        Ok(version)
    }

    fn exit(&self) {
        log::trace!("Call sane_exit()");
        unsafe { sane_exit() };

        *auth_slot() = None;
    }

    fn devices(&self, local_only: bool) -> Result<Vec<DeviceInfo>> {
        let mut device_list = null_mut();

        log::trace!("Call sane_get_devices({:p}, {})", &mut device_list, local_only as i32);
        sane_try!(sane_get_devices(&mut device_list, local_only as SANE_Bool));

        let devices = unsafe { slice_from_c_array::<SANE_Device>(device_list) }
            .into_iter()
            .map(|device| unsafe {
                DeviceInfo {
                    name: cstr2string(device.name),
                    vendor: cstr2string(device.vendor),
                    model: cstr2string(device.model),
                    ty: cstr2string(device.type_),
                }
            })
            .collect();

        Ok(devices)
    }

    fn open(&self, name: &str) -> Result<Arc<dyn DeviceHandle>> {
        let device = SaneDevice::open(name)?;
        Ok(Arc::new(device))
    }
}

impl Debug for SaneBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaneBackend").finish()
    }
}
