use crate::{
    descriptor::{descriptor_from_raw, parameters_from_raw},
    result::{from_status, sane_try, Result},
};
use libsane_sys::*;
use scankit::{ControlInfo, DeviceHandle, OptionDescriptor, Parameters, SaneError};
use std::{
    ffi::{c_void, CString},
    ptr::null_mut,
    sync::{Mutex, MutexGuard},
};

/// An open `SANE_Handle`, closed on drop.
pub struct SaneDevice {
    name: String,
    handle: SANE_Handle,
    lock: Mutex<()>,
}

// SAFETY: the handle can be used from any thread as long as calls are sequential,
// which `lock` ensures. Only `sane_cancel` bypasses it, SANE allows that.
unsafe impl Send for SaneDevice {}
unsafe impl Sync for SaneDevice {}

impl SaneDevice {
    pub(crate) fn open(name: &str) -> Result<Self> {
        let cname = CString::new(name).map_err(|_| SaneError::Inval)?;
        let mut handle = null_mut();

        log::trace!("Call sane_open('{name}', {:p})", &mut handle);
        sane_try!(sane_open(cname.as_ptr(), &mut handle));

        Ok(Self {
            name: name.to_owned(),
            handle,
            lock: Mutex::new(()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn control_option(
        &self,
        index: i32,
        action: SANE_Action,
        value: *mut c_void,
    ) -> Result<ControlInfo> {
        let _guard = self.lock();
        let mut info: SANE_Int = 0;

        log::trace!(
            "Call sane_control_option({:p}, {index}, {action}, {value:p}, {:p})",
            self.handle,
            &mut info,
        );
        from_status(unsafe { sane_control_option(self.handle, index, action, value, &mut info) })?;

        Ok(ControlInfo::from_bits_retain(info as u32))
    }
}

impl DeviceHandle for SaneDevice {
    fn option_descriptor(&self, index: i32) -> Option<OptionDescriptor> {
        let _guard = self.lock();

        log::trace!("Call sane_get_option_descriptor({:p}, {index})", self.handle);
        let desc = unsafe { sane_get_option_descriptor(self.handle, index).as_ref() }?;

        Some(descriptor_from_raw(desc))
    }

    fn get_value(&self, index: i32, data: &mut [u8]) -> Result<()> {
        if data.is_empty() {
            return Err(SaneError::Inval);
        }

        self.control_option(index, SANE_Action_SANE_ACTION_GET_VALUE, data.as_mut_ptr().cast())
            .map(|_| ())
    }

    fn set_value(&self, index: i32, data: &mut [u8]) -> Result<ControlInfo> {
        let value = match data.is_empty() {
            true => null_mut(),
            false => data.as_mut_ptr().cast(),
        };

        self.control_option(index, SANE_Action_SANE_ACTION_SET_VALUE, value)
    }

    fn parameters(&self) -> Result<Parameters> {
        let _guard = self.lock();
        let mut params = unsafe { core::mem::zeroed() };

        log::trace!("Call sane_get_parameters({:p}, {:p})", self.handle, &mut params);
        sane_try!(sane_get_parameters(self.handle, &mut params));

        parameters_from_raw(&params)
    }

    fn start(&self) -> Result<()> {
        let _guard = self.lock();

        log::trace!("Call sane_start({:p})", self.handle);
        sane_try!(sane_start(self.handle));

        Ok(())
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Err(SaneError::Inval);
        }

        let _guard = self.lock();
        let len = buf.len().try_into().unwrap_or(SANE_Int::MAX);
        let mut count: SANE_Int = 0;

        log::trace!(
            "Call sane_read({:p}, {:p}, {len}, {:p})",
            self.handle,
            buf.as_mut_ptr(),
            &mut count,
        );
        sane_try!(sane_read(self.handle, buf.as_mut_ptr(), len, &mut count));

        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn cancel(&self) {
        log::trace!("Call sane_cancel({:p})", self.handle);
        unsafe { sane_cancel(self.handle) };
    }
}

impl Drop for SaneDevice {
    fn drop(&mut self) {
        let _guard = self.lock();

        log::trace!("Call sane_close({:p}) for '{}'", self.handle, self.name);
        unsafe { sane_close(self.handle) };
    }
}
