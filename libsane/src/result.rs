use libsane_sys::*;
use scankit::SaneError;

pub use scankit::Result;

macro_rules! sane_try {
    ($x:expr) => {
        crate::result::from_status(unsafe { $x })?;
    };
}

pub(crate) use sane_try;

pub fn from_status(status: SANE_Status) -> Result<()> {
    match status {
        SANE_Status_SANE_STATUS_GOOD => Ok(()),
        SANE_Status_SANE_STATUS_UNSUPPORTED => Err(SaneError::Unsupported),
        SANE_Status_SANE_STATUS_CANCELLED => Err(SaneError::Cancelled),
        SANE_Status_SANE_STATUS_DEVICE_BUSY => Err(SaneError::DeviceBusy),
        SANE_Status_SANE_STATUS_INVAL => Err(SaneError::Inval),
        SANE_Status_SANE_STATUS_EOF => Err(SaneError::EOF),
        SANE_Status_SANE_STATUS_JAMMED => Err(SaneError::Jammed),
        SANE_Status_SANE_STATUS_NO_DOCS => Err(SaneError::NoDocs),
        SANE_Status_SANE_STATUS_COVER_OPEN => Err(SaneError::CoverOpen),
        SANE_Status_SANE_STATUS_IO_ERROR => Err(SaneError::IO),
        SANE_Status_SANE_STATUS_NO_MEM => Err(SaneError::NoMem),
        SANE_Status_SANE_STATUS_ACCESS_DENIED => Err(SaneError::AccessDenied),
        _ => {
            log::warn!("Unknown sane status {status}");
            Err(SaneError::IO)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert!(from_status(SANE_Status_SANE_STATUS_GOOD).is_ok());
        assert_eq!(from_status(SANE_Status_SANE_STATUS_NO_DOCS), Err(SaneError::NoDocs));
        assert_eq!(from_status(SANE_Status_SANE_STATUS_EOF), Err(SaneError::EOF));
        assert_eq!(from_status(1000), Err(SaneError::IO));
    }
}
