use thiserror::Error;

pub type Result<T> = ::core::result::Result<T, SaneError>;

/// Non-good SANE status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SaneError {
    #[error("Operation not supported")]
    Unsupported,

    #[error("Operation was cancelled")]
    Cancelled,

    #[error("Device busy")]
    DeviceBusy,

    #[error("Invalid argument")]
    Inval,

    #[error("End of file reached")]
    EOF,

    #[error("Document feeder jammed")]
    Jammed,

    #[error("Document feeder out of documents")]
    NoDocs,

    #[error("Scanner cover is open")]
    CoverOpen,

    #[error("Error during device I/O")]
    IO,

    #[error("Out of memory")]
    NoMem,

    #[error("Access to resource has been denied")]
    AccessDenied,
}

/// Severity reported with a finished scan and with user messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    NoError,
    Information,
    ErrorGeneral,
}

/// Outcome of opening a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenStatus {
    Succeeded,
    /// The backend wants credentials, see `Session::open_restricted_device`.
    AccessDenied,
    Failed,
}

impl SaneError {
    /// Maps the status an acquisition ended with to the severity the user sees.
    ///
    /// `None` means the acquisition ended normally and nothing should be surfaced.
    pub fn severity(&self) -> Option<ScanStatus> {
        match self {
            Self::Cancelled | Self::EOF => None,
            Self::NoDocs => Some(ScanStatus::Information),
            Self::Unsupported
            | Self::IO
            | Self::NoMem
            | Self::Inval
            | Self::Jammed
            | Self::CoverOpen
            | Self::DeviceBusy
            | Self::AccessDenied => Some(ScanStatus::ErrorGeneral),
        }
    }
}
