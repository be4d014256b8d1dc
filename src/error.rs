use crate::ze::ffi::ZeResultCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ZeError {
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Level Zero call {call} failed: {code}")]
    Call {
        call: &'static str,
        code: ZeResultCode,
    },

    #[error("Failed to load Level Zero loader {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: libloading::Error,
    },

    #[error("Missing Level Zero entry point: {0}")]
    MissingSymbol(&'static str),
}

impl ZeError {
    /// The vendor result code carried by a failed call, if any.
    #[must_use]
    pub const fn code(&self) -> Option<ZeResultCode> {
        match self {
            Self::Call { code, .. } => Some(*code),
            _ => None,
        }
    }
}

// A convenient alias
pub type ZeResult<T> = Result<T, ZeError>;
