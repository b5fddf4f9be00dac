//! Runtime error types.

use gigo_kernels::ConvError;
use thiserror::Error;

/// Errors produced while lowering, emitting, or running GIGO calls.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Conv(#[from] ConvError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operator not supported by the gigo backend: {0}")]
    UnsupportedOp(String),

    #[error("unsupported data layout {0}: only NHWC is lowered")]
    UnsupportedDataLayout(String),

    #[error("invalid attribute {name}: {reason}")]
    InvalidAttribute { name: &'static str, reason: String },

    #[error("symbol too large: {0} bytes")]
    SymbolTooLarge(u64),

    #[error("malformed symbol: not valid UTF-8")]
    MalformedSymbol,

    #[error("unknown function: {0}")]
    UnknownFunction(String),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, RuntimeError>;

pub(crate) fn invalid_attr(name: &'static str, reason: impl Into<String>) -> RuntimeError {
    RuntimeError::InvalidAttribute { name, reason: reason.into() }
}
