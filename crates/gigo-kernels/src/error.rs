//! Convolution engine error types.

use thiserror::Error;

/// Errors produced while validating or executing a convolution call.
///
/// Every variant describes a deterministic caller-input problem; nothing here
/// is transient, so retrying with the same inputs yields the same error.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvError {
    #[error("unsupported kernel layout: {layout} (expected HWIO or HWOI)")]
    UnsupportedLayout { layout: String },

    #[error("unsupported data layout: {layout} (expected NHWC or NCHW)")]
    UnsupportedDataLayout { layout: String },

    #[error("unsupported batch size {batch}: only batch 1 is supported")]
    UnsupportedBatch { batch: usize },

    #[error("input channels {channels} are not divisible by group count {groups}")]
    GroupMismatch { channels: usize, groups: usize },

    #[error("weight input channels {weight_in} do not match channels per group {expected}")]
    ChannelMismatch { weight_in: usize, expected: usize },

    #[error("kernel {axis} {kernel} exceeds padded input {axis} {padded}")]
    KernelTooLarge { axis: &'static str, padded: usize, kernel: usize },

    #[error("{buffer} buffer has {actual} elements, expected {expected}")]
    BufferSize { buffer: &'static str, expected: usize, actual: usize },

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("buffer of {elements} elements exceeds the configured limit of {limit}")]
    BufferTooLarge { elements: usize, limit: usize },

    #[error("non-finite output value {value} at index {index}")]
    NonFiniteOutput { index: usize, value: f32 },
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, ConvError>;

pub(crate) fn invalid_args(reason: impl Into<String>) -> ConvError {
    ConvError::InvalidArgument { reason: reason.into() }
}

/// Check that `buffer` holds exactly `expected` elements.
pub(crate) fn check_len(buffer: &'static str, actual: usize, expected: usize) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(ConvError::BufferSize { buffer, expected, actual })
    }
}

/// Product of `dims`, or `InvalidArgument` naming `what` if it overflows.
pub(crate) fn checked_elements(what: &str, dims: &[usize]) -> Result<usize> {
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| invalid_args(format!("{what} element count overflows usize")))
}

/// `a + b + c`, or `InvalidArgument` naming `what` if it overflows.
pub(crate) fn checked_extent(what: &str, a: usize, b: usize, c: usize) -> Result<usize> {
    a.checked_add(b)
        .and_then(|v| v.checked_add(c))
        .ok_or_else(|| invalid_args(format!("padded {what} overflows usize")))
}
