//! CPU kernel implementations

pub mod conv2d;
pub mod layout;

pub use conv2d::{ConvWindow, accumulate, convolve};
pub use layout::{PaddedTensor, normalize_weight_layout, pad, to_channel_first, to_channel_last};
