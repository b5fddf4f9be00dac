//! Grouped 2-D convolution engine for channel-last tensors.
//!
//! Data arrives as `NHWC` (batch 1) and weights as `HWIO` or `HWOI`. The
//! engine pads the data, permutes both operands to channel-first, convolves
//! each (filter, group) pair with [`cpu::convolve`], sums the group partials
//! and permutes the result back to `NHWC`.
//!
//! ```
//! use gigo_kernels::{Conv2dParams, DataShape, KernelLayout, WeightShape, conv2d};
//!
//! let params = Conv2dParams::new(
//!     KernelLayout::Hwio,
//!     DataShape::new(1, 3, 3, 1),
//!     WeightShape::new(1, 2, 2, 1),
//! );
//! let mut out = vec![0.0; params.output_len()?];
//! let shape = conv2d(&[1.0; 9], &[1.0; 4], &mut out, &params)?;
//! assert_eq!(shape, [1, 2, 2, 1]);
//! assert_eq!(out, vec![4.0; 4]);
//! # Ok::<(), gigo_kernels::ConvError>(())
//! ```

pub mod config;
pub mod cpu;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod params;

pub use config::{ConfigError, EngineConfig};
pub use diagnostics::{ConvObserver, NoopObserver, Stage, TracingObserver};
pub use engine::{Conv2dEngine, conv2d, quant_conv2d};
pub use error::{ConvError, Result};
pub use params::{
    Conv2dParams, DataLayout, DataShape, KernelLayout, Padding, WeightShape, compute_output_size,
};
