//! Compiler-facing glue for the gigo convolution kernels.
//!
//! - [`registry`]: which graph operators can be offloaded and their kernel symbols.
//! - [`attrs`]: lowering of `conv2d` node attributes into [`gigo_kernels::Conv2dParams`].
//! - [`codegen`]: C call-site emission for an offloaded function.
//! - [`module`]: the serializable runtime module that dispatches kernel symbols.

pub mod attrs;
pub mod codegen;
pub mod error;
pub mod module;
pub mod registry;

pub use attrs::{CallArg, Conv2dAttrs, call_args};
pub use codegen::{CallEmitter, OutputBuffer};
pub use error::{Result, RuntimeError};
pub use module::{GigoModule, MAX_SYMBOL_LEN, TYPE_KEY};
pub use registry::{OpKind, is_supported};
