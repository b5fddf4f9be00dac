//! Lowering of graph `conv2d` attributes into kernel parameters.
//!
//! Graph nodes carry layout tags as strings and padding/stride as
//! variable-length lists. [`Conv2dAttrs::lower`] turns them, together with
//! the operand shapes, into a validated [`Conv2dParams`];
//! [`Conv2dAttrs::to_args`] flattens the same information into the argument
//! list of a kernel call.

use std::fmt;

use gigo_kernels::{Conv2dParams, DataLayout, DataShape, KernelLayout, Padding};
use tracing::debug;

use crate::error::{Result, RuntimeError, invalid_attr};

/// Attributes of a graph `conv2d` node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conv2dAttrs {
    pub data_layout: String,
    pub kernel_layout: String,
    /// 1, 2 or 4 values.
    pub padding: Vec<usize>,
    /// Exactly `[stride_h, stride_w]`.
    pub strides: Vec<usize>,
    pub groups: usize,
}

impl Default for Conv2dAttrs {
    fn default() -> Self {
        Self {
            data_layout: "NHWC".into(),
            kernel_layout: "HWIO".into(),
            padding: vec![0],
            strides: vec![1, 1],
            groups: 1,
        }
    }
}

/// One argument of an emitted kernel call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallArg {
    /// Weight layout tag, emitted as a string literal.
    Layout(KernelLayout),
    Int(usize),
}

impl fmt::Display for CallArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layout(layout) => write!(f, "\"{layout}\""),
            Self::Int(v) => write!(f, "{v}"),
        }
    }
}

impl Conv2dAttrs {
    /// Per-side padding from the 1-, 2- or 4-value attribute.
    pub fn padding(&self) -> Result<Padding> {
        match self.padding[..] {
            [p] => Ok(Padding::uniform(p)),
            [h, w] => Ok(Padding::symmetric(h, w)),
            [top, left, bottom, right] => Ok(Padding::new(top, left, bottom, right)),
            _ => Err(invalid_attr(
                "padding",
                format!("expected 1, 2 or 4 values, got {}", self.padding.len()),
            )),
        }
    }

    /// `(stride_h, stride_w)`.
    pub fn strides(&self) -> Result<(usize, usize)> {
        match self.strides[..] {
            [sh, sw] if sh > 0 && sw > 0 => Ok((sh, sw)),
            [_, _] => Err(invalid_attr("strides", "strides must be > 0")),
            _ => Err(invalid_attr(
                "strides",
                format!("expected 2 values, got {}", self.strides.len()),
            )),
        }
    }

    pub fn kernel_layout(&self) -> Result<KernelLayout> {
        Ok(self.kernel_layout.parse::<KernelLayout>()?)
    }

    fn check_data_layout(&self) -> Result<()> {
        match self.data_layout.parse::<DataLayout>() {
            Ok(DataLayout::Nhwc) => Ok(()),
            _ => Err(RuntimeError::UnsupportedDataLayout(self.data_layout.clone())),
        }
    }

    /// Lower to validated kernel parameters.
    ///
    /// `data_shape` is `[N, H, W, C]`; `weight_shape` is 4-D in the
    /// node's kernel layout.
    pub fn lower(&self, data_shape: [usize; 4], weight_shape: [usize; 4]) -> Result<Conv2dParams> {
        self.check_data_layout()?;
        let kernel_layout = self.kernel_layout()?;
        if self.groups == 0 {
            return Err(invalid_attr("groups", "groups must be > 0"));
        }
        let padding = self.padding()?;
        let (stride_h, stride_w) = self.strides()?;

        let params = Conv2dParams::new(
            kernel_layout,
            DataShape::from_nhwc(data_shape),
            kernel_layout.weight_shape(weight_shape),
        )
        .with_groups(self.groups)
        .with_padding(padding)
        .with_stride(stride_h, stride_w);
        params.validate()?;

        debug!(
            kernel_layout = %kernel_layout,
            data = ?data_shape,
            weight = ?weight_shape,
            groups = self.groups,
            "lowered conv2d attributes"
        );
        Ok(params)
    }

    /// Flat kernel call arguments: layout tag, `N, H, W, C`, `O, Kh, Kw, I`,
    /// groups, padding `T, L, B, R`, strides `H, W`.
    pub fn to_args(&self, data_shape: [usize; 4], weight_shape: [usize; 4]) -> Result<Vec<CallArg>> {
        Ok(call_args(&self.lower(data_shape, weight_shape)?))
    }
}

/// Flat kernel call arguments for already lowered parameters.
pub fn call_args(params: &Conv2dParams) -> Vec<CallArg> {
    let d = params.data;
    let w = params.weight;
    let p = params.padding;
    let mut args = vec![CallArg::Layout(params.kernel_layout)];
    args.extend(
        [
            d.batch,
            d.height,
            d.width,
            d.channels,
            w.out_channels,
            w.height,
            w.width,
            w.in_channels,
            params.groups,
            p.top,
            p.left,
            p.bottom,
            p.right,
            params.stride_h,
            params.stride_w,
        ]
        .map(CallArg::Int),
    );
    args
}
