//! Shape, padding, and layout descriptors for a single convolution call.
//!
//! A call is described by a [`Conv2dParams`]: the channel-last data shape, the
//! weight extents together with the [`KernelLayout`] tag the weights were
//! reported in, a group count, independent per-side padding, and strides.
//! [`Conv2dParams::validate`] turns every precondition the engine relies on
//! into a checked [`ConvError`].

use std::fmt;
use std::str::FromStr;

use crate::error::{ConvError, Result, checked_elements, checked_extent, invalid_args};

// ── Layout tags ────────────────────────────────────────────────────

/// Axis ordering of a data tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataLayout {
    /// Batch, height, width, channel (channel-last).
    Nhwc,
    /// Batch, channel, height, width (channel-first).
    Nchw,
}

impl fmt::Display for DataLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nhwc => write!(f, "NHWC"),
            Self::Nchw => write!(f, "NCHW"),
        }
    }
}

impl FromStr for DataLayout {
    type Err = ConvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "NHWC" => Ok(Self::Nhwc),
            "NCHW" => Ok(Self::Nchw),
            _ => Err(ConvError::UnsupportedDataLayout { layout: s.to_string() }),
        }
    }
}

/// Vendor-reported weight layouts the engine accepts.
///
/// The canonical filter-major `OIHW` form is produced internally by
/// [`normalize_weight_layout`](crate::cpu::layout::normalize_weight_layout)
/// and is deliberately not a source tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelLayout {
    /// Height, width, input channel, output channel.
    Hwio,
    /// Height, width, output channel, input channel.
    Hwoi,
}

impl KernelLayout {
    /// Flat index of weight element `(h, w, i, o)` in this layout.
    #[inline]
    pub fn source_index(self, shape: &WeightShape, h: usize, w: usize, i: usize, o: usize) -> usize {
        let WeightShape { out_channels: oc, width: kw, in_channels: ic, .. } = *shape;
        match self {
            Self::Hwio => h * (kw * ic * oc) + w * (ic * oc) + i * oc + o,
            Self::Hwoi => h * (kw * oc * ic) + w * (oc * ic) + o * ic + i,
        }
    }

    /// Interpret a 4-D weight shape reported in this layout.
    pub fn weight_shape(self, dims: [usize; 4]) -> WeightShape {
        let [height, width, a, b] = dims;
        match self {
            Self::Hwio => WeightShape::new(b, height, width, a),
            Self::Hwoi => WeightShape::new(a, height, width, b),
        }
    }
}

impl fmt::Display for KernelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hwio => write!(f, "HWIO"),
            Self::Hwoi => write!(f, "HWOI"),
        }
    }
}

impl FromStr for KernelLayout {
    type Err = ConvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "HWIO" => Ok(Self::Hwio),
            "HWOI" => Ok(Self::Hwoi),
            _ => Err(ConvError::UnsupportedLayout { layout: s.to_string() }),
        }
    }
}

// ── Shapes ─────────────────────────────────────────────────────────

/// Channel-last data tensor extents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataShape {
    pub batch: usize,
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl DataShape {
    pub fn new(batch: usize, height: usize, width: usize, channels: usize) -> Self {
        Self { batch, height, width, channels }
    }

    /// Build from `[N, H, W, C]`.
    pub fn from_nhwc(dims: [usize; 4]) -> Self {
        let [batch, height, width, channels] = dims;
        Self { batch, height, width, channels }
    }

    /// Total element count, saturating at `usize::MAX`.
    pub fn len(&self) -> usize {
        self.batch
            .saturating_mul(self.height)
            .saturating_mul(self.width)
            .saturating_mul(self.channels)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Weight tensor extents, independent of the layout they are stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeightShape {
    pub out_channels: usize,
    pub height: usize,
    pub width: usize,
    pub in_channels: usize,
}

impl WeightShape {
    pub fn new(out_channels: usize, height: usize, width: usize, in_channels: usize) -> Self {
        Self { out_channels, height, width, in_channels }
    }

    /// Total element count, saturating at `usize::MAX`.
    pub fn len(&self) -> usize {
        self.out_channels
            .saturating_mul(self.height)
            .saturating_mul(self.width)
            .saturating_mul(self.in_channels)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Elements in one filter (`I * H * W`).
    pub fn filter_len(&self) -> usize {
        self.in_channels.saturating_mul(self.height).saturating_mul(self.width)
    }
}

/// Zero padding added to each spatial edge, specified independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Padding {
    pub top: usize,
    pub left: usize,
    pub bottom: usize,
    pub right: usize,
}

impl Padding {
    pub fn new(top: usize, left: usize, bottom: usize, right: usize) -> Self {
        Self { top, left, bottom, right }
    }

    /// Same padding on all four sides.
    pub fn uniform(pad: usize) -> Self {
        Self::new(pad, pad, pad, pad)
    }

    /// `pad_h` above and below, `pad_w` left and right.
    pub fn symmetric(pad_h: usize, pad_w: usize) -> Self {
        Self::new(pad_h, pad_w, pad_h, pad_w)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// Output extent along one spatial axis:
/// `floor((input + pad_before + pad_after - kernel) / stride) + 1`.
///
/// Returns 0 when the kernel does not fit in the padded input, `stride`
/// is zero, or the padded extent overflows `usize`.
#[inline]
pub fn compute_output_size(
    input: usize,
    kernel: usize,
    stride: usize,
    pad_before: usize,
    pad_after: usize,
) -> usize {
    let Some(padded) = input.checked_add(pad_before).and_then(|v| v.checked_add(pad_after)) else {
        return 0;
    };
    if stride == 0 || kernel == 0 || padded < kernel {
        return 0;
    }
    (padded - kernel) / stride + 1
}

// ── Call parameters ────────────────────────────────────────────────

/// Full description of one grouped convolution call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conv2dParams {
    /// Layout the weight buffer is stored in.
    pub kernel_layout: KernelLayout,
    /// Channel-last data extents.
    pub data: DataShape,
    /// Weight extents.
    pub weight: WeightShape,
    /// Number of input-channel groups.
    pub groups: usize,
    pub padding: Padding,
    pub stride_h: usize,
    pub stride_w: usize,
}

impl Conv2dParams {
    /// Ungrouped, unpadded, unit-stride call.
    pub fn new(kernel_layout: KernelLayout, data: DataShape, weight: WeightShape) -> Self {
        Self {
            kernel_layout,
            data,
            weight,
            groups: 1,
            padding: Padding::default(),
            stride_h: 1,
            stride_w: 1,
        }
    }

    pub fn with_groups(mut self, groups: usize) -> Self {
        self.groups = groups;
        self
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_stride(mut self, stride_h: usize, stride_w: usize) -> Self {
        self.stride_h = stride_h;
        self.stride_w = stride_w;
        self
    }

    /// Check every precondition of the engine.
    ///
    /// Every element count the engine later allocates or indexes with is
    /// checked for `usize` overflow here.
    pub fn validate(&self) -> Result<()> {
        self.checked_output_dims().map(|_| ())
    }

    fn checked_output_dims(&self) -> Result<(usize, usize)> {
        if self.data.batch != 1 {
            return Err(ConvError::UnsupportedBatch { batch: self.data.batch });
        }
        if self.data.height == 0 || self.data.width == 0 || self.data.channels == 0 {
            return Err(invalid_args("data height, width and channels must be > 0"));
        }
        if self.weight.is_empty() {
            return Err(invalid_args("weight dimensions must be > 0"));
        }
        if self.groups == 0 {
            return Err(invalid_args("groups must be > 0"));
        }
        if self.stride_h == 0 || self.stride_w == 0 {
            return Err(invalid_args("stride must be > 0"));
        }
        if self.data.channels % self.groups != 0 {
            return Err(ConvError::GroupMismatch {
                channels: self.data.channels,
                groups: self.groups,
            });
        }
        let per_group = self.channels_per_group();
        if self.weight.in_channels != per_group {
            return Err(ConvError::ChannelMismatch {
                weight_in: self.weight.in_channels,
                expected: per_group,
            });
        }

        let WeightShape { out_channels, height: kernel_h, width: kernel_w, in_channels } =
            self.weight;
        let DataShape { height, width, channels, .. } = self.data;
        checked_elements("data", &[height, width, channels])?;
        checked_elements("weight", &[out_channels, kernel_h, kernel_w, in_channels])?;
        let padded_h = checked_extent("height", height, self.padding.top, self.padding.bottom)?;
        let padded_w = checked_extent("width", width, self.padding.left, self.padding.right)?;
        checked_elements("padded data", &[padded_h, padded_w, channels])?;

        if self.weight.height > padded_h {
            return Err(ConvError::KernelTooLarge {
                axis: "height",
                padded: padded_h,
                kernel: self.weight.height,
            });
        }
        if self.weight.width > padded_w {
            return Err(ConvError::KernelTooLarge {
                axis: "width",
                padded: padded_w,
                kernel: self.weight.width,
            });
        }

        let out_h = (padded_h - kernel_h) / self.stride_h + 1;
        let out_w = (padded_w - kernel_w) / self.stride_w + 1;
        checked_elements("output", &[out_h, out_w, out_channels])?;
        Ok((out_h, out_w))
    }

    /// Input channels convolved by each group.
    pub fn channels_per_group(&self) -> usize {
        if self.groups == 0 { 0 } else { self.data.channels / self.groups }
    }

    /// Spatial extents after padding, saturating at `usize::MAX`.
    pub fn padded_dims(&self) -> (usize, usize) {
        (
            self.data.height.saturating_add(self.padding.top).saturating_add(self.padding.bottom),
            self.data.width.saturating_add(self.padding.left).saturating_add(self.padding.right),
        )
    }

    /// Validated output `(height, width)`.
    pub fn output_dims(&self) -> Result<(usize, usize)> {
        self.checked_output_dims()
    }

    /// Validated channel-last output shape `[1, out_h, out_w, O]`.
    pub fn output_shape(&self) -> Result<[usize; 4]> {
        let (out_h, out_w) = self.output_dims()?;
        Ok([1, out_h, out_w, self.weight.out_channels])
    }

    /// Validated output element count.
    pub fn output_len(&self) -> Result<usize> {
        Ok(self.output_shape()?.iter().product())
    }
}
