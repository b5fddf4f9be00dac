//! Tensor layout transforms.
//!
//! Pure data movement between the layouts a caller supplies and the
//! channel-first / filter-major layouts the compute kernel reads. No
//! arithmetic happens here, so every transform is exact.
//!
//! Transforms that replace a buffer the engine already owns take it by value
//! and return a freshly allocated one; the old buffer is dropped on return.

use crate::error::{Result, check_len, checked_elements, checked_extent};
use crate::params::{KernelLayout, Padding, WeightShape};

/// Channel-last tensor produced by [`pad`].
#[derive(Debug, Clone, PartialEq)]
pub struct PaddedTensor {
    pub data: Vec<f32>,
    pub height: usize,
    pub width: usize,
}

/// Copy an `(H, W, C)` channel-last tensor into the interior of a zeroed
/// canvas of `(H + top + bottom, W + left + right, C)`.
///
/// Must run before [`to_channel_first`]: the row copy below relies on a full
/// `W * C` row being contiguous in both source and canvas.
pub fn pad(
    data: &[f32],
    height: usize,
    width: usize,
    channels: usize,
    padding: &Padding,
) -> Result<PaddedTensor> {
    check_len("data", data.len(), checked_elements("data", &[height, width, channels])?)?;

    let padded_h = checked_extent("height", height, padding.top, padding.bottom)?;
    let padded_w = checked_extent("width", width, padding.left, padding.right)?;
    let mut canvas = vec![0.0f32; checked_elements("padded data", &[padded_h, padded_w, channels])?];

    let row_len = width * channels;
    if row_len > 0 {
        for (y, row) in data.chunks_exact(row_len).enumerate() {
            let start = ((y + padding.top) * padded_w + padding.left) * channels;
            canvas[start..start + row_len].copy_from_slice(row);
        }
    }

    Ok(PaddedTensor { data: canvas, height: padded_h, width: padded_w })
}

/// Permute `(H, W, C)` to `(C, H, W)`.
pub fn to_channel_first(
    data: Vec<f32>,
    height: usize,
    width: usize,
    channels: usize,
) -> Result<Vec<f32>> {
    check_len("data", data.len(), checked_elements("data", &[height, width, channels])?)?;

    let plane = height * width;
    let mut out = vec![0.0f32; data.len()];
    for (pos, pixel) in data.chunks_exact(channels.max(1)).enumerate() {
        for (c, &v) in pixel.iter().enumerate() {
            out[c * plane + pos] = v;
        }
    }
    Ok(out)
}

/// Permute `(C, H, W)` back to `(H, W, C)`. Inverse of [`to_channel_first`].
pub fn to_channel_last(
    data: Vec<f32>,
    height: usize,
    width: usize,
    channels: usize,
) -> Result<Vec<f32>> {
    check_len("data", data.len(), checked_elements("data", &[height, width, channels])?)?;

    let plane = height * width;
    let mut out = vec![0.0f32; data.len()];
    if plane > 0 {
        for (c, channel) in data.chunks_exact(plane).enumerate() {
            for (pos, &v) in channel.iter().enumerate() {
                out[pos * channels + c] = v;
            }
        }
    }
    Ok(out)
}

/// Reorder a vendor-layout weight tensor into filter-major `OIHW`.
///
/// Element `(h, w, i, o)` lands at `o*(I*H*W) + i*(H*W) + h*W + w`.
pub fn normalize_weight_layout(
    weights: &[f32],
    shape: &WeightShape,
    layout: KernelLayout,
) -> Result<Vec<f32>> {
    check_len("weights", weights.len(), shape.len())?;

    let mut out = Vec::with_capacity(weights.len());
    for o in 0..shape.out_channels {
        for i in 0..shape.in_channels {
            for h in 0..shape.height {
                for w in 0..shape.width {
                    out.push(weights[layout.source_index(shape, h, w, i, o)]);
                }
            }
        }
    }
    Ok(out)
}
