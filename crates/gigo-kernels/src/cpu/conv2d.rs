//! Sliding-window multiply-accumulate over channel-first buffers.
//!
//! [`convolve`] handles one (filter, group) pair: a `(C, H, W)` slice of the
//! padded data holding only that group's channels, and a `(C, Kh, Kw)` slice
//! of one filter. It allocates nothing and writes only the destination.

use crate::error::{Result, check_len, invalid_args};
use crate::params::compute_output_size;

/// Geometry of one group's convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConvWindow {
    /// Channels in the group.
    pub channels: usize,
    /// Height of the (already padded) data.
    pub data_h: usize,
    /// Width of the (already padded) data.
    pub data_w: usize,
    pub kernel_h: usize,
    pub kernel_w: usize,
    pub stride_h: usize,
    pub stride_w: usize,
}

impl ConvWindow {
    /// Output `(height, width)` of the window sweep.
    pub fn output_dims(&self) -> (usize, usize) {
        (
            compute_output_size(self.data_h, self.kernel_h, self.stride_h, 0, 0),
            compute_output_size(self.data_w, self.kernel_w, self.stride_w, 0, 0),
        )
    }

    /// Elements in the data slice (`C * H * W`).
    pub fn data_len(&self) -> usize {
        self.channels * self.data_h * self.data_w
    }

    /// Elements in the kernel slice (`C * Kh * Kw`).
    pub fn kernel_len(&self) -> usize {
        self.channels * self.kernel_h * self.kernel_w
    }

    /// Elements in the destination (`out_h * out_w`).
    pub fn output_len(&self) -> usize {
        let (out_h, out_w) = self.output_dims();
        out_h * out_w
    }
}

/// Convolve one channel-first data group with one filter slice.
///
/// Windows start at `i = 0, stride_h, ..` while `i + kernel_h <= data_h` (and
/// likewise for columns); each window's sum over `c, kj, ki` of
/// `data[c, i + kj, j + ki] * kernel[c, kj, ki]` is written to the next slot
/// of `out` in row-major order.
pub fn convolve(data: &[f32], kernel: &[f32], out: &mut [f32], window: &ConvWindow) -> Result<()> {
    if window.stride_h == 0 || window.stride_w == 0 {
        return Err(invalid_args("stride must be > 0"));
    }
    check_len("data group", data.len(), window.data_len())?;
    check_len("kernel group", kernel.len(), window.kernel_len())?;
    check_len("output", out.len(), window.output_len())?;
    if out.is_empty() {
        return Ok(());
    }

    let ConvWindow { channels, data_h, data_w, kernel_h, kernel_w, stride_h, stride_w } = *window;
    let plane = data_h * data_w;
    let kplane = kernel_h * kernel_w;

    let mut slot = 0;
    for i in (0..=data_h - kernel_h).step_by(stride_h) {
        for j in (0..=data_w - kernel_w).step_by(stride_w) {
            let mut acc = 0.0f32;
            for c in 0..channels {
                for kj in 0..kernel_h {
                    let d_row = c * plane + (i + kj) * data_w + j;
                    let k_row = c * kplane + kj * kernel_w;
                    let d = &data[d_row..d_row + kernel_w];
                    let k = &kernel[k_row..k_row + kernel_w];
                    for (&x, &w) in d.iter().zip(k) {
                        acc += x * w;
                    }
                }
            }
            out[slot] = acc;
            slot += 1;
        }
    }
    debug_assert_eq!(slot, out.len());
    Ok(())
}

/// Elementwise `dst += src`.
pub fn accumulate(dst: &mut [f32], src: &[f32]) -> Result<()> {
    check_len("accumulator", src.len(), dst.len())?;
    for (d, &s) in dst.iter_mut().zip(src) {
        *d += s;
    }
    Ok(())
}
