//! Output assembly: one grouped convolution call end to end.
//!
//! [`Conv2dEngine::run`] validates the call, pads and permutes the data to
//! channel-first, normalizes the weights to `OIHW`, runs
//! [`convolve`](crate::cpu::convolve) once per (filter, group) pair and
//! permutes the assembled output back to channel-last.
//!
//! # Group semantics
//!
//! Groups are **additive**: every group's partial result for filter `f` is
//! summed into the same output channel `f`. Each group convolves its own
//! `channels / groups` input channels against the full depth of filter `f`,
//! so the filter bank is shared across groups rather than partitioned. This
//! differs from conventional grouped convolution, where groups produce
//! disjoint output-channel ranges.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::config::EngineConfig;
use crate::cpu::{
    ConvWindow, accumulate, convolve, normalize_weight_layout, pad, to_channel_first,
    to_channel_last,
};
use crate::diagnostics::{ConvObserver, NoopObserver, Stage, TracingObserver};
use crate::error::{ConvError, Result, check_len};
use crate::params::Conv2dParams;

/// Grouped 2-D convolution engine.
///
/// Holds no per-call state; one engine can serve any number of calls,
/// including concurrent ones on independent buffers.
#[derive(Clone)]
pub struct Conv2dEngine {
    config: EngineConfig,
    observer: Arc<dyn ConvObserver>,
}

impl fmt::Debug for Conv2dEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conv2dEngine").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Default for Conv2dEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Conv2dEngine {
    /// Engine with default configuration and no observer.
    pub fn new() -> Self {
        Self { config: EngineConfig::default(), observer: Arc::new(NoopObserver) }
    }

    /// Engine for `config`; attaches a [`TracingObserver`] when
    /// `trace_stages` is set.
    pub fn from_config(config: EngineConfig) -> Self {
        let observer: Arc<dyn ConvObserver> =
            if config.trace_stages { Arc::new(TracingObserver) } else { Arc::new(NoopObserver) };
        Self { config, observer }
    }

    /// Replace the observer.
    pub fn with_observer(mut self, observer: Arc<dyn ConvObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Convolve and return the owned channel-last output of shape
    /// `params.output_shape()`.
    ///
    /// `data` is `[1, H, W, C]` channel-last; `weights` is stored in
    /// `params.kernel_layout`.
    pub fn run(&self, data: &[f32], weights: &[f32], params: &Conv2dParams) -> Result<Vec<f32>> {
        let dims = params.output_dims()?;
        self.run_validated(data, weights, params, dims)
    }

    /// Body of [`run`](Self::run) for parameters that already passed
    /// [`Conv2dParams::validate`]; `(out_h, out_w)` are their output dims.
    fn run_validated(
        &self,
        data: &[f32],
        weights: &[f32],
        params: &Conv2dParams,
        (out_h, out_w): (usize, usize),
    ) -> Result<Vec<f32>> {
        check_len("data", data.len(), params.data.len())?;
        check_len("weights", weights.len(), params.weight.len())?;

        let (padded_h, padded_w) = params.padded_dims();
        let channels = params.data.channels;
        let out_channels = params.weight.out_channels;
        let plane = out_h * out_w;
        self.check_budget(padded_h.saturating_mul(padded_w).saturating_mul(channels))?;
        self.check_budget(weights.len())?;
        self.check_budget(out_channels.saturating_mul(plane))?;

        debug!(
            data = ?[params.data.batch, params.data.height, params.data.width, channels],
            weight = ?[out_channels, params.weight.height, params.weight.width, params.weight.in_channels],
            kernel_layout = %params.kernel_layout,
            groups = params.groups,
            padding = ?params.padding,
            stride = ?(params.stride_h, params.stride_w),
            output = ?[1, out_h, out_w, out_channels],
            "conv2d"
        );

        let padded = pad(data, params.data.height, params.data.width, channels, &params.padding)?;
        self.observer.on_stage(Stage::Pad, padded.data.len());

        let data_chw = to_channel_first(padded.data, padded_h, padded_w, channels)?;
        self.observer.on_stage(Stage::DataToChannelFirst, data_chw.len());

        let weights_oihw = normalize_weight_layout(weights, &params.weight, params.kernel_layout)?;
        self.observer.on_stage(Stage::NormalizeWeights, weights_oihw.len());

        let window = ConvWindow {
            channels: params.channels_per_group(),
            data_h: padded_h,
            data_w: padded_w,
            kernel_h: params.weight.height,
            kernel_w: params.weight.width,
            stride_h: params.stride_h,
            stride_w: params.stride_w,
        };
        let group_len = window.data_len();
        let filter_len = params.weight.filter_len();

        let mut out_chw = vec![0.0f32; out_channels * plane];
        let mut scratch = vec![0.0f32; plane];
        for (f, (filter, out_slice)) in
            weights_oihw.chunks_exact(filter_len).zip(out_chw.chunks_exact_mut(plane)).enumerate()
        {
            for (g, group) in data_chw.chunks_exact(group_len).enumerate() {
                convolve(group, filter, &mut scratch, &window)?;
                self.observer.on_group(f, g);
                accumulate(out_slice, &scratch)?;
            }
        }
        self.observer.on_stage(Stage::Accumulate, out_chw.len());

        let output = to_channel_last(out_chw, out_h, out_w, out_channels)?;
        self.observer.on_stage(Stage::OutputToChannelLast, output.len());

        if self.config.reject_non_finite {
            if let Some((index, &value)) = output.iter().enumerate().find(|(_, v)| !v.is_finite()) {
                return Err(ConvError::NonFiniteOutput { index, value });
            }
        }
        Ok(output)
    }

    /// Convolve into a caller-sized destination and return the output shape.
    ///
    /// `out` must hold exactly `params.output_len()` elements; it is left
    /// untouched on error.
    pub fn run_into(
        &self,
        data: &[f32],
        weights: &[f32],
        params: &Conv2dParams,
        out: &mut [f32],
    ) -> Result<[usize; 4]> {
        let (out_h, out_w) = params.output_dims()?;
        let shape = [1, out_h, out_w, params.weight.out_channels];
        check_len("output", out.len(), shape.iter().product())?;
        let output = self.run_validated(data, weights, params, (out_h, out_w))?;
        out.copy_from_slice(&output);
        Ok(shape)
    }

    /// Quantized entry point. Forwards to [`run`](Self::run) unchanged.
    pub fn run_quantized(
        &self,
        data: &[f32],
        weights: &[f32],
        params: &Conv2dParams,
    ) -> Result<Vec<f32>> {
        self.run(data, weights, params)
    }

    fn check_budget(&self, elements: usize) -> Result<()> {
        let limit = self.config.max_buffer_elements;
        if elements > limit {
            return Err(ConvError::BufferTooLarge { elements, limit });
        }
        Ok(())
    }
}

/// Convolve into `out` with a default engine. Returns the output shape.
pub fn conv2d(
    data: &[f32],
    weights: &[f32],
    out: &mut [f32],
    params: &Conv2dParams,
) -> Result<[usize; 4]> {
    Conv2dEngine::new().run_into(data, weights, params, out)
}

/// Quantized entry point; identical to [`conv2d`].
pub fn quant_conv2d(
    data: &[f32],
    weights: &[f32],
    out: &mut [f32],
    params: &Conv2dParams,
) -> Result<[usize; 4]> {
    conv2d(data, weights, out, params)
}
