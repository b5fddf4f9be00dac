//! Optional observation of engine progress.
//!
//! The engine reports each pipeline stage and each (filter, group) compute
//! call to a [`ConvObserver`]. The default [`NoopObserver`] ignores them;
//! [`TracingObserver`] forwards them as `tracing` events.

use std::fmt;

use tracing::{debug, trace};

/// Pipeline stages of one convolution call, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Data copied into the zero-padded canvas.
    Pad,
    /// Padded data permuted to channel-first.
    DataToChannelFirst,
    /// Weights permuted to filter-major `OIHW`.
    NormalizeWeights,
    /// All (filter, group) partial sums accumulated.
    Accumulate,
    /// Output permuted back to channel-last.
    OutputToChannelLast,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Pad,
        Stage::DataToChannelFirst,
        Stage::NormalizeWeights,
        Stage::Accumulate,
        Stage::OutputToChannelLast,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pad => "pad",
            Self::DataToChannelFirst => "data_to_channel_first",
            Self::NormalizeWeights => "normalize_weights",
            Self::Accumulate => "accumulate",
            Self::OutputToChannelLast => "output_to_channel_last",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives progress notifications from the engine.
pub trait ConvObserver: Send + Sync {
    /// `stage` finished and produced a buffer of `elements` values.
    fn on_stage(&self, _stage: Stage, _elements: usize) {}

    /// The partial sum for (`filter`, `group`) is about to be accumulated.
    fn on_group(&self, _filter: usize, _group: usize) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ConvObserver for NoopObserver {}

/// Observer that emits `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ConvObserver for TracingObserver {
    fn on_stage(&self, stage: Stage, elements: usize) {
        debug!(stage = %stage, elements, "conv2d stage complete");
    }

    fn on_group(&self, filter: usize, group: usize) {
        trace!(filter, group, "conv2d group partial sum");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_are_unique() {
        let mut names: Vec<_> = Stage::ALL.iter().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Stage::ALL.len());
    }

    #[test]
    fn stage_display_matches_as_str() {
        for stage in Stage::ALL {
            assert_eq!(stage.to_string(), stage.as_str());
        }
    }

    #[test]
    fn observers_accept_calls_without_subscriber() {
        let observers: [&dyn ConvObserver; 2] = [&NoopObserver, &TracingObserver];
        for observer in observers {
            observer.on_stage(Stage::Pad, 16);
            observer.on_group(0, 1);
        }
    }
}
