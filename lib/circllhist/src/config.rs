//! Histogram allocation configuration.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::bucket::MAX_BUCKETS;

const DEFAULT_INITIAL_CAPACITY: usize = 16;

/// How the backing storage of a histogram grows once it is full.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GrowthPolicy {
    /// Double the capacity on every growth, for amortized constant-time insertion.
    #[default]
    Doubling,

    /// Grow by a fixed number of buckets every time.
    ///
    /// Keeps memory tight for histograms with a predictable number of buckets, at the cost of more frequent
    /// reallocation for histograms that keep growing.
    Linear {
        /// The number of buckets to add on every growth.
        step: NonZeroUsize,
    },
}

impl GrowthPolicy {
    /// Returns the capacity to grow to when `required` buckets must fit into storage currently holding `capacity`.
    ///
    /// The result is never smaller than `required`, and never larger than the number of distinct buckets unless
    /// `required` itself is.
    pub fn next_capacity(&self, capacity: usize, required: usize) -> usize {
        let grown = match self {
            Self::Doubling => capacity.saturating_mul(2).max(1),
            Self::Linear { step } => capacity.saturating_add(step.get()),
        };

        grown.min(MAX_BUCKETS).max(required)
    }
}

/// Construction-time configuration of a histogram's backing storage.
///
/// Every histogram owns its allocation strategy: there is no process-wide allocator state.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct HistogramConfig {
    /// The number of buckets to allocate up front.
    ///
    /// Clamped to the number of distinct buckets that can exist. Defaults to 16.
    pub initial_capacity: usize,

    /// The growth policy used once the initial capacity is exhausted.
    ///
    /// Defaults to doubling.
    pub growth: GrowthPolicy,
}

impl HistogramConfig {
    /// Returns the effective initial capacity.
    pub fn effective_initial_capacity(&self) -> usize {
        self.initial_capacity.min(MAX_BUCKETS)
    }
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            growth: GrowthPolicy::Doubling,
        }
    }
}
