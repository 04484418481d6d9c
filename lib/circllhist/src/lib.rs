//! Mergeable log-linear histograms.
//!
//! Samples are counted in buckets that split every decade into 90 linear bins, bounding the relative error of any
//! statistic to the width of a bucket while keeping memory proportional to the number of distinct buckets touched.
//! Histograms merge losslessly, and serialize to a compact binary (or base64 text) form that is compatible with other
//! circllhist implementations.
#![deny(warnings)]
#![deny(missing_docs)]

mod bucket;
pub use self::bucket::{BucketKey, Sign, MAX_BUCKETS};

mod config;
pub use self::config::{GrowthPolicy, HistogramConfig};

mod dict;
pub use self::dict::BucketLabel;

mod error;
pub use self::error::HistogramError;

mod histogram;
pub use self::histogram::{Bin, Buckets, Histogram};

mod serialize;

mod stats;

#[cfg(test)]
mod test_util;
