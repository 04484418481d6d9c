//! Approximate statistics over a histogram.
//!
//! Every sample is assumed to sit at the midpoint of its bucket for the purposes of sums and moments, and to be spread
//! uniformly across its bucket for quantile interpolation.

use ordered_float::OrderedFloat;
use snafu::ensure;

use crate::{
    bucket::BucketKey,
    error::{HistogramError, InvalidQuantileSnafu},
    histogram::{Bin, Histogram},
};

impl Histogram {
    /// Returns the approximate sum of all samples.
    ///
    /// Returns 0 for an empty histogram.
    pub fn sum(&self) -> f64 {
        self.bins()
            .iter()
            .map(|bin| bin.key.midpoint() * bin.count as f64)
            .sum()
    }

    /// Returns the approximate mean of all samples.
    ///
    /// Returns 0 for an empty histogram.
    pub fn mean(&self) -> f64 {
        let total = self.total();
        if total == 0.0 {
            return 0.0;
        }

        self.sum() / total
    }

    /// Returns the approximate `k`-th raw moment, `E[x^k]`.
    ///
    /// The zeroth moment of a non-empty histogram is 1. Returns 0 for an empty histogram.
    pub fn moment(&self, k: u32) -> f64 {
        let total = self.total();
        if total == 0.0 {
            return 0.0;
        }

        let exponent = i32::try_from(k).unwrap_or(i32::MAX);
        let weighted = self
            .bins()
            .iter()
            .map(|bin| bin.key.midpoint().powi(exponent) * bin.count as f64)
            .sum::<f64>();
        weighted / total
    }

    /// Returns the approximate population standard deviation.
    ///
    /// Returns 0 for an empty histogram.
    pub fn stddev(&self) -> f64 {
        let mean = self.mean();
        let variance = self.moment(2) - mean * mean;

        // Rounding can push the variance of a tightly clustered histogram slightly below zero.
        variance.max(0.0).sqrt()
    }

    /// Returns the number of samples in buckets lying entirely at or below `threshold`.
    ///
    /// Buckets straddling the threshold are not counted, so this is a lower bound on the exact count.
    pub fn count_below(&self, threshold: f64) -> u64 {
        self.bins()
            .iter()
            .filter(|bin| bin.key.right() <= threshold)
            .fold(0u64, |acc, bin| acc.saturating_add(bin.count))
    }

    /// Returns the number of samples in buckets lying entirely at or above `threshold`.
    ///
    /// Buckets straddling the threshold are not counted, so this is a lower bound on the exact count.
    pub fn count_above(&self, threshold: f64) -> u64 {
        self.bins()
            .iter()
            .filter(|bin| bin.key.left() >= threshold)
            .fold(0u64, |acc, bin| acc.saturating_add(bin.count))
    }

    /// Returns the number of samples in the bucket that `value` falls into.
    ///
    /// # Errors
    ///
    /// If the value cannot be encoded into a bucket, an error is returned. See [`BucketKey::encode`].
    pub fn count_nearby(&self, value: f64) -> Result<u64, HistogramError> {
        let key = BucketKey::encode(value)?;
        Ok(self.count_of(key))
    }

    /// Returns the approximate value at the given quantile.
    ///
    /// Returns 0 for an empty histogram.
    ///
    /// # Errors
    ///
    /// If `q` is not within `[0, 1]`, `InvalidQuantile` is returned.
    pub fn quantile(&self, q: f64) -> Result<f64, HistogramError> {
        let values = self.quantiles(std::slice::from_ref(&q))?;
        Ok(values.into_iter().next().unwrap_or_default())
    }

    /// Returns the approximate values at each of the given quantiles, in the order they were requested.
    ///
    /// Requests may be in any order: they are sorted internally so that all of them are answered in a single pass over
    /// the buckets.
    ///
    /// # Errors
    ///
    /// If any requested quantile is not within `[0, 1]`, `InvalidQuantile` is returned.
    pub fn quantiles(&self, qs: &[f64]) -> Result<Vec<f64>, HistogramError> {
        for q in qs {
            ensure!((0.0..=1.0).contains(q), InvalidQuantileSnafu { q: *q });
        }

        let mut values = vec![0.0; qs.len()];
        let bins = self.bins();
        if bins.is_empty() {
            return Ok(values);
        }

        let mut order = (0..qs.len()).collect::<Vec<_>>();
        order.sort_unstable_by_key(|idx| OrderedFloat(qs[*idx]));

        let total = self.total();
        let mut cursor = CumulativeCursor::new(bins);
        for idx in order {
            let target = qs[idx] * total;
            cursor.advance_to(target);
            values[idx] = cursor.interpolate(target);
        }

        Ok(values)
    }

    /// Sum of all counts as a float, used as the divisor of averages.
    fn total(&self) -> f64 {
        self.bins().iter().map(|bin| bin.count as f64).sum()
    }
}

/// Walks the cumulative distribution of a non-empty set of bins.
struct CumulativeCursor<'a> {
    bins: &'a [Bin],
    idx: usize,

    /// Number of samples in all bins before the current one.
    lower: f64,

    /// Number of samples in all bins up to and including the current one.
    upper: f64,
}

impl<'a> CumulativeCursor<'a> {
    fn new(bins: &'a [Bin]) -> Self {
        let upper = bins.first().map_or(0.0, |bin| bin.count as f64);
        Self {
            bins,
            idx: 0,
            lower: 0.0,
            upper,
        }
    }

    /// Moves forward until the current bin holds the sample of rank `target`, or the last bin is reached.
    fn advance_to(&mut self, target: f64) {
        while self.idx + 1 < self.bins.len() && self.upper < target {
            self.idx += 1;
            self.lower = self.upper;
            self.upper = self.lower + self.bins[self.idx].count as f64;
        }
    }

    /// Interpolates the value of rank `target` within the current bin.
    fn interpolate(&self, target: f64) -> f64 {
        let key = self.bins[self.idx].key;
        let left = key.left();
        let width = key.width();

        if target == self.lower {
            left
        } else if target == self.upper {
            key.right()
        } else if width == 0.0 {
            left
        } else {
            left + (target - self.lower) / (self.upper - self.lower) * width
        }
    }
}
