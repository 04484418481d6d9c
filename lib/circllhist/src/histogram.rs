//! The histogram container.

use std::{cmp::Ordering, iter::FusedIterator, slice};

use smallvec::SmallVec;
use snafu::OptionExt as _;
use tracing::trace;

use crate::{
    bucket::BucketKey,
    config::{GrowthPolicy, HistogramConfig},
    error::{HistogramError, IndexOutOfRangeSnafu},
};

/// A histogram bin: a bucket and the number of samples that fell into it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Bin {
    /// The bucket.
    pub(crate) key: BucketKey,

    /// The number of samples within the bucket. Never zero for a bin stored in a histogram.
    pub(crate) count: u64,
}

impl Bin {
    /// Returns the bucket of the bin.
    pub fn key(&self) -> BucketKey {
        self.key
    }

    /// Returns the number of samples within the bin.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Adds `n` to the count, saturating at `u64::MAX`, and returns how much was actually added.
    fn increment(&mut self, n: u64) -> u64 {
        let next = self.count.saturating_add(n);
        let added = next - self.count;
        self.count = next;
        added
    }
}

/// A log-linear histogram.
///
/// Samples are tracked per [`BucketKey`], and bins are kept sorted by bucket, with at most one bin per bucket. Memory
/// usage is therefore proportional to the number of distinct buckets touched, not to the number of samples.
///
/// Counts never wrap: both per-bucket counts and the total sample count saturate at `u64::MAX`.
///
/// A histogram is designed for a single writer. To aggregate samples across threads, record into one histogram per
/// thread and [`merge`][Histogram::merge] them afterwards.
///
/// # Example
///
/// ```
/// use circllhist::Histogram;
///
/// let mut histogram = Histogram::new();
/// histogram.insert(1.0).unwrap();
/// histogram.insert(1.05).unwrap();
/// histogram.insert_intscale(2_500, -3, 1).unwrap();
///
/// assert_eq!(histogram.bucket_count(), 2);
/// assert_eq!(histogram.sample_count(), 3);
/// ```
#[derive(Clone, Debug)]
pub struct Histogram {
    /// The bins within the histogram, sorted by bucket.
    bins: SmallVec<[Bin; 4]>,

    /// The number of samples within the histogram.
    count: u64,

    /// How the bin storage grows once full.
    growth: GrowthPolicy,
}

impl Histogram {
    /// Creates an empty histogram with the default configuration.
    pub fn new() -> Self {
        Self::with_config(&HistogramConfig::default())
    }

    /// Creates an empty histogram with room for `capacity` buckets before needing to grow.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(&HistogramConfig {
            initial_capacity: capacity,
            ..Default::default()
        })
    }

    /// Creates an empty histogram with the given configuration.
    pub fn with_config(config: &HistogramConfig) -> Self {
        Self {
            bins: SmallVec::with_capacity(config.effective_initial_capacity()),
            count: 0,
            growth: config.growth,
        }
    }

    /// Returns the number of distinct buckets holding samples.
    pub fn bucket_count(&self) -> usize {
        self.bins.len()
    }

    /// Returns the total number of samples in the histogram.
    pub fn sample_count(&self) -> u64 {
        self.count
    }

    /// Whether or not this histogram holds any samples.
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Returns the number of buckets that can be held before the backing storage has to grow.
    pub fn capacity(&self) -> usize {
        self.bins.capacity()
    }

    /// Returns the bins of this histogram, in ascending bucket order.
    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    /// Returns the bucket and count at the given position, in ascending bucket order.
    ///
    /// # Errors
    ///
    /// If `index` is not less than [`bucket_count`][Self::bucket_count], `IndexOutOfRange` is returned.
    pub fn bucket_at(&self, index: usize) -> Result<(BucketKey, u64), HistogramError> {
        self.bins
            .get(index)
            .map(|bin| (bin.key, bin.count))
            .context(IndexOutOfRangeSnafu {
                index,
                len: self.bins.len(),
            })
    }

    /// Returns the number of samples in the given bucket.
    pub fn count_of(&self, key: BucketKey) -> u64 {
        self.find(key).map(|idx| self.bins[idx].count).unwrap_or(0)
    }

    /// Returns an iterator over all buckets and their counts, in ascending bucket order.
    ///
    /// The iterator borrows the histogram, so the histogram cannot be modified while a traversal is in progress. Call
    /// this again to restart the traversal.
    pub fn iter(&self) -> Buckets<'_> {
        Buckets {
            inner: self.bins.iter(),
        }
    }

    /// Inserts a single sample.
    ///
    /// # Errors
    ///
    /// If the value cannot be encoded into a bucket, an error is returned and the histogram is left unchanged. See
    /// [`BucketKey::encode`].
    pub fn insert(&mut self, value: f64) -> Result<(), HistogramError> {
        self.insert_n(value, 1).map(|_| ())
    }

    /// Inserts `count` samples of the given value, returning the number of samples actually added.
    ///
    /// Fewer than `count` samples are added only when the bucket count saturates.
    ///
    /// # Errors
    ///
    /// If the value cannot be encoded into a bucket, an error is returned and the histogram is left unchanged. See
    /// [`BucketKey::encode`].
    pub fn insert_n(&mut self, value: f64, count: u64) -> Result<u64, HistogramError> {
        let key = BucketKey::encode(value)?;
        Ok(self.insert_key(key, count))
    }

    /// Inserts `count` samples of the value `value * 10^scale`, returning the number of samples actually added.
    ///
    /// This avoids floating-point rounding entirely, and so should be preferred when values are already available in
    /// scaled integer form.
    ///
    /// # Errors
    ///
    /// If the value cannot be encoded into a bucket, an error is returned and the histogram is left unchanged. See
    /// [`BucketKey::encode_intscale`].
    pub fn insert_intscale(&mut self, value: i64, scale: i32, count: u64) -> Result<u64, HistogramError> {
        let key = BucketKey::encode_intscale(value, scale)?;
        Ok(self.insert_key(key, count))
    }

    /// Inserts `count` samples into the given bucket, returning the number of samples actually added.
    pub fn insert_key(&mut self, key: BucketKey, count: u64) -> u64 {
        if count == 0 {
            return 0;
        }

        let added = match self.find(key) {
            Ok(idx) => self.bins[idx].increment(count),
            Err(idx) => {
                self.reserve_for(self.bins.len() + 1);
                self.bins.insert(idx, Bin { key, count });
                count
            }
        };

        if added < count {
            trace!(bucket = %key, requested = count, added, "Bucket count saturated.");
        }

        self.add_to_total(added);
        added
    }

    /// Inserts many values into the histogram, one sample each.
    ///
    /// All values are encoded before the histogram is touched, so if any value is invalid, an error is returned and the
    /// histogram is left unchanged.
    ///
    /// # Errors
    ///
    /// If any value cannot be encoded into a bucket, an error is returned. See [`BucketKey::encode`].
    pub fn insert_many(&mut self, values: &[f64]) -> Result<(), HistogramError> {
        let mut keys = values
            .iter()
            .map(|value| BucketKey::encode(*value))
            .collect::<Result<Vec<_>, _>>()?;
        keys.sort_unstable();

        let mut runs: Vec<Bin> = Vec::new();
        for key in keys {
            match runs.last_mut() {
                Some(run) if run.key == key => run.count += 1,
                _ => runs.push(Bin { key, count: 1 }),
            }
        }

        self.merge_sorted_bins(&runs);
        Ok(())
    }

    /// Removes up to `count` samples of the given value, returning the number of samples actually removed.
    ///
    /// A bucket whose count drops to zero is removed from the histogram entirely.
    ///
    /// # Errors
    ///
    /// If the value cannot be encoded into a bucket, an error is returned and the histogram is left unchanged. See
    /// [`BucketKey::encode`].
    pub fn remove_n(&mut self, value: f64, count: u64) -> Result<u64, HistogramError> {
        let key = BucketKey::encode(value)?;
        let idx = match self.find(key) {
            Ok(idx) => idx,
            Err(_) => return Ok(0),
        };

        let bin = &mut self.bins[idx];
        let removed = bin.count.min(count);
        bin.count -= removed;
        if bin.count == 0 {
            self.bins.remove(idx);
        }

        if self.count == u64::MAX {
            // A saturated total no longer tracks the buckets, so rebuild it from them.
            self.count = self.bins.iter().fold(0u64, |acc, bin| acc.saturating_add(bin.count));
        } else {
            self.count -= removed;
        }
        Ok(removed)
    }

    /// Merges another histogram into this one.
    ///
    /// Counts of buckets present in both histograms are summed (saturating), and buckets only present in `other` are
    /// copied over. Runs in a single linear pass over both histograms, and grows the backing storage at most once.
    pub fn merge(&mut self, other: &Histogram) {
        self.merge_sorted_bins(&other.bins);
    }

    /// Merges many histograms into this one.
    ///
    /// The sources are combined with a single k-way walk, and the result is then merged into this histogram in one
    /// linear pass.
    pub fn accumulate(&mut self, sources: &[&Histogram]) {
        let mut cursors = vec![0usize; sources.len()];
        let mut combined: Vec<Bin> = Vec::new();

        loop {
            // Find the smallest bucket across the heads of all sources.
            let smallest = sources
                .iter()
                .zip(cursors.iter())
                .filter_map(|(source, &cursor)| source.bins.get(cursor).map(|bin| bin.key))
                .min();

            let Some(key) = smallest else {
                break;
            };

            // Advance every source whose head is that bucket, summing their counts.
            let mut bin = Bin { key, count: 0 };
            for (source, cursor) in sources.iter().zip(cursors.iter_mut()) {
                if let Some(head) = source.bins.get(*cursor) {
                    if head.key == key {
                        bin.increment(head.count);
                        *cursor += 1;
                    }
                }
            }

            combined.push(bin);
        }

        self.merge_sorted_bins(&combined);
    }

    /// Returns a coarser copy of this histogram with a minimum bucket exponent.
    ///
    /// Buckets with an exponent below `min_exponent` are folded into the zero bucket, and buckets with exactly that
    /// exponent keep only their first significant digit. All other buckets are copied as-is. The sample count is
    /// preserved.
    pub fn compress_mbe(&self, min_exponent: i8) -> Histogram {
        let mut compressed = Self {
            bins: SmallVec::with_capacity(self.bins.len()),
            count: 0,
            growth: self.growth,
        };

        for bin in &self.bins {
            let exponent = bin.key.exponent();
            let key = match exponent.cmp(&min_exponent) {
                Ordering::Less => BucketKey::ZERO,
                Ordering::Equal => {
                    let mantissa = bin.key.raw_mantissa() / 10 * 10;
                    BucketKey::new(mantissa, exponent).unwrap_or(BucketKey::ZERO)
                }
                Ordering::Greater => bin.key,
            };
            compressed.insert_key(key, bin.count);
        }

        compressed
    }

    /// Removes all samples from the histogram.
    ///
    /// The backing storage is kept, so refilling the histogram with up to the same number of buckets does not
    /// allocate.
    pub fn clear(&mut self) {
        self.bins.clear();
        self.count = 0;
    }

    fn find(&self, key: BucketKey) -> Result<usize, usize> {
        self.bins.binary_search_by(|bin| bin.key.cmp(&key))
    }

    fn add_to_total(&mut self, n: u64) {
        self.count = self.count.saturating_add(n);
    }

    /// Ensures there is room for `required` bins, growing according to the growth policy.
    fn reserve_for(&mut self, required: usize) {
        let capacity = self.bins.capacity();
        if required <= capacity {
            return;
        }

        let new_capacity = self.growth.next_capacity(capacity, required);
        trace!(capacity, new_capacity, "Growing histogram storage.");
        self.bins.reserve_exact(new_capacity - self.bins.len());
    }

    /// Merges sorted bins, with unique buckets and non-zero counts, into this histogram.
    fn merge_sorted_bins(&mut self, incoming: &[Bin]) {
        if incoming.is_empty() {
            return;
        }

        // Count the buckets we don't have yet, so that we know the final length up front and grow at most once.
        let mut missing = 0;
        let mut bins_idx = 0;
        let mut incoming_idx = 0;
        while bins_idx < self.bins.len() && incoming_idx < incoming.len() {
            match self.bins[bins_idx].key.cmp(&incoming[incoming_idx].key) {
                Ordering::Less => bins_idx += 1,
                Ordering::Greater => {
                    missing += 1;
                    incoming_idx += 1;
                }
                Ordering::Equal => {
                    bins_idx += 1;
                    incoming_idx += 1;
                }
            }
        }
        missing += incoming.len() - incoming_idx;

        let old_len = self.bins.len();
        let new_len = old_len + missing;
        self.reserve_for(new_len);
        self.bins.resize(
            new_len,
            Bin {
                key: BucketKey::ZERO,
                count: 0,
            },
        );

        // Walk both sequences from the back, writing each bin into its final slot. The write cursor never falls behind
        // the read cursor, so no existing bin is overwritten before it has been moved, and once the incoming bins are
        // exhausted the remaining existing bins are already in place.
        let mut read = old_len;
        let mut write = new_len;
        let mut added = 0u64;
        for other in incoming.iter().rev() {
            while read > 0 && self.bins[read - 1].key > other.key {
                write -= 1;
                read -= 1;
                self.bins[write] = self.bins[read];
            }

            write -= 1;
            if read > 0 && self.bins[read - 1].key == other.key {
                read -= 1;
                let mut bin = self.bins[read];
                added = added.saturating_add(bin.increment(other.count));
                self.bins[write] = bin;
            } else {
                self.bins[write] = *other;
                added = added.saturating_add(other.count);
            }
        }
        debug_assert_eq!(read, write);

        self.add_to_total(added);
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Histogram {
    fn eq(&self, other: &Self) -> bool {
        // Capacity and growth policy are allocation details, not part of the histogram's value.
        self.count == other.count && self.bins == other.bins
    }
}

impl Eq for Histogram {}

impl<'a> IntoIterator for &'a Histogram {
    type Item = (BucketKey, u64);
    type IntoIter = Buckets<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the buckets of a [`Histogram`], in ascending bucket order.
#[derive(Clone, Debug)]
pub struct Buckets<'a> {
    inner: slice::Iter<'a, Bin>,
}

impl Iterator for Buckets<'_> {
    type Item = (BucketKey, u64);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|bin| (bin.key, bin.count))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for Buckets<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|bin| (bin.key, bin.count))
    }
}

impl ExactSizeIterator for Buckets<'_> {}

impl FusedIterator for Buckets<'_> {}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;

    fn build(values: &[f64]) -> Histogram {
        let mut histogram = Histogram::new();
        for value in values {
            histogram.insert(*value).expect("test values should encode");
        }
        histogram
    }

    fn assert_sorted_and_unique(histogram: &Histogram) {
        for pair in histogram.bins().windows(2) {
            assert!(pair[0].key < pair[1].key, "bins out of order: {:?}", pair);
        }
        assert!(histogram.bins().iter().all(|bin| bin.count > 0));
    }

    #[test]
    fn test_histogram_basic() {
        let mut histogram = Histogram::new();
        assert!(histogram.is_empty());
        assert_eq!(histogram.bucket_count(), 0);
        assert_eq!(histogram.sample_count(), 0);

        for value in [1.0, 1.0, 2.0, 2.0, 2.0, 3.0] {
            histogram.insert(value).unwrap();
        }

        assert!(!histogram.is_empty());
        assert_eq!(histogram.bucket_count(), 3);
        assert_eq!(histogram.sample_count(), 6);
        assert_eq!(histogram.bucket_at(0).unwrap(), (BucketKey::encode(1.0).unwrap(), 2));
        assert_eq!(histogram.bucket_at(1).unwrap(), (BucketKey::encode(2.0).unwrap(), 3));
        assert_eq!(histogram.bucket_at(2).unwrap(), (BucketKey::encode(3.0).unwrap(), 1));
        assert_eq!(
            histogram.bucket_at(3),
            Err(HistogramError::IndexOutOfRange { index: 3, len: 3 })
        );
    }

    #[test]
    fn test_insert_invalid_value_leaves_histogram_unchanged() {
        let mut histogram = build(&[1.0, 2.0]);
        let before = histogram.clone();

        assert!(histogram.insert(f64::NAN).is_err());
        assert!(histogram.insert_n(f64::INFINITY, 5).is_err());
        assert!(histogram.insert_many(&[3.0, f64::NEG_INFINITY, 4.0]).is_err());
        assert_eq!(histogram, before);
    }

    #[test]
    fn test_insert_zero_count() {
        let mut histogram = Histogram::new();
        assert_eq!(histogram.insert_n(5.0, 0).unwrap(), 0);
        assert!(histogram.is_empty());
    }

    #[test]
    fn test_insert_mixed_signs_sorted() {
        let histogram = build(&[5.0, -5.0, 0.0, 0.001, -0.001, 1e10, -1e10, 5.01, -5.01]);
        assert_sorted_and_unique(&histogram);
        assert_eq!(histogram.bucket_count(), 7);
        assert_eq!(histogram.sample_count(), 9);
        assert_eq!(histogram.bucket_at(0).unwrap().0, BucketKey::encode(-1e10).unwrap());
        assert_eq!(histogram.bucket_at(3).unwrap().0, BucketKey::ZERO);
    }

    #[test]
    fn test_intscale_insertion() {
        let mut histogram = Histogram::new();
        histogram.insert_intscale(1_300_000_000, -9, 2).unwrap();
        histogram.insert(1.3).unwrap();
        assert_eq!(histogram.bucket_count(), 1);
        assert_eq!(histogram.sample_count(), 3);
    }

    #[test]
    fn test_sample_count_saturates() {
        let mut histogram = Histogram::new();
        assert_eq!(histogram.insert_n(1.0, u64::MAX).unwrap(), u64::MAX);
        assert_eq!(histogram.insert_n(2.0, u64::MAX).unwrap(), u64::MAX);
        assert_eq!(histogram.sample_count(), u64::MAX);

        // The bucket itself is full, so nothing more can be added to it.
        assert_eq!(histogram.insert_n(1.0, 10).unwrap(), 0);
        assert_eq!(histogram.count_of(BucketKey::encode(1.0).unwrap()), u64::MAX);
    }

    #[test]
    fn test_clear_retains_capacity() {
        let values = (1..=50).map(f64::from).collect::<Vec<_>>();

        let mut histogram = Histogram::new();
        for _ in 0..200 {
            for value in &values {
                histogram.insert(*value).unwrap();
            }
        }
        assert_eq!(histogram.bucket_count(), 50);
        assert_eq!(histogram.sample_count(), 10_000);

        let capacity = histogram.capacity();
        histogram.clear();
        assert_eq!(histogram.bucket_count(), 0);
        assert_eq!(histogram.sample_count(), 0);
        assert_eq!(histogram.capacity(), capacity);

        for value in &values {
            histogram.insert(*value).unwrap();
        }
        assert_eq!(histogram.bucket_count(), 50);
        assert_eq!(histogram.capacity(), capacity);
    }

    #[test]
    fn test_linear_growth() {
        let config = HistogramConfig {
            initial_capacity: 10,
            growth: GrowthPolicy::Linear {
                step: NonZeroUsize::new(10).unwrap(),
            },
        };
        let mut histogram = Histogram::with_config(&config);
        assert_eq!(histogram.capacity(), 10);

        for i in 10..21 {
            histogram.insert(f64::from(i)).unwrap();
        }
        assert_eq!(histogram.bucket_count(), 11);
        assert_eq!(histogram.capacity(), 20);
    }

    #[test]
    fn test_remove() {
        let mut histogram = build(&[1.0, 1.0, 2.0]);
        assert_eq!(histogram.remove_n(1.0, 1).unwrap(), 1);
        assert_eq!(histogram.sample_count(), 2);
        assert_eq!(histogram.bucket_count(), 2);

        assert_eq!(histogram.remove_n(1.0, 5).unwrap(), 1);
        assert_eq!(histogram.sample_count(), 1);
        assert_eq!(histogram.bucket_count(), 1);

        assert_eq!(histogram.remove_n(7.0, 1).unwrap(), 0);
        assert_eq!(histogram.sample_count(), 1);
    }

    #[test]
    fn test_remove_after_saturation() {
        let mut histogram = Histogram::new();
        histogram.insert_n(1.0, u64::MAX).unwrap();
        histogram.insert_n(2.0, 10).unwrap();
        assert_eq!(histogram.sample_count(), u64::MAX);

        assert_eq!(histogram.remove_n(2.0, 5).unwrap(), 5);
        assert_eq!(histogram.sample_count(), u64::MAX);

        assert_eq!(histogram.remove_n(1.0, u64::MAX).unwrap(), u64::MAX);
        assert_eq!(histogram.sample_count(), 5);
        assert_eq!(histogram.bucket_count(), 1);
    }

    #[test]
    fn test_merge() {
        let mut all_values = Histogram::new();
        let mut odd_values = Histogram::new();
        let mut even_values = Histogram::new();
        let mut all_values_many = Histogram::new();

        let mut values = Vec::new();
        for i in -50..=50 {
            let v = f64::from(i);

            all_values.insert(v).unwrap();

            if i & 1 == 0 {
                odd_values.insert(v).unwrap();
            } else {
                even_values.insert(v).unwrap();
            }

            values.push(v);
        }

        all_values_many.insert_many(&values).unwrap();

        odd_values.merge(&even_values);
        let merged_values = odd_values;

        // Number of bins should be equal to the number of values we inserted.
        assert_eq!(all_values.bucket_count(), values.len());
        assert_eq!(all_values, merged_values);
        assert_eq!(all_values, all_values_many);
        assert_sorted_and_unique(&merged_values);
    }

    #[test]
    fn test_merge_overlapping() {
        let mut left = build(&[1.0, 2.0, 3.0, 3.0]);
        let right = build(&[0.5, 2.0, 3.0, 40.0]);
        left.merge(&right);

        assert_sorted_and_unique(&left);
        assert_eq!(left.sample_count(), 8);
        assert_eq!(left.bucket_count(), 5);
        assert_eq!(left.count_of(BucketKey::encode(3.0).unwrap()), 3);
        assert_eq!(left.count_of(BucketKey::encode(2.0).unwrap()), 2);
        assert_eq!(left.count_of(BucketKey::encode(0.5).unwrap()), 1);
    }

    #[test]
    fn test_merge_empty_is_noop() {
        let mut histogram = build(&[1.0, -2.0, 0.0, 300.0]);
        let before = histogram.clone();

        histogram.merge(&Histogram::new());
        assert_eq!(histogram, before);
        assert_eq!(histogram.sample_count(), 4);

        let mut empty = Histogram::new();
        empty.merge(&before);
        assert_eq!(empty, before);
    }

    #[test]
    fn test_merge_saturates() {
        let mut left = Histogram::new();
        left.insert_n(1.0, u64::MAX - 1).unwrap();
        let mut right = Histogram::new();
        right.insert_n(1.0, 10).unwrap();

        left.merge(&right);
        assert_eq!(left.sample_count(), u64::MAX);
        assert_eq!(left.bucket_at(0).unwrap().1, u64::MAX);
    }

    #[test]
    fn test_accumulate() {
        let a = build(&[1.0, 2.0, 3.0]);
        let b = build(&[-1.0, 2.0]);
        let c = build(&[3.0, 3.0, 100.0]);

        let mut sequential = build(&[0.0, 2.0]);
        let mut accumulated = sequential.clone();

        sequential.merge(&a);
        sequential.merge(&b);
        sequential.merge(&c);
        accumulated.accumulate(&[&a, &b, &c]);

        assert_eq!(accumulated, sequential);
        assert_sorted_and_unique(&accumulated);
        assert_eq!(accumulated.sample_count(), 10);

        let before = accumulated.clone();
        accumulated.accumulate(&[]);
        assert_eq!(accumulated, before);
    }

    #[test]
    fn test_compress_mbe() {
        let values = [
            0.0, 1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 21.0, 22.0, 23.0, 99.0, 100.0, 110.0, 120.0, 210.0, 220.0,
        ];
        let histogram = build(&values);

        let compressed = histogram.compress_mbe(0);
        assert_eq!(compressed.bucket_count(), 16);
        let compressed = compressed.compress_mbe(1);
        assert_eq!(compressed.bucket_count(), 9);
        let compressed = compressed.compress_mbe(2);
        assert_eq!(compressed.bucket_count(), 3);
        let compressed = compressed.compress_mbe(3);
        assert_eq!(compressed.bucket_count(), 1);
        assert_eq!(compressed.sample_count(), 16);
        assert_eq!(compressed.bucket_at(0).unwrap(), (BucketKey::ZERO, 16));
    }

    #[test]
    fn test_iteration_is_restartable() {
        let histogram = build(&[3.0, 1.0, 2.0, 2.0]);

        let first = histogram.iter().collect::<Vec<_>>();
        let second = (&histogram).into_iter().collect::<Vec<_>>();
        assert_eq!(first, second);
        assert_eq!(histogram.iter().len(), histogram.bucket_count());
        assert_eq!(first.iter().map(|(_, count)| count).sum::<u64>(), 4);
        assert_eq!(histogram.iter().next_back().unwrap().0, BucketKey::encode(3.0).unwrap());
    }

    fn arb_values() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(
            prop_oneof![
                -1e6f64..1e6f64,
                (-1000i32..1000i32).prop_map(f64::from),
                Just(0.0),
            ],
            0..200,
        )
    }

    proptest! {
        #[test]
        fn property_test_buckets_unique_and_sorted(values in arb_values()) {
            let histogram = build(&values);
            for pair in histogram.bins().windows(2) {
                prop_assert!(pair[0].key < pair[1].key);
            }
            prop_assert_eq!(histogram.sample_count(), values.len() as u64);
            prop_assert_eq!(histogram.iter().map(|(_, count)| count).sum::<u64>(), values.len() as u64);
        }

        #[test]
        fn property_test_merge_commutes(left in arb_values(), right in arb_values()) {
            let a = build(&left);
            let b = build(&right);

            let mut ab = a.clone();
            ab.merge(&b);
            let mut ba = b.clone();
            ba.merge(&a);
            prop_assert_eq!(&ab, &ba);

            // Merging is the same as inserting the raw samples of the other histogram.
            let mut inserted = a.clone();
            for value in &right {
                inserted.insert(*value).unwrap();
            }
            prop_assert_eq!(&ab, &inserted);
            prop_assert_eq!(ab.sample_count(), a.sample_count() + b.sample_count());
        }

        #[test]
        fn property_test_insert_many_matches_insert(values in arb_values()) {
            let mut batched = Histogram::new();
            batched.insert_many(&values).unwrap();
            prop_assert_eq!(batched, build(&values));
        }
    }
}
