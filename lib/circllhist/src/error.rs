//! Error types.

use snafu::Snafu;

/// Errors that can occur when building, querying, or decoding histograms.
///
/// Count overflow is not an error: bucket and sample counts saturate at `u64::MAX`.
#[derive(Clone, Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum HistogramError {
    /// A value could not be mapped to a bucket.
    ///
    /// Raised for NaN and infinite values, and for bucket labels that do not parse as a finite number.
    #[snafu(display("invalid value '{}': only finite numbers can be bucketed", value))]
    InvalidValue {
        /// Textual form of the rejected value.
        value: String,
    },

    /// A requested quantile was outside of `[0, 1]`.
    #[snafu(display("quantile {} is outside of the range [0, 1]", q))]
    InvalidQuantile {
        /// The rejected quantile.
        q: f64,
    },

    /// A positional bucket lookup was past the end of the histogram.
    #[snafu(display("bucket index {} out of range for histogram with {} buckets", index, len))]
    IndexOutOfRange {
        /// The requested index.
        index: usize,

        /// The number of buckets in the histogram.
        len: usize,
    },

    /// A value's decimal exponent does not fit into a bucket key.
    #[snafu(display("decimal exponent {} exceeds the representable bucket range", exponent))]
    EncodingOverflow {
        /// The decimal exponent that would have been required.
        exponent: i64,
    },

    /// Serialized histogram data was malformed or truncated.
    #[snafu(display("corrupt histogram data at byte {}: {}", offset, reason))]
    CorruptData {
        /// Byte offset into the input at which decoding failed.
        offset: usize,

        /// What was wrong with the input.
        reason: &'static str,
    },
}
