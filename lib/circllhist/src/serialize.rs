//! Binary and text serialization.
//!
//! The binary layout is shared with every other circllhist implementation, so histograms can be exchanged with them
//! byte for byte:
//!
//! ```text
//! +----------------+--------------------------------------------------------------+
//! | record count   | record 0 | record 1 | ...                                      |
//! | u16, big-end.  |                                                              |
//! +----------------+--------------------------------------------------------------+
//!
//! record: | mantissa (i8) | exponent (i8) | width tag t (u8, 0..=7) | count (t + 1 bytes, little-endian) |
//! ```
//!
//! Records are written in ascending bucket order, and each count uses the fewest bytes that can hold it. The text form
//! is the binary form encoded as standard, padded base64.

use base64::{engine::general_purpose::STANDARD, DecodeError, Engine as _};
use bytes::{Buf, BufMut};
use snafu::{ensure, OptionExt as _};
use tracing::debug;

use crate::{
    bucket::{BucketKey, MAX_BUCKETS},
    error::{CorruptDataSnafu, HistogramError},
    histogram::Histogram,
};

const HEADER_LEN: usize = 2;
const RECORD_HEADER_LEN: usize = 3;
const MAX_WIDTH_TAG: u8 = 7;

/// Returns the number of bytes needed to hold `count`, between 1 and 8.
fn count_width(count: u64) -> usize {
    let significant_bits = 64 - count.leading_zeros() as usize;
    significant_bits.div_ceil(8).max(1)
}

impl Histogram {
    /// Returns the exact number of bytes [`serialize`][Self::serialize] will produce.
    pub fn serialized_size(&self) -> usize {
        HEADER_LEN
            + self
                .bins()
                .iter()
                .map(|bin| RECORD_HEADER_LEN + count_width(bin.count))
                .sum::<usize>()
    }

    /// Serializes this histogram into its binary form.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.serialized_size());
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes this histogram into the given buffer, returning the number of bytes written.
    ///
    /// # Panics
    ///
    /// Panics if the buffer cannot grow and has fewer than [`serialized_size`][Self::serialized_size] bytes of room.
    pub fn serialize_into<B: BufMut>(&self, buf: &mut B) -> usize {
        // The number of distinct buckets always fits in a `u16`.
        buf.put_u16(self.bucket_count() as u16);

        let mut written = HEADER_LEN;
        for bin in self.bins() {
            let width = count_width(bin.count);
            buf.put_i8(bin.key.raw_mantissa());
            buf.put_i8(bin.key.exponent());
            buf.put_u8((width - 1) as u8);
            buf.put_uint_le(bin.count, width);
            written += RECORD_HEADER_LEN + width;
        }

        written
    }

    /// Deserializes a histogram from its binary form.
    ///
    /// The whole input must be consumed. Records with a zero count are skipped, and input ending cleanly after fewer
    /// records than the header declares is accepted, as some encoders count buckets in the header that they then omit.
    ///
    /// # Errors
    ///
    /// If the input is truncated, malformed, or followed by trailing bytes, `CorruptData` is returned.
    pub fn deserialize(data: &[u8]) -> Result<Histogram, HistogramError> {
        decode(data).inspect_err(|e| debug!(error = %e, len = data.len(), "Rejected serialized histogram."))
    }

    /// Returns the exact length of the text form returned by [`to_text`][Self::to_text].
    pub fn text_size(&self) -> usize {
        self.serialized_size().div_ceil(3) * 4
    }

    /// Serializes this histogram into its text form: the binary form, base64-encoded.
    pub fn to_text(&self) -> String {
        STANDARD.encode(self.serialize())
    }

    /// Deserializes a histogram from its text form.
    ///
    /// Leading and trailing whitespace is ignored.
    ///
    /// # Errors
    ///
    /// If the input is not valid base64, or does not decode to a valid binary form, `CorruptData` is returned.
    pub fn from_text(text: &str) -> Result<Histogram, HistogramError> {
        let data = STANDARD.decode(text.trim()).map_err(|e| {
            debug!(error = %e, "Rejected text-encoded histogram.");
            HistogramError::CorruptData {
                offset: base64_error_offset(&e),
                reason: "invalid base64 encoding",
            }
        })?;

        Self::deserialize(&data)
    }
}

fn decode(data: &[u8]) -> Result<Histogram, HistogramError> {
    let mut buf = data;
    let offset = |buf: &[u8]| data.len() - buf.len();

    ensure!(
        buf.remaining() >= HEADER_LEN,
        CorruptDataSnafu {
            offset: 0usize,
            reason: "missing record count"
        }
    );
    let declared = usize::from(buf.get_u16());
    ensure!(
        declared <= MAX_BUCKETS,
        CorruptDataSnafu {
            offset: 0usize,
            reason: "record count exceeds the number of distinct buckets"
        }
    );

    // Every record takes at least one count byte, which bounds how many can actually follow the header.
    let mut histogram = Histogram::with_capacity(declared.min(buf.remaining() / (RECORD_HEADER_LEN + 1)));
    let mut records = 0;
    while records < declared && buf.has_remaining() {
        let record_offset = offset(buf);
        ensure!(
            buf.remaining() >= RECORD_HEADER_LEN,
            CorruptDataSnafu {
                offset: record_offset,
                reason: "truncated record"
            }
        );

        let mantissa = buf.get_i8();
        let exponent = buf.get_i8();
        let tag = buf.get_u8();
        ensure!(
            tag <= MAX_WIDTH_TAG,
            CorruptDataSnafu {
                offset: record_offset + 2,
                reason: "count width tag out of range"
            }
        );

        let width = usize::from(tag) + 1;
        ensure!(
            buf.remaining() >= width,
            CorruptDataSnafu {
                offset: offset(buf),
                reason: "truncated record count"
            }
        );
        let count = buf.get_uint_le(width);
        records += 1;

        if count == 0 {
            continue;
        }

        let key = BucketKey::new(mantissa, exponent).context(CorruptDataSnafu {
            offset: record_offset,
            reason: "invalid bucket mantissa",
        })?;
        histogram.insert_key(key, count);
    }

    ensure!(
        !buf.has_remaining(),
        CorruptDataSnafu {
            offset: offset(buf),
            reason: "trailing bytes after the last record"
        }
    );

    if records < declared {
        debug!(declared, records, "Serialized histogram holds fewer records than declared.");
    }

    Ok(histogram)
}

fn base64_error_offset(error: &DecodeError) -> usize {
    match error {
        DecodeError::InvalidByte(offset, _) | DecodeError::InvalidLastSymbol(offset, _) => *offset,
        DecodeError::InvalidLength(len) => *len,
        DecodeError::InvalidPadding => 0,
    }
}
