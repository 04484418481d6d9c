//! Log-linear bucket keys.
//!
//! Every finite value maps to exactly one bucket, identified by a two-significant-digit mantissa and a decimal
//! exponent. A bucket with mantissa `m` and exponent `e` covers `[m/10 * 10^e, (m+1)/10 * 10^e)`, mirrored around zero
//! for negative mantissas, so each decade is split into 90 linear bins and the relative error of any bucket is at most
//! 10% of its edge (5% around its midpoint).

use std::{cmp::Ordering, fmt, str::FromStr};

use snafu::ensure;

use crate::error::{EncodingOverflowSnafu, HistogramError, InvalidValueSnafu};

#[allow(clippy::unreadable_literal, clippy::excessive_precision)]
mod tables {
    include!(concat!(env!("OUT_DIR"), "/tables.rs"));
}

use self::tables::{MIN_POWER_OF_TEN, POWERS_OF_TEN};

/// Number of distinct buckets that can exist: 90 mantissas per sign per exponent, plus the zero bucket.
pub const MAX_BUCKETS: usize = 2 * 90 * 256 + 1;

#[inline]
fn power_of_ten(exponent: i16) -> (f64, f64) {
    // Callers stay within `i8::MIN - 1..=i8::MAX`, which is exactly the table range.
    POWERS_OF_TEN[(exponent - MIN_POWER_OF_TEN) as usize]
}

/// Returns `units * 10^(exponent - 1)`, correctly rounded.
///
/// This is the magnitude of the bucket side at `units` tenths of the decade `10^exponent`, so for any mantissa `m`,
/// `side(m, e)` is exactly the double that the decimal literal `me(e-1)` parses to.
#[inline]
fn side(units: u8, exponent: i8) -> f64 {
    let (hi, lo) = power_of_ten(i16::from(exponent) - 1);
    let units = f64::from(units);
    units.mul_add(hi, units * lo)
}

/// The sign of a bucket.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Sign {
    /// Bucket of strictly negative values.
    Negative,

    /// The zero bucket.
    Zero,

    /// Bucket of strictly positive values.
    Positive,
}

/// Canonical identity of a log-linear histogram bucket.
///
/// Keys are totally ordered along the real axis: the most negative bucket comes first, then the zero bucket, then
/// positive buckets by increasing value.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct BucketKey {
    /// Two significant digits, carrying the sign of the bucket. Zero only for the zero bucket.
    mantissa: i8,

    /// Decimal exponent of the bucket edge, such that the edge is `mantissa / 10 * 10^exponent`.
    exponent: i8,
}

impl BucketKey {
    /// The bucket holding exactly zero (and values too small to be represented).
    pub const ZERO: Self = Self {
        mantissa: 0,
        exponent: 0,
    };

    /// Creates a bucket key from its raw parts.
    ///
    /// The mantissa carries the sign and must have a magnitude within `10..=99`, or be zero for the zero bucket (in
    /// which case the exponent is ignored). Returns `None` for any other mantissa.
    pub fn new(mantissa: i8, exponent: i8) -> Option<Self> {
        match mantissa.unsigned_abs() {
            0 => Some(Self::ZERO),
            10..=99 => Some(Self { mantissa, exponent }),
            _ => None,
        }
    }

    /// Maps a value to the bucket that contains it.
    ///
    /// Values whose magnitude is below `1e-128` are flushed to the zero bucket.
    ///
    /// # Errors
    ///
    /// If the value is NaN or infinite, `InvalidValue` is returned. If the magnitude of the value is `1e128` or greater,
    /// `EncodingOverflow` is returned, as its exponent cannot be represented.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn encode(value: f64) -> Result<Self, HistogramError> {
        ensure!(
            value.is_finite(),
            InvalidValueSnafu {
                value: value.to_string()
            }
        );

        let magnitude = value.abs();
        if magnitude < side(10, i8::MIN) {
            return Ok(Self::ZERO);
        }
        ensure!(
            magnitude < side(100, i8::MAX),
            EncodingOverflowSnafu {
                exponent: magnitude.log10().floor() as i64
            }
        );

        // Estimate the bucket with plain floating point first. `log10` and the scaling can each be off by a rounding
        // error, which only matters right at a bucket side, so the estimate is then settled against the exact sides.
        let exponent = (magnitude.log10().floor() as i64).clamp(i64::from(i8::MIN), i64::from(i8::MAX)) as i8;
        let scaled = magnitude / power_of_ten(i16::from(exponent)).0 * 10.0;
        let mantissa = scaled.floor().clamp(10.0, 99.0) as u8;
        let (mantissa, exponent) = settle(magnitude, mantissa, exponent);

        let mantissa = mantissa as i8;
        Ok(Self {
            mantissa: if value < 0.0 { -mantissa } else { mantissa },
            exponent,
        })
    }

    /// Maps the value `value * 10^scale` to the bucket that contains it, using only integer arithmetic.
    ///
    /// This is loss-free, and so should be preferred over [`encode`][Self::encode] whenever a value is already available
    /// in a scaled integer form, such as a duration in nanoseconds (`scale = -9`).
    ///
    /// # Errors
    ///
    /// If the resulting exponent cannot be represented, `EncodingOverflow` is returned.
    #[allow(clippy::cast_possible_truncation)]
    pub fn encode_intscale(value: i64, scale: i32) -> Result<Self, HistogramError> {
        if value == 0 {
            return Ok(Self::ZERO);
        }

        let mut magnitude = value.unsigned_abs();
        let mut exponent = i64::from(scale) + 1;
        if magnitude < 10 {
            magnitude *= 10;
            exponent -= 1;
        }
        while magnitude >= 100 {
            magnitude /= 10;
            exponent += 1;
        }

        if exponent < i64::from(i8::MIN) {
            return Ok(Self::ZERO);
        }
        ensure!(exponent <= i64::from(i8::MAX), EncodingOverflowSnafu { exponent });

        // The loops above leave the magnitude within `10..=99`, and the exponent was bounds-checked.
        let mantissa = magnitude as i8;
        Ok(Self {
            mantissa: if value < 0 { -mantissa } else { mantissa },
            exponent: exponent as i8,
        })
    }

    /// Returns the sign of the bucket.
    pub fn sign(&self) -> Sign {
        match self.mantissa.cmp(&0) {
            Ordering::Less => Sign::Negative,
            Ordering::Equal => Sign::Zero,
            Ordering::Greater => Sign::Positive,
        }
    }

    /// Returns `true` if this is the zero bucket.
    pub fn is_zero(&self) -> bool {
        self.mantissa == 0
    }

    /// Returns the magnitude of the mantissa: `10..=99`, or `0` for the zero bucket.
    pub fn mantissa(&self) -> u8 {
        self.mantissa.unsigned_abs()
    }

    /// Returns the signed mantissa, as stored on the wire.
    pub fn raw_mantissa(&self) -> i8 {
        self.mantissa
    }

    /// Returns the decimal exponent.
    pub fn exponent(&self) -> i8 {
        self.exponent
    }

    /// Returns the bucket boundary nearest to zero.
    pub fn edge(&self) -> f64 {
        match self.sign() {
            Sign::Negative => -self.near_side(),
            Sign::Zero => 0.0,
            Sign::Positive => self.near_side(),
        }
    }

    /// Returns the width of the bucket. Always non-negative; zero for the zero bucket.
    pub fn width(&self) -> f64 {
        if self.is_zero() {
            return 0.0;
        }

        // Both sides are within a factor of two of each other, so the difference is exact.
        self.far_side() - self.near_side()
    }

    /// Returns the midpoint of the bucket.
    pub fn midpoint(&self) -> f64 {
        let half_width = self.width() / 2.0;
        match self.sign() {
            Sign::Negative => self.edge() - half_width,
            Sign::Zero => 0.0,
            Sign::Positive => self.edge() + half_width,
        }
    }

    /// Returns the boundary of the bucket closest to negative infinity.
    pub fn left(&self) -> f64 {
        match self.sign() {
            Sign::Negative => -self.far_side(),
            Sign::Zero => 0.0,
            Sign::Positive => self.near_side(),
        }
    }

    /// Returns the boundary of the bucket closest to positive infinity.
    pub fn right(&self) -> f64 {
        match self.sign() {
            Sign::Negative => -self.near_side(),
            Sign::Zero => 0.0,
            Sign::Positive => self.far_side(),
        }
    }

    /// Returns `true` if the given value falls within the range covered by this bucket.
    ///
    /// Positive buckets are closed at their edge and open at the far side, negative buckets mirror that. This agrees
    /// exactly with [`encode`][Self::encode]: every value it maps to a non-zero bucket is contained by that bucket.
    pub fn contains(&self, value: f64) -> bool {
        match self.sign() {
            Sign::Negative => -self.far_side() < value && value <= -self.near_side(),
            Sign::Zero => value == 0.0,
            Sign::Positive => self.near_side() <= value && value < self.far_side(),
        }
    }

    /// Magnitude of the side nearest to zero. Only meaningful for non-zero buckets.
    fn near_side(&self) -> f64 {
        side(self.mantissa(), self.exponent)
    }

    /// Magnitude of the side furthest from zero. Only meaningful for non-zero buckets.
    fn far_side(&self) -> f64 {
        side(self.mantissa() + 1, self.exponent)
    }

    /// Position of this key along the real axis, as a dense integer.
    ///
    /// Strictly monotonic with respect to the bucket order, and zero for the zero bucket.
    fn ordinal(&self) -> i32 {
        if self.is_zero() {
            return 0;
        }

        let position = 1 + (i32::from(self.exponent) - i32::from(i8::MIN)) * 90 + i32::from(self.mantissa()) - 10;
        if self.mantissa < 0 {
            -position
        } else {
            position
        }
    }
}

/// Moves an estimated bucket (mantissa magnitude and exponent) until `magnitude` lies within its sides.
///
/// The magnitude must be within `[side(10, i8::MIN), side(100, i8::MAX))`, which keeps every step in range. Sides are
/// correctly rounded, so `side(100, e) == side(10, e + 1)` and the walk never oscillates between decades.
fn settle(magnitude: f64, mut mantissa: u8, mut exponent: i8) -> (u8, i8) {
    while magnitude < side(mantissa, exponent) {
        if mantissa == 10 {
            mantissa = 99;
            exponent -= 1;
        } else {
            mantissa -= 1;
        }
    }

    while magnitude >= side(mantissa + 1, exponent) {
        if mantissa == 99 {
            mantissa = 10;
            exponent += 1;
        } else {
            mantissa += 1;
        }
    }

    (mantissa, exponent)
}

impl Ord for BucketKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordinal().cmp(&other.ordinal())
    }
}

impl PartialOrd for BucketKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Default for BucketKey {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Canonical bucket label, such as `+23e-001` for the bucket `[2.3, 2.4)`, or `0` for the zero bucket.
///
/// Non-zero labels are always eight characters long: the sign, both mantissa digits, `e`, and the signed three-digit
/// exponent of the edge when read as an integer mantissa.
impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0");
        }

        let sign = if self.mantissa < 0 { '-' } else { '+' };
        let exponent = i16::from(self.exponent) - 1;
        let exponent_sign = if exponent < 0 { '-' } else { '+' };
        write!(
            f,
            "{}{:02}e{}{:03}",
            sign,
            self.mantissa(),
            exponent_sign,
            exponent.unsigned_abs()
        )
    }
}

/// Parses any decimal number (including canonical labels) and maps it to the bucket that contains it.
impl FromStr for BucketKey {
    type Err = HistogramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().parse::<f64>().map_err(|_| HistogramError::InvalidValue {
            value: s.to_string(),
        })?;
        Self::encode(value)
    }
}
