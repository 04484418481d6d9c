//! Label-keyed views of a histogram, and serde support built on them.
//!
//! A histogram maps naturally onto a dictionary of canonical bucket labels to counts, such as
//! `{"+10e-001": 2, "+20e-001": 3}`. That is the shape used for JSON output, and any dictionary whose keys parse as
//! numbers can be turned back into a histogram.

use std::{borrow::Cow, fmt};

use indexmap::IndexMap;
use serde::{
    de::{self, MapAccess, Visitor},
    ser::SerializeMap as _,
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::{
    bucket::BucketKey,
    error::HistogramError,
    histogram::Histogram,
};

/// A dictionary key naming a bucket.
///
/// Either a number, or text holding a decimal number (canonical labels like `+23e-001` included). Both map to the
/// bucket containing that number.
#[derive(Clone, Debug, PartialEq)]
pub enum BucketLabel<'a> {
    /// A numeric label.
    Number(f64),

    /// A textual label.
    Text(Cow<'a, str>),
}

impl BucketLabel<'_> {
    /// Resolves this label to the bucket it names.
    ///
    /// # Errors
    ///
    /// If the label is not a finite number, `InvalidValue` is returned. If the number is out of range,
    /// `EncodingOverflow` is returned.
    pub fn to_key(&self) -> Result<BucketKey, HistogramError> {
        match self {
            Self::Number(value) => BucketKey::encode(*value),
            Self::Text(text) => text.parse::<BucketKey>(),
        }
    }
}

impl From<f64> for BucketLabel<'_> {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl<'a> From<&'a str> for BucketLabel<'a> {
    fn from(text: &'a str) -> Self {
        Self::Text(Cow::Borrowed(text))
    }
}

impl From<String> for BucketLabel<'_> {
    fn from(text: String) -> Self {
        Self::Text(Cow::Owned(text))
    }
}

impl Histogram {
    /// Returns the histogram as a map of canonical bucket labels to counts, in ascending bucket order.
    pub fn to_dict(&self) -> IndexMap<String, u64> {
        self.iter().map(|(key, count)| (key.to_string(), count)).collect()
    }

    /// Builds a histogram from `(label, count)` pairs.
    ///
    /// Labels naming the same bucket accumulate.
    ///
    /// # Errors
    ///
    /// If any label cannot be resolved to a bucket, an error is returned. See [`BucketLabel::to_key`].
    pub fn from_dict<'a, I, L>(entries: I) -> Result<Histogram, HistogramError>
    where
        I: IntoIterator<Item = (L, u64)>,
        L: Into<BucketLabel<'a>>,
    {
        let mut histogram = Histogram::new();
        for (label, count) in entries {
            let key = label.into().to_key()?;
            histogram.insert_key(key, count);
        }
        Ok(histogram)
    }
}

impl Serialize for Histogram {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.bucket_count()))?;
        for (key, count) in self {
            map.serialize_entry(&key.to_string(), &count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Histogram {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(HistogramVisitor)
    }
}

struct HistogramVisitor;

impl<'de> Visitor<'de> for HistogramVisitor {
    type Value = Histogram;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of bucket labels to counts")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut histogram = Histogram::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((label, count)) = map.next_entry::<BucketLabel<'static>, u64>()? {
            let key = label.to_key().map_err(de::Error::custom)?;
            histogram.insert_key(key, count);
        }
        Ok(histogram)
    }
}

impl<'de> Deserialize<'de> for BucketLabel<'static> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(BucketLabelVisitor)
    }
}

struct BucketLabelVisitor;

impl Visitor<'_> for BucketLabelVisitor {
    type Value = BucketLabel<'static>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a number or a string holding a number")
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
        Ok(BucketLabel::Number(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        Ok(BucketLabel::Number(value as f64))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        Ok(BucketLabel::Number(value as f64))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        Ok(BucketLabel::Text(Cow::Owned(value.to_string())))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Self::Value, E> {
        Ok(BucketLabel::Text(Cow::Owned(value)))
    }
}
