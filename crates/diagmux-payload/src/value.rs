use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// Largest precision honored by [`round_to`].
const MAX_PRECISION: u32 = 15;

/// A decoded diagnostic payload.
///
/// Mirrors the self-describing data model of MessagePack. Map keys are kept
/// as strings in their original order; non-string keys are rendered to text.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagValue {
    Null,
    Bool(bool),
    /// Any integer that fits in `i64`.
    Integer(i64),
    /// Positive integers above `i64::MAX`.
    Unsigned(u64),
    Float(f64),
    String(String),
    Sequence(Vec<DiagValue>),
    Mapping(Vec<(String, DiagValue)>),
}

impl DiagValue {
    /// Return a copy with every float rounded to `precision` decimal places.
    pub fn round_floats(&self, precision: u32) -> DiagValue {
        match self {
            DiagValue::Float(value) => DiagValue::Float(round_to(*value, precision)),
            DiagValue::Sequence(items) => DiagValue::Sequence(
                items.iter().map(|item| item.round_floats(precision)).collect(),
            ),
            DiagValue::Mapping(entries) => DiagValue::Mapping(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.round_floats(precision)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Nesting depth; scalars and empty containers count as 1.
    pub fn depth(&self) -> usize {
        match self {
            DiagValue::Sequence(items) => {
                1 + items.iter().map(DiagValue::depth).max().unwrap_or(0)
            }
            DiagValue::Mapping(entries) => {
                1 + entries
                    .iter()
                    .map(|(_, value)| value.depth())
                    .max()
                    .unwrap_or(0)
            }
            _ => 1,
        }
    }

    /// Look up a mapping entry by key (first match).
    pub fn get(&self, key: &str) -> Option<&DiagValue> {
        match self {
            DiagValue::Mapping(entries) => entries
                .iter()
                .find(|(candidate, _)| candidate == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DiagValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DiagValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Numeric value as `f64`, for any integer or float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DiagValue::Integer(value) => Some(*value as f64),
            DiagValue::Unsigned(value) => Some(*value as f64),
            DiagValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DiagValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DiagValue::Null)
    }

    /// Name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            DiagValue::Null => "null",
            DiagValue::Bool(_) => "bool",
            DiagValue::Integer(_) | DiagValue::Unsigned(_) => "integer",
            DiagValue::Float(_) => "float",
            DiagValue::String(_) => "string",
            DiagValue::Sequence(_) => "sequence",
            DiagValue::Mapping(_) => "mapping",
        }
    }

    /// Text used when this value appears as a map key.
    fn into_key(self) -> String {
        match self {
            DiagValue::String(key) => key,
            other => other.to_string(),
        }
    }
}

/// Round `value` to `precision` decimal places, working on the exact decimal
/// expansion of the double.
///
/// Matches JavaScript's `Number(value.toFixed(precision))`: `1.0005` is stored
/// as `1.000499...` and rounds down to `1.0`, while exact midpoints such as
/// `0.125` round away from zero. Non-finite values come back unchanged.
pub fn round_to(value: f64, precision: u32) -> f64 {
    if !value.is_finite() || value == 0.0 {
        return value;
    }
    let places = precision.min(MAX_PRECISION) as usize;
    let magnitude = value.abs();

    // `{:.N}` rounds exact midpoints to even; step past them to round up.
    let target = if is_exact_midpoint(magnitude, places) {
        f64::from_bits(magnitude.to_bits() + 1)
    } else {
        magnitude
    };

    match format!("{target:.places$}").parse::<f64>() {
        Ok(rounded) => rounded.copysign(value),
        Err(_) => value,
    }
}

/// True when the exact decimal expansion of `magnitude` is a 5 at position
/// `places + 1` followed only by zeros.
fn is_exact_midpoint(magnitude: f64, places: usize) -> bool {
    let bits = magnitude.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i64;
    let exponent = if biased == 0 { -1074 } else { biased - 1075 };
    let exact_places = usize::try_from(-exponent).unwrap_or(0);
    if exact_places <= places {
        return false;
    }

    let exact = format!("{magnitude:.exact_places$}");
    let tail = &exact[exact.len() - (exact_places - places)..];
    tail.starts_with('5') && tail[1..].bytes().all(|b| b == b'0')
}

impl fmt::Display for DiagValue {
    /// Compact JSON rendering.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl From<bool> for DiagValue {
    fn from(value: bool) -> Self {
        DiagValue::Bool(value)
    }
}

impl From<i64> for DiagValue {
    fn from(value: i64) -> Self {
        DiagValue::Integer(value)
    }
}

impl From<f64> for DiagValue {
    fn from(value: f64) -> Self {
        DiagValue::Float(value)
    }
}

impl From<&str> for DiagValue {
    fn from(value: &str) -> Self {
        DiagValue::String(value.to_string())
    }
}

impl From<String> for DiagValue {
    fn from(value: String) -> Self {
        DiagValue::String(value)
    }
}

impl From<Vec<DiagValue>> for DiagValue {
    fn from(items: Vec<DiagValue>) -> Self {
        DiagValue::Sequence(items)
    }
}

impl Serialize for DiagValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DiagValue::Null => serializer.serialize_unit(),
            DiagValue::Bool(value) => serializer.serialize_bool(*value),
            DiagValue::Integer(value) => serializer.serialize_i64(*value),
            DiagValue::Unsigned(value) => serializer.serialize_u64(*value),
            DiagValue::Float(value) => serializer.serialize_f64(*value),
            DiagValue::String(value) => serializer.serialize_str(value),
            DiagValue::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            DiagValue::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for DiagValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DiagValueVisitor)
    }
}

struct DiagValueVisitor;

impl<'de> Visitor<'de> for DiagValueVisitor {
    type Value = DiagValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a self-describing diagnostic value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<DiagValue, E> {
        Ok(DiagValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<DiagValue, E> {
        Ok(DiagValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<DiagValue, D::Error> {
        DiagValue::deserialize(deserializer)
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> Result<DiagValue, D::Error> {
        DiagValue::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<DiagValue, E> {
        Ok(DiagValue::Bool(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<DiagValue, E> {
        Ok(DiagValue::Integer(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<DiagValue, E> {
        Ok(match i64::try_from(value) {
            Ok(value) => DiagValue::Integer(value),
            Err(_) => DiagValue::Unsigned(value),
        })
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<DiagValue, E> {
        Ok(DiagValue::Float(value))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<DiagValue, E> {
        Ok(DiagValue::String(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<DiagValue, E> {
        Ok(DiagValue::String(value))
    }

    fn visit_bytes<E: de::Error>(self, value: &[u8]) -> Result<DiagValue, E> {
        Ok(DiagValue::Sequence(
            value
                .iter()
                .map(|byte| DiagValue::Integer(i64::from(*byte)))
                .collect(),
        ))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<DiagValue, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(1024));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(DiagValue::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<DiagValue, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0).min(1024));
        while let Some((key, value)) = map.next_entry::<DiagValue, DiagValue>()? {
            entries.push((key.into_key(), value));
        }
        Ok(DiagValue::Mapping(entries))
    }
}
