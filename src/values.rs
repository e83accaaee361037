use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::registry::ExifType;

/// Represent a tag value.
///
/// Which variant a tag carries is dictated by the registry's [`ExifType`]
/// for that tag. Values written by callers are coerced toward that type
/// first (see [`TagValue::coerce`]), so e.g. writing `2` to a `RATIONAL` tag
/// stores `Rational(2, 1)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TagValue {
    Bytes(Vec<u8>),
    Float(f64),
    Int(i64),
    Text(String),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    Rational(Rational),
    Rationals(Vec<Rational>),
}

/// A `(numerator, denominator)` pair, Exif's native encoding for most
/// numeric fields. Both `RATIONAL` and `SRATIONAL` values use it; the range
/// of each term is checked against the tag type on write.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rational(pub i64, pub i64);

impl Rational {
    pub fn as_float(&self) -> f64 {
        self.0 as f64 / self.1 as f64
    }

    /// Reduce to lowest terms. A zero denominator is left untouched.
    pub fn reduced(&self) -> Rational {
        let g = gcd(self.0, self.1);
        if self.1 == 0 || g == 0 {
            *self
        } else {
            Rational(self.0 / g, self.1 / g)
        }
    }
}

fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a as i64
}

impl Display for Rational {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.0, self.1)
    }
}

impl From<(i64, i64)> for Rational {
    fn from(value: (i64, i64)) -> Self {
        Self(value.0, value.1)
    }
}

impl From<(u32, u32)> for Rational {
    fn from(value: (u32, u32)) -> Self {
        Self(value.0.into(), value.1.into())
    }
}

impl From<(i32, i32)> for Rational {
    fn from(value: (i32, i32)) -> Self {
        Self(value.0.into(), value.1.into())
    }
}

impl From<Rational> for (i64, i64) {
    fn from(value: Rational) -> Self {
        (value.0, value.1)
    }
}

impl TagValue {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            TagValue::Bytes(_) => "bytes",
            TagValue::Float(_) => "float",
            TagValue::Int(_) => "int",
            TagValue::Text(_) => "string",
            TagValue::Ints(_) => "tuple of int",
            TagValue::Floats(_) => "tuple of float",
            TagValue::Rational(_) => "rational",
            TagValue::Rationals(_) => "tuple of rational",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            TagValue::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            TagValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            TagValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_rational(&self) -> Option<Rational> {
        if let TagValue::Rational(v) = self {
            Some(*v)
        } else {
            None
        }
    }

    pub fn as_rationals(&self) -> Option<&[Rational]> {
        if let TagValue::Rationals(v) = self {
            Some(v)
        } else {
            None
        }
    }

    /// Numeric view of a scalar value (int, float or rational).
    pub(crate) fn as_number(&self) -> Option<f64> {
        match self {
            TagValue::Int(v) => Some(*v as f64),
            TagValue::Float(v) => Some(*v),
            TagValue::Rational(v) => Some(v.as_float()),
            _ => None,
        }
    }

    /// Coerce a caller-supplied value toward `exif_type`. Values that can't
    /// be coerced are returned unchanged; [`Self::fits`] decides whether
    /// they are acceptable.
    pub fn coerce(self, exif_type: ExifType) -> TagValue {
        match (exif_type, self) {
            (ExifType::Ascii, TagValue::Bytes(v)) => match String::from_utf8(v) {
                Ok(s) => TagValue::Text(s),
                Err(e) => TagValue::Bytes(e.into_bytes()),
            },
            (ExifType::Undefined, TagValue::Text(s)) => TagValue::Bytes(s.into_bytes()),
            (ExifType::Rational | ExifType::SRational, TagValue::Int(v)) => {
                TagValue::Rational(Rational(v, 1))
            }
            (ExifType::Rational | ExifType::SRational, TagValue::Ints(v)) => {
                TagValue::Rationals(v.into_iter().map(|x| Rational(x, 1)).collect())
            }
            (ExifType::Float, TagValue::Int(v)) => TagValue::Float(v as f64),
            (ExifType::Float, TagValue::Ints(v)) => {
                TagValue::Floats(v.into_iter().map(|x| x as f64).collect())
            }
            (_, v) => v,
        }
    }

    /// Check whether this value is a valid encoding for `exif_type`.
    pub fn fits(&self, exif_type: ExifType) -> bool {
        fn ints_in(v: &TagValue, range: std::ops::RangeInclusive<i64>) -> bool {
            match v {
                TagValue::Int(x) => range.contains(x),
                TagValue::Ints(xs) => xs.iter().all(|x| range.contains(x)),
                _ => false,
            }
        }
        fn rationals_in(v: &TagValue, range: std::ops::RangeInclusive<i64>) -> bool {
            let ok = |r: &Rational| range.contains(&r.0) && range.contains(&r.1);
            match v {
                TagValue::Rational(r) => ok(r),
                TagValue::Rationals(rs) => rs.iter().all(ok),
                _ => false,
            }
        }

        match exif_type {
            ExifType::Ascii => matches!(self, TagValue::Text(_)),
            ExifType::Byte => matches!(self, TagValue::Bytes(_)) || ints_in(self, 0..=0xff),
            ExifType::Short => ints_in(self, 0..=0xffff),
            ExifType::Long => ints_in(self, 0..=u32::MAX as i64),
            ExifType::Rational => rationals_in(self, 0..=u32::MAX as i64),
            ExifType::SRational => rationals_in(self, i32::MIN as i64..=i32::MAX as i64),
            ExifType::Float => matches!(self, TagValue::Float(_) | TagValue::Floats(_)),
            ExifType::Undefined => true,
        }
    }
}

impl Display for TagValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagValue::Text(v) => f.write_str(v),
            TagValue::Int(v) => Display::fmt(v, f),
            TagValue::Float(v) => f.write_str(&format_float(*v)),
            TagValue::Rational(v) => Display::fmt(v, f),
            TagValue::Bytes(v) => write!(f, "b\"{}\"", v.escape_ascii()),
            TagValue::Ints(v) => f.write_str(&join(v.iter().map(|x| x.to_string()))),
            TagValue::Floats(v) => f.write_str(&join(v.iter().map(|x| format_float(*x)))),
            TagValue::Rationals(v) => f.write_str(&join(v.iter().map(|x| x.to_string()))),
        }
    }
}

pub(crate) fn join(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join(", ")
}

/// Integral values keep one decimal (`24.0`), others use the shortest
/// representation that round-trips (`0.5`).
pub(crate) fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        TagValue::Int(value)
    }
}
impl From<i32> for TagValue {
    fn from(value: i32) -> Self {
        TagValue::Int(value.into())
    }
}
impl From<u32> for TagValue {
    fn from(value: u32) -> Self {
        TagValue::Int(value.into())
    }
}
impl From<u16> for TagValue {
    fn from(value: u16) -> Self {
        TagValue::Int(value.into())
    }
}
impl From<u8> for TagValue {
    fn from(value: u8) -> Self {
        TagValue::Int(value.into())
    }
}

impl From<f64> for TagValue {
    fn from(value: f64) -> Self {
        TagValue::Float(value)
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::Text(value)
    }
}

impl From<&String> for TagValue {
    fn from(value: &String) -> Self {
        TagValue::Text(value.to_owned())
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        value.to_owned().into()
    }
}

impl From<Vec<u8>> for TagValue {
    fn from(value: Vec<u8>) -> Self {
        TagValue::Bytes(value)
    }
}

impl From<&[u8]> for TagValue {
    fn from(value: &[u8]) -> Self {
        TagValue::Bytes(value.to_vec())
    }
}

impl From<Vec<i64>> for TagValue {
    fn from(value: Vec<i64>) -> Self {
        TagValue::Ints(value)
    }
}

impl From<Vec<f64>> for TagValue {
    fn from(value: Vec<f64>) -> Self {
        TagValue::Floats(value)
    }
}

impl From<Rational> for TagValue {
    fn from(value: Rational) -> Self {
        TagValue::Rational(value)
    }
}

impl From<(i64, i64)> for TagValue {
    fn from(value: (i64, i64)) -> Self {
        Self::Rational(value.into())
    }
}

impl From<Vec<Rational>> for TagValue {
    fn from(value: Vec<Rational>) -> Self {
        TagValue::Rationals(value)
    }
}

impl<const N: usize> From<[(i64, i64); N]> for TagValue {
    fn from(value: [(i64, i64); N]) -> Self {
        TagValue::Rationals(value.into_iter().map(Rational::from).collect())
    }
}
