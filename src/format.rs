//! Render tag values as display strings.
//!
//! Per-tag display rules are loaded from a YAML table keyed by tag name (the
//! embedded `conf/formatting.yaml` by default). Each rule is a
//! [`FormattingRule`] variant; rendering is a pure function of the rule and
//! the value. Values without a rule, or whose shape doesn't fit their rule,
//! are rendered by value type.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

use crate::{
    values::{format_float, join, Rational},
    Error, Result, TagValue,
};

mod binary;
pub use binary::{decode_binary, BinaryFormat};

const DEFAULT_FORMATTING: &str = include_str!("../conf/formatting.yaml");

/// Standard shutter speed denominators tried, in order, before falling back
/// to `1/round(1/t)`.
const SHUTTER_DENOMINATORS: [i64; 13] = [8000, 4000, 2000, 1000, 500, 250, 125, 60, 30, 15, 8, 4, 2];

/// Display rule of one tag, selected by the `display` key.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "display", rename_all = "snake_case", deny_unknown_fields)]
pub enum FormattingRule {
    /// Plain number, e.g. `24.0 mm` or `+0.7 EV`. Tuples are rendered
    /// element-wise.
    Decimal {
        #[serde(default)]
        unit: Option<String>,
        #[serde(default)]
        show_plus: bool,
        /// Fixed number of decimals.
        #[serde(default)]
        precision: Option<usize>,
    },
    /// Reduced fraction, e.g. `1/250s`.
    Fraction {
        #[serde(default)]
        unit: Option<String>,
    },
    /// `f/2.8`. With `apex`, the value is an APEX aperture value.
    FNumber {
        #[serde(default)]
        apex: bool,
    },
    /// APEX shutter speed value rendered as exposure time, e.g. `1/250s`.
    ShutterSpeed,
    /// Enumerated codes. Keys are the raw value's string form.
    Map {
        #[serde(deserialize_with = "mapping_keys")]
        mapping: IndexMap<String, String>,
    },
    /// `(degrees, minutes, seconds)` as unsigned decimal degrees with six
    /// decimals, e.g. `40.747778`. The hemisphere lives in the `*Ref` tag.
    Coordinates,
    /// `(hours, minutes, seconds)` as `HH:MM:SS`.
    Timestamp {
        #[serde(default)]
        unit: Option<String>,
    },
    /// `(min focal, max focal, min f-number, max f-number)`, e.g.
    /// `24-70 mm f/2.8-5.6`.
    #[serde(rename = "lens-info", alias = "lens_info")]
    LensInfo,
    /// `2.0x`
    Multiplier,
    /// `50%`
    Percent,
}

#[derive(Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
enum MappingKey {
    Int(i64),
    Text(String),
}

/// Mapping keys may be written as YAML integers or strings.
fn mapping_keys<'de, D>(deserializer: D) -> std::result::Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = IndexMap::<MappingKey, String>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(k, v)| match k {
            MappingKey::Int(x) => (x.to_string(), v),
            MappingKey::Text(x) => (x, v),
        })
        .collect())
}

impl FormattingRule {
    /// Render `value`, or `None` if the value doesn't have the shape this
    /// rule expects.
    pub fn render(&self, value: &TagValue) -> Option<String> {
        match self {
            FormattingRule::Decimal {
                unit,
                show_plus,
                precision,
            } => decimal(value, unit.as_deref(), *show_plus, *precision),
            FormattingRule::Fraction { unit } => fraction(value, unit.as_deref()),
            FormattingRule::FNumber { apex } => f_number(number(value)?.value(), *apex),
            FormattingRule::ShutterSpeed => shutter_speed(number(value)?.value()),
            FormattingRule::Map { mapping } => map(value, mapping),
            FormattingRule::Coordinates => Some(format!("{:.6}", dms_to_degrees(value)?)),
            FormattingRule::Timestamp { unit } => timestamp(value, unit.as_deref()),
            FormattingRule::LensInfo => lens_info(value),
            FormattingRule::Multiplier => Some(format!("{}x", number(value)?.render(None))),
            FormattingRule::Percent => {
                Some(format!("{}%", (number(value)?.value() * 100.0).round() as i64))
            }
        }
    }
}

/// Type-driven rendering used when no rule applies.
pub fn default_format(value: &TagValue, binary_format: BinaryFormat, render_bytes: bool) -> String {
    match value {
        TagValue::Bytes(data) if !render_bytes => format!("<bytes: {}>", data.len()),
        TagValue::Bytes(data) => binary_format.encode(data),
        v => v.to_string(),
    }
}

/// Formats tag values according to per-tag display rules.
#[derive(Debug, Clone, Default)]
pub struct ValueFormatter {
    rules: IndexMap<String, FormattingRule>,
}

impl ValueFormatter {
    pub fn new(rules: IndexMap<String, FormattingRule>) -> Self {
        Self { rules }
    }

    /// Load the display rules shipped with this crate.
    pub fn load_default() -> Result<Self> {
        Self::from_yaml_str(DEFAULT_FORMATTING)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let rules: IndexMap<String, FormattingRule> = serde_yaml::from_str(s)?;
        tracing::debug!(rules = rules.len(), "formatting rules loaded");
        Ok(Self { rules })
    }

    pub fn from_yaml_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        Self::from_yaml_str(&std::fs::read_to_string(path)?)
    }

    pub fn rule(&self, name: &str) -> Option<&FormattingRule> {
        self.rules.get(name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Format `value` of the tag called `name` (`None` for tags the registry
    /// doesn't know).
    ///
    /// Binary values are rendered as `<bytes: N>` if `render_bytes` is
    /// false, otherwise as specified by `binary_format`.
    ///
    /// ```rust
    /// use exif_tagkit::{BinaryFormat, Rational, TagValue, ValueFormatter};
    ///
    /// let formatter = ValueFormatter::load_default().unwrap();
    /// let v = TagValue::Rational(Rational(10, 2500));
    /// assert_eq!(formatter.format_value(Some("ExposureTime"), &v, BinaryFormat::Bytes, true), "1/250s");
    ///
    /// let v = TagValue::Bytes(vec![0xff, 0xfe, 0xfd, 0xfc]);
    /// assert_eq!(formatter.format_value(Some("MakerNote"), &v, BinaryFormat::Hex, false), "<bytes: 4>");
    /// assert_eq!(formatter.format_value(Some("MakerNote"), &v, BinaryFormat::Base64, true), "base64://79/A==");
    /// ```
    pub fn format_value(
        &self,
        name: Option<&str>,
        value: &TagValue,
        binary_format: BinaryFormat,
        render_bytes: bool,
    ) -> String {
        name.and_then(|x| self.rules.get(x))
            .and_then(|rule| rule.render(value))
            .unwrap_or_else(|| default_format(value, binary_format, render_bytes))
    }
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn value(self) -> f64 {
        match self {
            Number::Int(x) => x as f64,
            Number::Float(x) => x,
        }
    }

    fn render(self, precision: Option<usize>) -> String {
        match (self, precision) {
            (n, Some(p)) => format!("{:.p$}", n.value()),
            (Number::Int(x), None) => x.to_string(),
            (Number::Float(x), None) => format_float(x),
        }
    }
}

fn rational_number(r: &Rational) -> Option<Number> {
    (r.1 != 0).then(|| Number::Float(r.as_float()))
}

/// Scalar view of a value; single element tuples are unwrapped.
fn number(value: &TagValue) -> Option<Number> {
    match value {
        TagValue::Int(x) => Some(Number::Int(*x)),
        TagValue::Float(x) => Some(Number::Float(*x)),
        TagValue::Rational(r) => rational_number(r),
        TagValue::Ints(v) if v.len() == 1 => Some(Number::Int(v[0])),
        TagValue::Floats(v) if v.len() == 1 => Some(Number::Float(v[0])),
        TagValue::Rationals(v) if v.len() == 1 => rational_number(&v[0]),
        _ => None,
    }
}

fn numbers(value: &TagValue) -> Option<Vec<Number>> {
    match value {
        TagValue::Ints(v) => Some(v.iter().map(|x| Number::Int(*x)).collect()),
        TagValue::Floats(v) => Some(v.iter().map(|x| Number::Float(*x)).collect()),
        TagValue::Rationals(v) => v.iter().map(rational_number).collect(),
        v => number(v).map(|x| vec![x]),
    }
}

/// Values of an `N`-tuple of rationals or floats.
fn tuple<const N: usize>(value: &TagValue) -> Option<[f64; N]> {
    let values: Vec<f64> = match value {
        TagValue::Rationals(v) => v
            .iter()
            .map(|r| rational_number(r).map(Number::value))
            .collect::<Option<_>>()?,
        TagValue::Floats(v) => v.clone(),
        _ => return None,
    };
    values.try_into().ok()
}

/// Convert a `(degrees, minutes, seconds)` triple to decimal degrees.
pub(crate) fn dms_to_degrees(value: &TagValue) -> Option<f64> {
    let [d, m, s] = tuple::<3>(value)?;
    Some(d + m / 60.0 + s / 3600.0)
}

fn decimal(
    value: &TagValue,
    unit: Option<&str>,
    show_plus: bool,
    precision: Option<usize>,
) -> Option<String> {
    let rendered = numbers(value)?.into_iter().map(|n| {
        let s = n.render(precision);
        if show_plus && n.value() >= 0.0 {
            format!("+{s}")
        } else {
            s
        }
    });
    Some(format!("{}{}", join(rendered), unit.unwrap_or_default()))
}

fn fraction(value: &TagValue, unit: Option<&str>) -> Option<String> {
    let s = match value {
        TagValue::Rational(r) => r.reduced().to_string(),
        TagValue::Rationals(v) => join(v.iter().map(|r| r.reduced().to_string())),
        _ => return None,
    };
    Some(format!("{s}{}", unit.unwrap_or_default()))
}

fn f_number(v: f64, apex: bool) -> Option<String> {
    let v = if apex { v.exp2().sqrt() } else { v };
    v.is_finite().then(|| format!("f/{v:.1}"))
}

fn shutter_speed(v: f64) -> Option<String> {
    let seconds = (-v).exp2();
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }

    if seconds >= 1.0 {
        return Some(if seconds.fract() == 0.0 {
            format!("{}s", seconds as i64)
        } else {
            format!("{seconds:.1}s")
        });
    }

    for denom in SHUTTER_DENOMINATORS {
        let num = seconds * denom as f64;
        let rounded = num.round();
        if rounded < 1.0 || (rounded - num).abs() >= 1e-3 {
            continue;
        }
        // sub-second speeds are always unit fractions
        let exact = Rational(rounded as i64, denom).reduced();
        if exact.0 == 1 {
            return Some(format!("{exact}s"));
        }
    }
    Some(format!("1/{}s", (1.0 / seconds).round() as i64))
}

fn map(value: &TagValue, mapping: &IndexMap<String, String>) -> Option<String> {
    let key = match value {
        TagValue::Bytes(v) => match v.as_slice() {
            [x] => x.to_string(),
            _ => return None,
        },
        TagValue::Ints(v) if v.len() == 1 => v[0].to_string(),
        TagValue::Text(s) => s.trim_end_matches('\0').to_owned(),
        v => v.to_string(),
    };
    Some(match mapping.get(&key) {
        Some(label) => label.to_owned(),
        None => format!("Unknown ({key})"),
    })
}

fn timestamp(value: &TagValue, unit: Option<&str>) -> Option<String> {
    let [h, m, s] = tuple::<3>(value)?;
    let seconds = if s.fract() == 0.0 {
        format!("{:02}", s as i64)
    } else if s < 10.0 {
        format!("0{s}")
    } else {
        s.to_string()
    };
    Some(format!(
        "{:02}:{:02}:{seconds}{}",
        h as i64,
        m as i64,
        unit.unwrap_or_default()
    ))
}

fn lens_info(value: &TagValue) -> Option<String> {
    let [min_fl, max_fl, min_f, max_f] = tuple::<4>(value)?;
    let range = |lo: f64, hi: f64, fmt: fn(f64) -> String| {
        if lo == hi {
            fmt(lo)
        } else {
            format!("{}-{}", fmt(lo), fmt(hi))
        }
    };
    Some(format!(
        "{} mm f/{}",
        range(min_fl, max_fl, |x| x.to_string()),
        range(min_f, max_f, |x| format!("{x:.1}"))
    ))
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn format(name: &str, value: TagValue) -> String {
        let formatter = ValueFormatter::load_default().unwrap();
        formatter.format_value(Some(name), &value, BinaryFormat::Bytes, true)
    }

    #[test_case("XResolution", Rational(72, 1).into(), "72.0")]
    #[test_case("FocalLength", Rational(47, 10).into(), "4.7 mm")]
    #[test_case("FocalLengthIn35mmFilm", 50i64.into(), "50 mm")]
    #[test_case("ExposureBiasValue", Rational(-2, 3).into(), "-0.7 EV")]
    #[test_case("ExposureBiasValue", Rational(1, 3).into(), "+0.3 EV")]
    #[test_case("ExposureBiasValue", Rational(0, 1).into(), "+0.0 EV")]
    #[test_case("BrightnessValue", Rational(1234, 100).into(), "12.34")]
    #[test_case("GPSAltitude", Rational(1, 2).into(), "0.5 m")]
    #[test_case("XResolution", vec![Rational(72, 1), Rational(300, 1)].into(), "72.0, 300.0")]
    fn decimal(name: &str, value: TagValue, expected: &str) {
        assert_eq!(format(name, value), expected);
    }

    #[test_case(Rational(10, 2500), "1/250s")]
    #[test_case(Rational(3, 2), "3/2s")]
    #[test_case(Rational(1, 0), "1/0s")]
    fn fraction(value: Rational, expected: &str) {
        assert_eq!(format("ExposureTime", value.into()), expected);
    }

    #[test_case("FNumber", Rational(28, 10).into(), "f/2.8")]
    #[test_case("FNumber", Rational(8, 1).into(), "f/8.0")]
    #[test_case("ApertureValue", Rational(3, 1).into(), "f/2.8")]
    #[test_case("MaxApertureValue", Rational(1, 2).into(), "f/1.2")]
    fn f_number(name: &str, value: TagValue, expected: &str) {
        assert_eq!(format(name, value), expected);
    }

    #[test_case(Rational(8, 1), "1/256s")]
    #[test_case(Rational(0, 1), "1s")]
    #[test_case(Rational(-1, 1), "2s")]
    #[test_case(Rational(-232, 100), "5.0s")]
    #[test_case(Rational(-585, 1000), "1.5s")]
    #[test_case(Rational(1, 1), "1/2s")]
    #[test_case(Rational(3, 1), "1/8s")]
    #[test_case(Rational(73697, 100000), "1/2s")]
    #[test_case(Rational(2, 3), "1/2s")]
    fn shutter_speed(value: Rational, expected: &str) {
        assert_eq!(format("ShutterSpeedValue", value.into()), expected);
    }

    #[test_case("Flash", 0i64.into(), "Flash did not fire")]
    #[test_case("Flash", 25i64.into(), "Flash fired, auto mode")]
    #[test_case("Flash", 99i64.into(), "Unknown (99)")]
    #[test_case("Orientation", 6i64.into(), "Right-top")]
    #[test_case("GPSLatitudeRef", "N".into(), "North")]
    #[test_case("GPSLatitudeRef", "X".into(), "Unknown (X)")]
    #[test_case("GPSAltitudeRef", vec![1u8].into(), "Below sea level")]
    fn map(name: &str, value: TagValue, expected: &str) {
        assert_eq!(format(name, value), expected);
    }

    #[test]
    fn coordinates() {
        let value: TagValue = [(40, 1), (44, 1), (52, 1)].into();
        let s = format("GPSLatitude", value);
        assert_eq!(s, "40.747778");
        assert!((s.parse::<f64>().unwrap() - 40.7478).abs() < 1e-4);

        let value: TagValue = [(73, 1), (59, 1), (1234, 100)].into();
        assert_eq!(format("GPSLongitude", value), "73.986761");
    }

    #[test_case([(14, 1), (30, 1), (5, 1)].into(), "14:30:05 UTC")]
    #[test_case([(9, 1), (5, 1), (75, 10)].into(), "09:05:07.5 UTC")]
    fn timestamp(value: TagValue, expected: &str) {
        assert_eq!(format("GPSTimeStamp", value), expected);
    }

    #[test_case([(24, 1), (70, 1), (28, 10), (56, 10)].into(), "24-70 mm f/2.8-5.6")]
    #[test_case([(50, 1), (50, 1), (18, 10), (18, 10)].into(), "50 mm f/1.8")]
    #[test_case([(18, 1), (55, 1), (35, 10), (0, 0)].into(), "18/1, 55/1, 35/10, 0/0")]
    fn lens_info(value: TagValue, expected: &str) {
        assert_eq!(format("LensSpecification", value), expected);
    }

    #[test]
    fn multiplier_and_percent() {
        assert_eq!(format("DigitalZoomRatio", Rational(2, 1).into()), "2.0x");

        let formatter = ValueFormatter::from_yaml_str("Saturation: {display: percent}").unwrap();
        let s = formatter.format_value(
            Some("Saturation"),
            &Rational(1, 2).into(),
            BinaryFormat::Bytes,
            true,
        );
        assert_eq!(s, "50%");
    }

    #[test]
    fn fallback() {
        assert_eq!(format("Make", "Canon".into()), "Canon");
        assert_eq!(format("Unregistered", Rational(1, 3).into()), "1/3");
        assert_eq!(format("BitsPerSample", vec![8i64, 8, 8].into()), "8, 8, 8");
        // value shape doesn't fit the rule
        assert_eq!(format("FNumber", "wide open".into()), "wide open");
        assert_eq!(format("GPSLatitude", Rational(40, 1).into()), "40/1");

        let formatter = ValueFormatter::load_default().unwrap();
        let v = TagValue::Bytes(b"\xff\xfe\xfd\xfc".to_vec());
        assert_eq!(formatter.format_value(None, &v, BinaryFormat::Hex, false), "<bytes: 4>");
        assert_eq!(formatter.format_value(None, &v, BinaryFormat::Hex, true), "hex:fffefdfc");
        assert_eq!(
            formatter.format_value(None, &v, BinaryFormat::Bytes, true),
            r#"b"\xff\xfe\xfd\xfc""#
        );
    }

    #[test]
    fn load_rules() {
        let formatter = ValueFormatter::load_default().unwrap();
        assert!(matches!(
            formatter.rule("Flash"),
            Some(FormattingRule::Map { mapping }) if mapping.len() > 5
        ));
        assert_eq!(
            formatter.rule("LensSpecification"),
            Some(&FormattingRule::LensInfo)
        );

        let formatter = ValueFormatter::from_yaml_str(
            "
Orientation:
  display: map
  mapping: {1: Top-left, 2: Top-right}
LensInfo:
  display: lens_info
",
        )
        .unwrap();
        assert_eq!(formatter.len(), 2);
        assert_eq!(
            formatter.format_value(Some("Orientation"), &TagValue::Int(2), BinaryFormat::Bytes, true),
            "Top-right"
        );
        assert_eq!(formatter.rule("LensInfo"), Some(&FormattingRule::LensInfo));
    }

    #[test]
    fn invalid_rules() {
        for s in [
            "Foo: {display: sparkles}",
            "Foo: {unit: mm}",
        ] {
            assert!(
                matches!(ValueFormatter::from_yaml_str(s), Err(Error::Schema(_))),
                "{s}"
            );
        }
    }
}
