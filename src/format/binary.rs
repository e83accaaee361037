use std::{fmt::Display, str::FromStr};

use base64::{engine::general_purpose::STANDARD, Engine};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while_m_n},
    character::complete::{char, satisfy},
    combinator::{all_consuming, map, map_res, value},
    multi::many0,
    sequence::{delimited, preceded},
    IResult,
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const HEX_PREFIX: &str = "hex:";
const BASE64_PREFIX: &str = "base64:";

/// How binary (`UNDEFINED`/`BYTE` blob) values are rendered.
///
/// Every format is an exact encoding of the bytes, [`decode_binary`] gets
/// them back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryFormat {
    /// Byte-string literal, e.g. `b"\xff\xfeAB"`.
    #[default]
    Bytes,
    /// `hex:` followed by lowercase hex digits.
    Hex,
    /// `base64:` followed by standard (padded) base64.
    Base64,
}

impl BinaryFormat {
    pub fn encode(self, data: &[u8]) -> String {
        match self {
            BinaryFormat::Bytes => format!("b\"{}\"", data.escape_ascii()),
            BinaryFormat::Hex => format!("{HEX_PREFIX}{}", hex::encode(data)),
            BinaryFormat::Base64 => format!("{BASE64_PREFIX}{}", STANDARD.encode(data)),
        }
    }
}

impl FromStr for BinaryFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bytes" => Ok(BinaryFormat::Bytes),
            "hex" => Ok(BinaryFormat::Hex),
            "base64" => Ok(BinaryFormat::Base64),
            other => Err(Error::InvalidFormatOption(other.to_owned())),
        }
    }
}

impl Display for BinaryFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryFormat::Bytes => "bytes",
            BinaryFormat::Hex => "hex",
            BinaryFormat::Base64 => "base64",
        }
        .fmt(f)
    }
}

/// Decode a string produced by [`BinaryFormat::encode`] back to bytes.
///
/// ```rust
/// use exif_tagkit::{decode_binary, BinaryFormat};
///
/// let data = b"\xff\xfe\"AB\\";
/// for fmt in [BinaryFormat::Bytes, BinaryFormat::Hex, BinaryFormat::Base64] {
///     assert_eq!(decode_binary(&fmt.encode(data)).unwrap(), data);
/// }
/// ```
pub fn decode_binary(s: &str) -> Result<Vec<u8>> {
    if let Some(digits) = s.strip_prefix(HEX_PREFIX) {
        hex::decode(digits).map_err(|e| Error::InvalidBinary(e.to_string()))
    } else if let Some(encoded) = s.strip_prefix(BASE64_PREFIX) {
        STANDARD
            .decode(encoded)
            .map_err(|e| Error::InvalidBinary(e.to_string()))
    } else if s.starts_with("b\"") {
        all_consuming(byte_literal)(s)
            .map(|(_, data)| data)
            .map_err(|e| Error::InvalidBinary(format!("malformed byte literal: {e}")))
    } else {
        Err(Error::InvalidBinary(format!(
            "expected a 'b\"', '{HEX_PREFIX}' or '{BASE64_PREFIX}' prefix: {s}"
        )))
    }
}

fn byte_literal(input: &str) -> IResult<&str, Vec<u8>> {
    delimited(tag("b\""), many0(literal_byte), char('"'))(input)
}

fn literal_byte(input: &str) -> IResult<&str, u8> {
    alt((
        preceded(char('\\'), escaped_byte),
        map(
            satisfy(|c| (' '..='~').contains(&c) && c != '\\' && c != '"'),
            |c| c as u8,
        ),
    ))(input)
}

fn escaped_byte(input: &str) -> IResult<&str, u8> {
    alt((
        value(b'\\', char('\\')),
        value(b'"', char('"')),
        value(b'\'', char('\'')),
        value(b'\n', char('n')),
        value(b'\r', char('r')),
        value(b'\t', char('t')),
        value(0u8, char('0')),
        preceded(
            char('x'),
            map_res(take_while_m_n(2, 2, |c: char| c.is_ascii_hexdigit()), |h: &str| {
                u8::from_str_radix(h, 16)
            }),
        ),
    ))(input)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(b"\xff\xfe\xfd\xfc", BinaryFormat::Bytes, r#"b"\xff\xfe\xfd\xfc""#)]
    #[test_case(b"\xff\xfe\xfd\xfc", BinaryFormat::Hex, "hex:fffefdfc")]
    #[test_case(b"\xff\xfe\xfd\xfc", BinaryFormat::Base64, "base64://79/A==")]
    #[test_case(b"ASCII\0\0\0", BinaryFormat::Bytes, r#"b"ASCII\x00\x00\x00""#)]
    #[test_case(b"", BinaryFormat::Hex, "hex:")]
    fn encode(data: &[u8], fmt: BinaryFormat, expected: &str) {
        assert_eq!(fmt.encode(data), expected);
    }

    #[test]
    fn round_trip_all_bytes() {
        let data: Vec<u8> = (0..=255u8).chain((0..=255u8).rev()).collect();
        for fmt in [BinaryFormat::Bytes, BinaryFormat::Hex, BinaryFormat::Base64] {
            let s = fmt.encode(&data);
            assert_eq!(decode_binary(&s).unwrap(), data, "{fmt}");
        }
    }

    #[test_case(r#"b"a\n\t\"'\\""#, b"a\n\t\"'\\")]
    #[test_case(r#"b"\0\x7F""#, b"\0\x7f")]
    #[test_case(r#"b"""#, b"")]
    fn decode_literal(s: &str, expected: &[u8]) {
        assert_eq!(decode_binary(s).unwrap(), expected);
    }

    #[test_case("hex:zz")]
    #[test_case("hex:abc")]
    #[test_case("base64:***")]
    #[test_case(r#"b"\xZZ""#)]
    #[test_case(r#"b"unterminated"#)]
    #[test_case(r#"b"x"trailing"#)]
    #[test_case("plain")]
    fn decode_invalid(s: &str) {
        assert!(matches!(decode_binary(s), Err(Error::InvalidBinary(_))));
    }

    #[test]
    fn parse_format_option() {
        assert_eq!("hex".parse::<BinaryFormat>().unwrap(), BinaryFormat::Hex);
        assert_eq!(BinaryFormat::default(), BinaryFormat::Bytes);
        assert!(matches!(
            "base32".parse::<BinaryFormat>(),
            Err(Error::InvalidFormatOption(x)) if x == "base32"
        ));
    }
}
