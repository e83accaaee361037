use chrono::{NaiveDateTime, TimeDelta};
use indexmap::IndexMap;

use super::ExifImage;
use crate::{Error, Result, TagValue};

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// The datetime tags, in reporting order.
pub const DATETIME_TAGS: [&str; 3] = ["DateTime", "DateTimeOriginal", "DateTimeDigitized"];

/// Lookup order for the primary datetime of an image.
const PRIMARY_ORDER: [&str; 3] = ["DateTimeOriginal", "DateTimeDigitized", "DateTime"];

/// Parse an Exif datetime string such as `2025:05:01 14:30:00`. Trailing
/// NULs are ignored.
///
/// ```rust
/// use chrono::NaiveDate;
/// use exif_tagkit::parse_exif_datetime;
///
/// let dt = parse_exif_datetime("2025:05:01 14:30:00").unwrap();
/// assert_eq!(dt, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap().and_hms_opt(14, 30, 0).unwrap());
/// assert!(parse_exif_datetime("2025-05-01 14:30:00").is_err());
/// ```
pub fn parse_exif_datetime(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim_end_matches('\0'), EXIF_DATETIME_FORMAT)
        .map_err(|e| Error::DateTime(format!("invalid Exif datetime '{s}': {e}")))
}

pub fn format_exif_datetime(dt: &NaiveDateTime) -> String {
    dt.format(EXIF_DATETIME_FORMAT).to_string()
}

fn datetime_tag(name: &str) -> Result<&'static str> {
    DATETIME_TAGS
        .into_iter()
        .find(|x| *x == name)
        .ok_or_else(|| {
            Error::DateTime(format!(
                "'{name}' is not a datetime tag; expected one of {}",
                DATETIME_TAGS.join(", ")
            ))
        })
}

fn datetime_tags(tags: Option<&[&str]>) -> Result<Vec<&'static str>> {
    match tags {
        Some(names) => names.iter().map(|x| datetime_tag(x)).collect(),
        None => Ok(DATETIME_TAGS.to_vec()),
    }
}

impl ExifImage {
    /// Value of one datetime tag, or `None` if the image doesn't have it.
    fn datetime_of(&self, name: &'static str) -> Result<Option<NaiveDateTime>> {
        let value = match self.read_tag(name, None) {
            Ok(v) => v,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        match value {
            TagValue::Text(s) => parse_exif_datetime(s).map(Some),
            v => Err(Error::DateTime(format!(
                "{name} holds a {} value, expected a string",
                v.kind()
            ))),
        }
    }

    /// Parsed value of a datetime tag.
    ///
    /// Without `tag`, returns the first present of `DateTimeOriginal`,
    /// `DateTimeDigitized` and `DateTime`. `Ok(None)` if the tag (or every
    /// tag) is absent.
    pub fn get_datetime(&self, tag: Option<&str>) -> Result<Option<NaiveDateTime>> {
        if let Some(name) = tag {
            return self.datetime_of(datetime_tag(name)?);
        }
        for name in PRIMARY_ORDER {
            if let Some(dt) = self.datetime_of(name)? {
                return Ok(Some(dt));
            }
        }
        Ok(None)
    }

    /// All datetime tags, in `DateTime, DateTimeOriginal, DateTimeDigitized`
    /// order.
    pub fn get_all_datetimes(&self) -> Result<IndexMap<&'static str, Option<NaiveDateTime>>> {
        DATETIME_TAGS
            .into_iter()
            .map(|name| Ok((name, self.datetime_of(name)?)))
            .collect()
    }

    /// Set datetime tags (all three by default) to `dt`.
    pub fn set_datetime(&mut self, dt: NaiveDateTime, tags: Option<&[&str]>) -> Result<()> {
        let value = format_exif_datetime(&dt);
        for name in datetime_tags(tags)? {
            self.write_tag(name, value.as_str(), None)?;
        }
        Ok(())
    }

    /// Shift datetime tags (all three by default) by `delta`. Tags the image
    /// doesn't have are skipped. Nothing is written if any value is
    /// malformed.
    pub fn offset_datetime(&mut self, delta: TimeDelta, tags: Option<&[&str]>) -> Result<()> {
        let mut shifted = Vec::new();
        for name in datetime_tags(tags)? {
            if let Some(dt) = self.datetime_of(name)? {
                let dt = dt.checked_add_signed(delta).ok_or_else(|| {
                    Error::DateTime(format!("{name} shifted by {delta} is out of range"))
                })?;
                shifted.push((name, format_exif_datetime(&dt)));
            }
        }
        for (name, value) in shifted {
            self.write_tag(name, value, None)?;
        }
        Ok(())
    }
}
