use serde::{Deserialize, Serialize};

use crate::{BinaryFormat, Error, ExifContext, ExifType, Ifd, Result, TagRegistry, TagValue};

/// One tag of an image: a `(id, value, ifd)` triple.
///
/// The tag's name, [`ExifType`] and formatted value are derived through an
/// [`ExifContext`], they aren't stored. Tags are values: changing a tag
/// means replacing it in its [`TagStore`](crate::TagStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExifTag {
    id: u16,
    value: TagValue,
    ifd: Ifd,
}

/// Serializable per-tag output, e.g. for JSON export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagRecord {
    pub id: u16,
    /// `None` for tags the registry doesn't know.
    pub name: Option<String>,
    pub value: String,
    pub ifd: Ifd,
}

impl ExifTag {
    pub fn new(id: u16, value: impl Into<TagValue>, ifd: Ifd) -> Self {
        Self {
            id,
            value: value.into(),
            ifd,
        }
    }

    /// Build a tag from a caller-supplied value: the value is coerced to the
    /// tag's registered type, then checked against it.
    pub fn checked(
        registry: &TagRegistry,
        id: u16,
        value: impl Into<TagValue>,
        ifd: Ifd,
    ) -> Result<Self> {
        let entry = registry.entry(id, ifd).ok_or_else(|| not_in_registry(registry, id, ifd))?;
        let value = value.into().coerce(entry.exif_type);
        if !value.fits(entry.exif_type) {
            return Err(Error::TagType {
                name: entry.name.clone(),
                id,
                exif_type: entry.exif_type,
                kind: value.kind().to_owned(),
            });
        }
        Ok(Self { id, value, ifd })
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn value(&self) -> &TagValue {
        &self.value
    }

    pub fn into_value(self) -> TagValue {
        self.value
    }

    pub fn ifd(&self) -> Ifd {
        self.ifd
    }

    pub fn name<'a>(&self, registry: &'a TagRegistry) -> Result<&'a str> {
        registry
            .entry(self.id, self.ifd)
            .map(|e| e.name.as_str())
            .ok_or_else(|| not_in_registry(registry, self.id, self.ifd))
    }

    pub fn exif_type(&self, registry: &TagRegistry) -> Result<ExifType> {
        registry
            .entry(self.id, self.ifd)
            .map(|e| e.exif_type)
            .ok_or_else(|| not_in_registry(registry, self.id, self.ifd))
    }

    /// Formatted value, see [`ValueFormatter::format_value`](crate::ValueFormatter::format_value).
    /// Tags unknown to the registry are rendered by value type.
    pub fn format(&self, ctx: &ExifContext, binary_format: BinaryFormat, render_bytes: bool) -> String {
        let name = self.name(ctx.registry()).ok();
        ctx.formatter()
            .format_value(name, &self.value, binary_format, render_bytes)
    }

    pub fn record(&self, ctx: &ExifContext, binary_format: BinaryFormat, render_bytes: bool) -> TagRecord {
        TagRecord {
            id: self.id,
            name: self.name(ctx.registry()).ok().map(|x| x.to_owned()),
            value: self.format(ctx, binary_format, render_bytes),
            ifd: self.ifd,
        }
    }
}

fn not_in_registry(registry: &TagRegistry, id: u16, ifd: Ifd) -> Error {
    if registry.contains(id) {
        Error::TagNotInIfd {
            tag: id.to_string(),
            ifd,
        }
    } else {
        Error::UnknownTagId(id)
    }
}
