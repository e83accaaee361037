//! Tag registry: maps tag identity across numeric id, human-readable name and
//! IFD, see <https://exiftool.org/TagNames/EXIF.html>.
//!
//! The registry is built once from a schema (the embedded
//! `conf/registry.yaml` by default) and is read-mostly afterwards. The only
//! mutator is [`TagRegistry::register_custom_tag`], which needs `&mut self`,
//! so custom tags are registered before the registry is shared.

use std::{collections::HashMap, fmt::Display, path::Path, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const DEFAULT_REGISTRY: &str = include_str!("../conf/registry.yaml");

/// Image File Directory, a named group of tags within an image container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ifd {
    /// Main image.
    #[serde(rename = "IFD0", alias = "0th")]
    Ifd0,
    /// Thumbnail image.
    #[serde(rename = "IFD1", alias = "1st")]
    Ifd1,
    #[serde(rename = "Exif")]
    Exif,
    #[serde(rename = "GPS")]
    Gps,
    #[serde(rename = "Interop")]
    Interop,
}

impl Ifd {
    pub const fn name(self) -> &'static str {
        match self {
            Ifd::Ifd0 => "IFD0",
            Ifd::Ifd1 => "IFD1",
            Ifd::Exif => "Exif",
            Ifd::Gps => "GPS",
            Ifd::Interop => "Interop",
        }
    }

    /// The schema section a tag of this IFD is defined in. IFD0 and IFD1
    /// share the `Image` section, which is stored under [`Ifd::Ifd0`].
    pub const fn section(self) -> Ifd {
        match self {
            Ifd::Ifd1 => Ifd::Ifd0,
            x => x,
        }
    }
}

impl Display for Ifd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.name().fmt(f)
    }
}

impl FromStr for Ifd {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "IFD0" | "0th" => Ok(Ifd::Ifd0),
            "IFD1" | "1st" => Ok(Ifd::Ifd1),
            "Exif" => Ok(Ifd::Exif),
            "GPS" => Ok(Ifd::Gps),
            "Interop" => Ok(Ifd::Interop),
            other => Err(Error::Schema(format!("unknown IFD '{other}'"))),
        }
    }
}

/// Exif data type of a tag, as declared by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExifType {
    Ascii,
    Byte,
    Short,
    Long,
    Rational,
    SRational,
    Float,
    Undefined,
}

impl Display for ExifType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExifType::Ascii => "ASCII",
            ExifType::Byte => "BYTE",
            ExifType::Short => "SHORT",
            ExifType::Long => "LONG",
            ExifType::Rational => "RATIONAL",
            ExifType::SRational => "SRATIONAL",
            ExifType::Float => "FLOAT",
            ExifType::Undefined => "UNDEFINED",
        };
        s.fmt(f)
    }
}

/// Which IFD-group a lookup is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// IFD0 plus the Exif, GPS and Interop sub-IFDs.
    #[default]
    Main,
    /// IFD1 plus its own Exif, GPS and Interop sub-IFDs.
    Thumbnail,
}

impl Scope {
    /// Fixed precedence used to break ties between IFDs.
    pub const fn precedence(self) -> [Ifd; 4] {
        match self {
            Scope::Main => [Ifd::Ifd0, Ifd::Exif, Ifd::Gps, Ifd::Interop],
            Scope::Thumbnail => [Ifd::Ifd1, Ifd::Exif, Ifd::Gps, Ifd::Interop],
        }
    }

    /// Whether a tag of `ifd` belongs to this scope. The sub-IFDs belong
    /// to both.
    pub const fn contains(self, ifd: Ifd) -> bool {
        !matches!(
            (self, ifd),
            (Scope::Main, Ifd::Ifd1) | (Scope::Thumbnail, Ifd::Ifd0)
        )
    }

    /// Place a schema section into this scope.
    const fn place(self, section: Ifd) -> Ifd {
        match (self, section) {
            (Scope::Thumbnail, Ifd::Ifd0) => Ifd::Ifd1,
            (_, x) => x,
        }
    }
}

/// A tag can be addressed by numeric id or by name. A numeric string such as
/// `"271"` is a name, not an id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagKey {
    Id(u16),
    Name(String),
}

impl Display for TagKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagKey::Id(id) => id.fmt(f),
            TagKey::Name(name) => name.fmt(f),
        }
    }
}

impl From<u16> for TagKey {
    fn from(value: u16) -> Self {
        TagKey::Id(value)
    }
}

impl From<&str> for TagKey {
    fn from(value: &str) -> Self {
        TagKey::Name(value.to_owned())
    }
}

impl From<String> for TagKey {
    fn from(value: String) -> Self {
        TagKey::Name(value)
    }
}

impl From<&String> for TagKey {
    fn from(value: &String) -> Self {
        TagKey::Name(value.to_owned())
    }
}

impl From<&TagKey> for TagKey {
    fn from(value: &TagKey) -> Self {
        value.clone()
    }
}

/// One registry row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagSchemaEntry {
    pub id: u16,
    pub name: String,
    /// Schema section, IFD1 tags are stored under [`Ifd::Ifd0`].
    pub ifd: Ifd,
    pub exif_type: ExifType,
}

/// Outcome of resolving the IFD of a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IfdResolution {
    /// Exactly one IFD matched (or the requested IFD contains the tag).
    Found(Ifd),
    /// Several IFDs matched and none was requested; `resolved` is the first
    /// of `candidates` in precedence order.
    Ambiguous { candidates: Vec<Ifd>, resolved: Ifd },
    /// The requested IFD doesn't contain the tag.
    NotFound,
}

impl IfdResolution {
    pub fn ifd(&self) -> Option<Ifd> {
        match self {
            IfdResolution::Found(ifd) => Some(*ifd),
            IfdResolution::Ambiguous { resolved, .. } => Some(*resolved),
            IfdResolution::NotFound => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    name: String,
    #[serde(rename = "type")]
    exif_type: ExifType,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryConf {
    #[serde(rename = "Image", default)]
    image: IndexMap<u16, RawEntry>,
    #[serde(rename = "Exif", default)]
    exif: IndexMap<u16, RawEntry>,
    #[serde(rename = "GPS", default)]
    gps: IndexMap<u16, RawEntry>,
    #[serde(rename = "Interop", default)]
    interop: IndexMap<u16, RawEntry>,
}

/// Registry of all Exif tags known to a context.
#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    entries: Vec<TagSchemaEntry>,
    by_key: HashMap<(Ifd, u16), usize>,
    by_id: HashMap<u16, Vec<usize>>,
    by_name: IndexMap<String, Vec<usize>>,
}

impl TagRegistry {
    /// Load the registry shipped with this crate.
    pub fn load_default() -> Result<Self> {
        Self::from_yaml_str(DEFAULT_REGISTRY)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let conf: RegistryConf = serde_yaml::from_str(s)?;
        let mut registry = Self::default();
        let sections = [
            (Ifd::Ifd0, conf.image),
            (Ifd::Exif, conf.exif),
            (Ifd::Gps, conf.gps),
            (Ifd::Interop, conf.interop),
        ];
        for (ifd, tags) in sections {
            for (id, raw) in tags {
                registry.insert(TagSchemaEntry {
                    id,
                    name: raw.name,
                    ifd,
                    exif_type: raw.exif_type,
                })?;
            }
        }
        tracing::debug!(tags = registry.len(), "tag registry loaded");
        Ok(registry)
    }

    pub fn from_yaml_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        Self::from_yaml_str(&std::fs::read_to_string(path)?)
    }

    fn insert(&mut self, entry: TagSchemaEntry) -> Result<()> {
        let key = (entry.ifd.section(), entry.id);
        if self.by_key.contains_key(&key) {
            return Err(Error::DuplicateTag {
                id: entry.id,
                ifd: entry.ifd,
            });
        }

        let idx = self.entries.len();
        self.by_key.insert(key, idx);
        self.by_id.entry(entry.id).or_default().push(idx);
        self.by_name.entry(entry.name.clone()).or_default().push(idx);
        self.entries.push(TagSchemaEntry {
            ifd: entry.ifd.section(),
            ..entry
        });
        Ok(())
    }

    /// Register a tag that isn't part of the schema.
    ///
    /// Fails with [`Error::DuplicateTag`] if `(id, ifd)` is already taken. A
    /// name may be reused as long as the `(id, ifd)` pair is new; ambiguous
    /// lookups are then resolved by the usual IFD precedence.
    pub fn register_custom_tag(
        &mut self,
        name: impl Into<String>,
        id: u16,
        exif_type: ExifType,
        ifd: Ifd,
    ) -> Result<()> {
        let name = name.into();
        tracing::debug!(%name, id, %ifd, %exif_type, "register custom tag");
        self.insert(TagSchemaEntry {
            id,
            name,
            ifd,
            exif_type,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All tag names, in schema (insertion) order, without duplicates.
    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(|x| x.as_str())
    }

    pub fn list_tag_names(&self) -> Vec<&str> {
        self.tag_names().collect()
    }

    pub fn contains(&self, key: impl Into<TagKey>) -> bool {
        self.candidates(&key.into()).is_ok()
    }

    /// Get the registry row of `id` in `ifd`.
    pub fn entry(&self, id: u16, ifd: Ifd) -> Option<&TagSchemaEntry> {
        self.by_key
            .get(&(ifd.section(), id))
            .map(|idx| &self.entries[*idx])
    }

    /// Get the registry row of `key` in `ifd`, failing with
    /// [`Error::TagNotInIfd`] if the tag is known but not defined there.
    pub fn lookup(&self, key: impl Into<TagKey>, ifd: Ifd) -> Result<&TagSchemaEntry> {
        let key = key.into();
        self.candidates(&key)?
            .into_iter()
            .find(|e| e.ifd == ifd.section())
            .ok_or_else(|| Error::TagNotInIfd {
                tag: key.to_string(),
                ifd,
            })
    }

    /// All rows matching `key`, ordered by IFD precedence. Rows in the same
    /// section keep their registration order.
    fn candidates(&self, key: &TagKey) -> Result<Vec<&TagSchemaEntry>> {
        let indices = match key {
            TagKey::Id(id) => self.by_id.get(id).ok_or(Error::UnknownTagId(*id))?,
            TagKey::Name(name) => self
                .by_name
                .get(name)
                .ok_or_else(|| Error::UnknownTagName(name.to_owned()))?,
        };
        let precedence = Scope::Main.precedence();
        let rank = |e: &TagSchemaEntry| precedence.iter().position(|x| *x == e.ifd);

        let mut entries: Vec<&TagSchemaEntry> = indices.iter().map(|i| &self.entries[*i]).collect();
        entries.sort_by_key(|e| rank(*e));
        Ok(entries)
    }

    fn first(&self, key: &TagKey) -> Result<&TagSchemaEntry> {
        let entries = self.candidates(key)?;
        // `candidates` never returns an empty list
        entries.first().copied().ok_or_else(|| match key {
            TagKey::Id(id) => Error::UnknownTagId(*id),
            TagKey::Name(name) => Error::UnknownTagName(name.to_owned()),
        })
    }

    /// Get the tag id for a name; an id is validated and returned unchanged.
    ///
    /// ```rust
    /// use exif_tagkit::TagRegistry;
    ///
    /// let registry = TagRegistry::load_default().unwrap();
    /// assert_eq!(registry.resolve_tag_id("Make").unwrap(), 271);
    /// assert!(registry.resolve_tag_id("DoesNotExist").is_err());
    /// ```
    pub fn resolve_tag_id(&self, key: impl Into<TagKey>) -> Result<u16> {
        Ok(self.first(&key.into())?.id)
    }

    /// Get the tag name for an id; a name is validated and returned
    /// unchanged.
    ///
    /// Without `ifd`, an id defined in several IFDs yields the name from the
    /// first IFD in precedence order (`IFD0, Exif, GPS, Interop`).
    pub fn resolve_tag_name(&self, key: impl Into<TagKey>, ifd: Option<Ifd>) -> Result<&str> {
        let key = key.into();
        let entry = match ifd {
            Some(ifd) => self.lookup(&key, ifd)?,
            None => self.first(&key)?,
        };
        Ok(&entry.name)
    }

    pub fn get_tag_type(&self, key: impl Into<TagKey>) -> Result<ExifType> {
        Ok(self.first(&key.into())?.exif_type)
    }

    /// Resolve which IFD `key` lives in, without side effects.
    ///
    /// - If `ifd` is given, the result is `Found(ifd)` or `NotFound`.
    /// - Otherwise the tag's IFDs within `scope` are collected in precedence
    ///   order; one match is `Found`, several are `Ambiguous`.
    pub fn resolve_ifd(
        &self,
        key: impl Into<TagKey>,
        scope: Scope,
        ifd: Option<Ifd>,
    ) -> Result<IfdResolution> {
        let entries = self.candidates(&key.into())?;

        if let Some(ifd) = ifd {
            return Ok(if entries.iter().any(|e| e.ifd == ifd.section()) {
                IfdResolution::Found(ifd)
            } else {
                IfdResolution::NotFound
            });
        }

        let mut candidates: Vec<Ifd> = Vec::with_capacity(entries.len());
        for e in entries {
            let ifd = scope.place(e.ifd);
            if !candidates.contains(&ifd) {
                candidates.push(ifd);
            }
        }

        Ok(match candidates.as_slice() {
            [] => IfdResolution::NotFound,
            [ifd] => IfdResolution::Found(*ifd),
            [first, ..] => IfdResolution::Ambiguous {
                resolved: *first,
                candidates,
            },
        })
    }

    /// Get the IFD for a tag.
    ///
    /// If the tag exists in several IFDs and `ifd` isn't given, the first one
    /// in precedence order is returned and a warning is logged. If `ifd` is
    /// given but doesn't contain the tag, [`Error::TagNotInIfd`] is returned.
    ///
    /// ```rust
    /// use exif_tagkit::{Ifd, Scope, TagRegistry};
    ///
    /// let registry = TagRegistry::load_default().unwrap();
    /// assert_eq!(registry.get_ifd_for_tag("Make", None, Scope::Main).unwrap(), Ifd::Ifd0);
    /// assert_eq!(registry.get_ifd_for_tag("Make", None, Scope::Thumbnail).unwrap(), Ifd::Ifd1);
    /// ```
    pub fn get_ifd_for_tag(
        &self,
        key: impl Into<TagKey>,
        ifd: Option<Ifd>,
        scope: Scope,
    ) -> Result<Ifd> {
        let key = key.into();
        match self.resolve_ifd(&key, scope, ifd)? {
            IfdResolution::Found(ifd) => Ok(ifd),
            IfdResolution::Ambiguous {
                candidates,
                resolved,
            } => {
                tracing::warn!(
                    tag = %key,
                    ?candidates,
                    %resolved,
                    "tag found in multiple IFDs; resolved by precedence"
                );
                Ok(resolved)
            }
            IfdResolution::NotFound => Err(Error::TagNotInIfd {
                tag: key.to_string(),
                // `NotFound` is only produced when an IFD was requested
                ifd: ifd.unwrap_or(Ifd::Ifd0),
            }),
        }
    }
}
