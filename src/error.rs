use std::{fmt::Display, io, path::PathBuf};
use thiserror::Error;

use crate::registry::{ExifType, Ifd};

type FallbackError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid tag name '{0}'; see `TagRegistry::tag_names` for all valid names")]
    UnknownTagName(String),

    #[error("tag id {0} (0x{0:04x}) is not part of the registry")]
    UnknownTagId(u16),

    /// The tag is known to the registry, but not in the requested IFD.
    #[error("tag '{tag}' does not exist in {ifd}")]
    TagNotInIfd { tag: String, ifd: Ifd },

    /// The tag is not present in an image's tag store.
    #[error("tag '{tag}' not found in {ifd}")]
    TagNotFound { tag: String, ifd: Ifd },

    #[error("a tag with id {id} (0x{id:04x}) is already registered in {ifd}")]
    DuplicateTag { id: u16, ifd: Ifd },

    #[error("invalid value for tag '{name}' ({id}); expected {exif_type}, got {kind}")]
    TagType {
        name: String,
        id: u16,
        exif_type: ExifType,
        kind: String,
    },

    #[error("unsupported binary format '{0}'; expected one of 'bytes', 'hex', 'base64'")]
    InvalidFormatOption(String),

    #[error("invalid binary string; {0}")]
    InvalidBinary(String),

    #[error("datetime error; {0}")]
    DateTime(String),

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("decode {} failed; {source}", .path.display())]
    Decode {
        path: PathBuf,
        source: FallbackError,
    },

    #[error("invalid schema; {0}")]
    Schema(String),

    #[error("file '{0}' not found in collection")]
    FileNotInCollection(String),

    #[error("file '{0}' is already in the collection")]
    DuplicateFile(String),

    #[error(transparent)]
    Batch(#[from] BatchError),
}

impl Error {
    /// True if a known tag is absent, either from the requested IFD or from
    /// an image's tag store.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::TagNotInIfd { .. } | Error::TagNotFound { .. })
    }

    /// True for every lookup kind, including names and ids the registry
    /// doesn't know at all.
    pub fn is_lookup(&self) -> bool {
        self.is_not_found() || matches!(self, Error::UnknownTagName(_) | Error::UnknownTagId(_))
    }

    pub(crate) fn decode(path: impl Into<PathBuf>, e: impl Into<FallbackError>) -> Self {
        Error::Decode {
            path: path.into(),
            source: e.into(),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(value: serde_yaml::Error) -> Self {
        Error::Schema(value.to_string())
    }
}

impl From<chrono::ParseError> for Error {
    fn from(value: chrono::ParseError) -> Self {
        Error::DateTime(value.to_string())
    }
}

/// One failed item of a batch operation.
#[derive(Debug)]
pub struct ItemFailure {
    /// The file key (or tag key) the failure belongs to.
    pub item: String,
    pub error: Error,
}

/// Aggregated failures of an operation that attempts every item before
/// reporting, such as [`ExifImageCollection::save_all`](crate::ExifImageCollection::save_all).
#[derive(Debug, Default)]
pub struct BatchError {
    pub failures: Vec<ItemFailure>,
}

impl BatchError {
    pub(crate) fn push(&mut self, item: impl Into<String>, error: Error) {
        self.failures.push(ItemFailure {
            item: item.into(),
            error,
        });
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|x| x.item.as_str())
    }

    /// Returns `Ok(())` if nothing failed.
    pub(crate) fn into_result(self) -> Result<(), BatchError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Display for BatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} item(s) failed", self.failures.len())?;
        for x in self.failures.iter() {
            write!(f, "; {}: {}", x.item, x.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for BatchError {}
