//! IFD backends load and save the tags of one image container.
//!
//! The core only depends on the [`IfdBackend`] contract. Two backends are
//! provided, both storing tags as a JSON document
//! (`{"main": [..], "thumbnail": [..]}`):
//!
//! - [`JsonBackend`] keeps the document in the file at the image path.
//! - [`MemoryBackend`] keeps documents in memory and logs every write.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{Error, ExifTag, Result, TagStore};

mod json;
mod memory;

pub use json::JsonBackend;
pub use memory::MemoryBackend;

/// Byte-level reader/writer of the tags of an image container.
pub trait IfdBackend: Send + Sync {
    /// Load the main (IFD0-scoped) and thumbnail (IFD1-scoped) tags of
    /// `path`.
    ///
    /// Fails with [`Error::FileNotFound`] if `path` doesn't exist and with
    /// [`Error::Decode`] if the container can't be parsed.
    fn load_tags(&self, path: &Path) -> Result<(TagStore, TagStore)>;

    /// Overwrite all tags of `path`.
    fn save_tags(&self, path: &Path, main: &TagStore, thumbnail: &TagStore) -> Result<()>;

    /// Copy the current content of `path` to [`backup_path`]`(path)` and
    /// return the backup path.
    fn backup(&self, path: &Path) -> Result<PathBuf> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let dst = backup_path(path);
        std::fs::copy(path, &dst)?;
        tracing::debug!(src = %path.display(), dst = %dst.display(), "backup created");
        Ok(dst)
    }
}

/// `photo.jpg` -> `photo.jpg.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(".bak");
    PathBuf::from(s)
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    main: Vec<&'a ExifTag>,
    thumbnail: Vec<&'a ExifTag>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Document {
    #[serde(default)]
    main: Vec<ExifTag>,
    #[serde(default)]
    thumbnail: Vec<ExifTag>,
}

/// Encode both stores in store order. Equal stores always encode to the
/// same bytes.
pub(crate) fn encode(main: &TagStore, thumbnail: &TagStore) -> Result<Vec<u8>> {
    let doc = DocumentRef {
        main: main.iter().collect(),
        thumbnail: thumbnail.iter().collect(),
    };
    let mut data = serde_json::to_vec_pretty(&doc).map_err(std::io::Error::from)?;
    data.push(b'\n');
    Ok(data)
}

pub(crate) fn decode(path: &Path, data: &[u8]) -> Result<(TagStore, TagStore)> {
    let doc: Document = serde_json::from_slice(data).map_err(|e| Error::decode(path, e))?;

    let mut main = TagStore::main();
    for tag in doc.main {
        main.insert(tag);
    }
    let mut thumbnail = TagStore::thumbnail();
    for tag in doc.thumbnail {
        thumbnail.insert(tag);
    }
    Ok((main, thumbnail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Ifd, Rational};

    #[test]
    fn backup_path_appends() {
        assert_eq!(backup_path(Path::new("a/photo.jpg")), Path::new("a/photo.jpg.bak"));
        assert_eq!(backup_path(Path::new("noext")), Path::new("noext.bak"));
    }

    #[test]
    fn document_round_trip() {
        let mut main = TagStore::main();
        main.insert(ExifTag::new(271, "Canon", Ifd::Ifd0));
        main.insert(ExifTag::new(33437, Rational(28, 10), Ifd::Exif));
        main.insert(ExifTag::new(37500, vec![0u8, 0xff], Ifd::Exif));
        let mut thumbnail = TagStore::thumbnail();
        thumbnail.insert(ExifTag::new(259, 6i64, Ifd::Ifd1));

        let data = encode(&main, &thumbnail).unwrap();
        let (m, t) = decode(Path::new("x.jpg"), &data).unwrap();
        assert_eq!(m.iter().collect::<Vec<_>>(), main.iter().collect::<Vec<_>>());
        assert_eq!(t.iter().collect::<Vec<_>>(), thumbnail.iter().collect::<Vec<_>>());
        assert_eq!(t.scope(), crate::Scope::Thumbnail);
        assert_eq!(encode(&m, &t).unwrap(), data);
    }

    #[test]
    fn decode_errors() {
        let err = decode(Path::new("x.jpg"), b"\xff\xd8\xff\xe0").unwrap_err();
        assert!(matches!(err, Error::Decode { ref path, .. } if path == Path::new("x.jpg")));

        let (m, t) = decode(Path::new("x.jpg"), b"{}").unwrap();
        assert!(m.is_empty() && t.is_empty());
    }
}
