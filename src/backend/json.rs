use std::{io::ErrorKind, path::Path};

use super::{decode, encode, IfdBackend};
use crate::{Error, Result, TagStore};

/// Stores the tags of an image as a JSON document in the file itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBackend;

impl IfdBackend for JsonBackend {
    #[tracing::instrument(skip(self))]
    fn load_tags(&self, path: &Path) -> Result<(TagStore, TagStore)> {
        let data = std::fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;
        let (main, thumbnail) = decode(path, &data)?;
        tracing::debug!(main = main.len(), thumbnail = thumbnail.len(), "tags loaded");
        Ok((main, thumbnail))
    }

    #[tracing::instrument(skip(self, main, thumbnail))]
    fn save_tags(&self, path: &Path, main: &TagStore, thumbnail: &TagStore) -> Result<()> {
        let data = encode(main, thumbnail)?;
        std::fs::write(path, &data)?;
        tracing::debug!(bytes = data.len(), "tags saved");
        Ok(())
    }
}
