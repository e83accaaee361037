use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use indexmap::IndexMap;

use crate::{
    BatchError, BinaryFormat, Error, ExifContext, ExifTag, IfdBackend, Ifd, Result, Scope, TagKey,
    TagRecord, TagRegistry, TagStore, TagValue,
};

pub(crate) mod datetime;
mod gps;

pub use datetime::{format_exif_datetime, parse_exif_datetime, DATETIME_TAGS};
pub use gps::GpsInfo;

/// Tags of a single image file.
///
/// Tags are loaded through an [`IfdBackend`] when the image is opened.
/// Writes and deletes only change the in-memory stores and mark the image
/// dirty; nothing touches the file until [`ExifImage::save`].
///
/// ```rust
/// use std::sync::Arc;
/// use exif_tagkit::*;
///
/// let ctx = ExifContext::load_default().unwrap().into_shared();
/// let backend = Arc::new(MemoryBackend::new());
/// backend.put_tags("photo.jpg", &TagStore::main(), &TagStore::thumbnail()).unwrap();
///
/// let mut image = ExifImage::open("photo.jpg", ctx.clone(), backend.clone()).unwrap();
/// image.write_tag("Artist", "Jane Doe", None).unwrap();
/// assert!(image.is_dirty());
/// image.save(false).unwrap();
///
/// let image = ExifImage::open("photo.jpg", ctx, backend).unwrap();
/// assert_eq!(image.read_tag("Artist", None).unwrap().as_str(), Some("Jane Doe"));
/// ```
pub struct ExifImage {
    path: PathBuf,
    ctx: Arc<ExifContext>,
    backend: Arc<dyn IfdBackend>,
    tags: TagStore,
    thumbnail_tags: TagStore,
    dirty: bool,
}

impl std::fmt::Debug for ExifImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExifImage")
            .field("path", &self.path)
            .field("tags", &self.tags.len())
            .field("thumbnail_tags", &self.thumbnail_tags.len())
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl ExifImage {
    /// Load the tags of `path`.
    ///
    /// Fails with [`Error::FileNotFound`] if `path` doesn't exist, or with
    /// [`Error::Decode`] if the backend can't parse the container.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(
        path: impl AsRef<Path>,
        ctx: Arc<ExifContext>,
        backend: Arc<dyn IfdBackend>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (tags, thumbnail_tags) = backend.load_tags(&path)?;
        tracing::debug!(
            tags = tags.len(),
            thumbnail_tags = thumbnail_tags.len(),
            "image opened"
        );
        Ok(Self {
            path,
            ctx,
            backend,
            tags,
            thumbnail_tags,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn context(&self) -> &ExifContext {
        &self.ctx
    }

    /// Main image tags (IFD0, Exif, GPS, Interop).
    pub fn tags(&self) -> &TagStore {
        &self.tags
    }

    /// Thumbnail tags (IFD1 and its sub-IFDs).
    pub fn thumbnail_tags(&self) -> &TagStore {
        &self.thumbnail_tags
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn store(&self, scope: Scope) -> &TagStore {
        match scope {
            Scope::Main => &self.tags,
            Scope::Thumbnail => &self.thumbnail_tags,
        }
    }

    fn store_mut(&mut self, scope: Scope) -> (&TagRegistry, &mut TagStore) {
        let store = match scope {
            Scope::Main => &mut self.tags,
            Scope::Thumbnail => &mut self.thumbnail_tags,
        };
        (self.ctx.registry(), store)
    }

    /// Get a main tag. An explicit `Ifd::Ifd1` reads the thumbnail store.
    pub fn get_tag(&self, key: impl Into<TagKey>, ifd: Option<Ifd>) -> Result<&ExifTag> {
        self.store(target(ifd, Scope::Main))
            .get(self.ctx.registry(), key, ifd)
    }

    /// Get a thumbnail tag. An explicit `Ifd::Ifd0` reads the main store.
    pub fn get_thumbnail_tag(&self, key: impl Into<TagKey>, ifd: Option<Ifd>) -> Result<&ExifTag> {
        self.store(target(ifd, Scope::Thumbnail))
            .get(self.ctx.registry(), key, ifd)
    }

    pub fn read_tag(&self, key: impl Into<TagKey>, ifd: Option<Ifd>) -> Result<&TagValue> {
        self.get_tag(key, ifd).map(|t| t.value())
    }

    pub fn read_tag_formatted(
        &self,
        key: impl Into<TagKey>,
        ifd: Option<Ifd>,
        binary_format: BinaryFormat,
        render_bytes: bool,
    ) -> Result<String> {
        let tag = self.get_tag(key, ifd)?;
        Ok(tag.format(&self.ctx, binary_format, render_bytes))
    }

    /// Read several main tags at once. With `skip_missing`, tags absent from
    /// the image are left out instead of failing the call; unknown names
    /// still fail.
    pub fn read_tags(
        &self,
        keys: &[TagKey],
        ifd: Option<Ifd>,
        skip_missing: bool,
    ) -> Result<IndexMap<TagKey, &TagValue>> {
        let mut values = IndexMap::with_capacity(keys.len());
        for key in keys {
            match self.read_tag(key, ifd) {
                Ok(v) => {
                    values.insert(key.clone(), v);
                }
                Err(e) if skip_missing && e.is_not_found() => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(values)
    }

    /// Set a main tag in memory. An explicit `Ifd::Ifd1` writes to the
    /// thumbnail store.
    pub fn write_tag(
        &mut self,
        key: impl Into<TagKey>,
        value: impl Into<TagValue>,
        ifd: Option<Ifd>,
    ) -> Result<()> {
        let (registry, store) = self.store_mut(target(ifd, Scope::Main));
        store.set(registry, key, value, ifd)?;
        self.dirty = true;
        Ok(())
    }

    /// Set several main tags, stopping at the first failure. Tags written
    /// before the failure stay written.
    pub fn write_tags<K, V>(&mut self, tags: impl IntoIterator<Item = (K, V)>, ifd: Option<Ifd>) -> Result<()>
    where
        K: Into<TagKey>,
        V: Into<TagValue>,
    {
        for (key, value) in tags {
            self.write_tag(key, value, ifd)?;
        }
        Ok(())
    }

    /// Set a thumbnail tag in memory. An explicit `Ifd::Ifd0` writes to the
    /// main store.
    pub fn write_thumbnail_tag(
        &mut self,
        key: impl Into<TagKey>,
        value: impl Into<TagValue>,
        ifd: Option<Ifd>,
    ) -> Result<()> {
        let (registry, store) = self.store_mut(target(ifd, Scope::Thumbnail));
        store.set(registry, key, value, ifd)?;
        self.dirty = true;
        Ok(())
    }

    /// Remove a main tag in memory. A missing tag is an error, see
    /// [`Error::is_not_found`].
    pub fn delete_tag(&mut self, key: impl Into<TagKey>, ifd: Option<Ifd>) -> Result<()> {
        let (registry, store) = self.store_mut(target(ifd, Scope::Main));
        store.delete(registry, key, ifd)?;
        self.dirty = true;
        Ok(())
    }

    /// Remove several main tags. Every key is attempted; failures are
    /// reported together as [`Error::Batch`], keyed by tag.
    pub fn delete_tags<K>(&mut self, keys: impl IntoIterator<Item = K>, ifd: Option<Ifd>) -> Result<()>
    where
        K: Into<TagKey>,
    {
        let mut failures = BatchError::default();
        for key in keys {
            let key = key.into();
            if let Err(e) = self.delete_tag(&key, ifd) {
                failures.push(key.to_string(), e);
            }
        }
        failures.into_result().map_err(Error::from)
    }

    pub fn delete_thumbnail_tag(&mut self, key: impl Into<TagKey>, ifd: Option<Ifd>) -> Result<()> {
        let (registry, store) = self.store_mut(target(ifd, Scope::Thumbnail));
        store.delete(registry, key, ifd)?;
        self.dirty = true;
        Ok(())
    }

    /// Per-tag output of the main then the thumbnail tags, in store order.
    pub fn records(&self, binary_format: BinaryFormat, render_bytes: bool) -> Vec<TagRecord> {
        self.tags
            .iter()
            .chain(self.thumbnail_tags.iter())
            .map(|t| t.record(&self.ctx, binary_format, render_bytes))
            .collect()
    }

    /// Write all tags back through the backend, copying the file to
    /// `<path>.bak` first if `create_backup` is set.
    ///
    /// Saving always writes the full stores, whether dirty or not.
    #[tracing::instrument(skip(self), fields(path = %self.path.display(), dirty = self.dirty))]
    pub fn save(&mut self, create_backup: bool) -> Result<()> {
        if create_backup {
            let dst = self.backend.backup(&self.path)?;
            tracing::debug!(backup = %dst.display(), "backup written");
        }
        self.backend
            .save_tags(&self.path, &self.tags, &self.thumbnail_tags)?;
        self.dirty = false;
        Ok(())
    }

    /// Position from the GPS tags, if the image has both coordinates.
    pub fn get_gps_info(&self) -> Option<GpsInfo> {
        GpsInfo::from_store(&self.tags, self.ctx.registry())
    }
}

/// Store addressed by an explicit `ifd`: IFD0 lives in the main store and
/// IFD1 in the thumbnail store. Sub-IFDs follow `default`.
fn target(ifd: Option<Ifd>, default: Scope) -> Scope {
    match ifd {
        Some(Ifd::Ifd0) => Scope::Main,
        Some(Ifd::Ifd1) => Scope::Thumbnail,
        _ => default,
    }
}
