use std::{path::Path, sync::Arc};

use chrono::{NaiveDateTime, TimeDelta};
use indexmap::{map::Entry, IndexMap};

use crate::{
    BatchError, BinaryFormat, Error, ExifContext, ExifImage, IfdBackend, Ifd, Result, TagKey,
    TagRecord, TagValue,
};

/// A set of images keyed by their path, as given when opened.
///
/// Mutations are broadcast to every image, or to the images named by a
/// `files` filter. Like [`ExifImage`], nothing is written until
/// [`save_all`](ExifImageCollection::save_all).
#[derive(Debug, Default)]
pub struct ExifImageCollection {
    files: IndexMap<String, ExifImage>,
}

impl ExifImageCollection {
    /// Open every path; fails on the first image that can't be loaded.
    pub fn open<P: AsRef<Path>>(
        paths: impl IntoIterator<Item = P>,
        ctx: Arc<ExifContext>,
        backend: Arc<dyn IfdBackend>,
    ) -> Result<Self> {
        let images = paths
            .into_iter()
            .map(|p| ExifImage::open(p, ctx.clone(), backend.clone()))
            .collect::<Result<Vec<_>>>()?;
        Self::from_images(images)
    }

    /// Collect already opened images. Two images with the same path are an
    /// error.
    pub fn from_images(images: impl IntoIterator<Item = ExifImage>) -> Result<Self> {
        let mut files = IndexMap::new();
        for image in images {
            match files.entry(image.path().to_string_lossy().into_owned()) {
                Entry::Occupied(e) => return Err(Error::DuplicateFile(e.key().clone())),
                Entry::Vacant(e) => {
                    e.insert(image);
                }
            }
        }
        Ok(Self { files })
    }

    pub fn n_files(&self) -> usize {
        self.files.len()
    }

    /// Number of tags over all images, thumbnail tags included.
    pub fn n_tags(&self) -> usize {
        self.files
            .values()
            .map(|x| x.tags().len() + x.thumbnail_tags().len())
            .sum()
    }

    pub fn get(&self, file: &str) -> Option<&ExifImage> {
        self.files.get(file)
    }

    pub fn get_mut(&mut self, file: &str) -> Option<&mut ExifImage> {
        self.files.get_mut(file)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExifImage)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(|x| x.as_str())
    }

    /// Images selected by `files`, all images if `None`.
    fn select(&mut self, files: Option<&[&str]>) -> Result<Vec<(&str, &mut ExifImage)>> {
        if let Some(names) = files {
            if let Some(unknown) = names.iter().find(|x| !self.files.contains_key(**x)) {
                return Err(Error::FileNotInCollection(unknown.to_string()));
            }
        }
        Ok(self
            .files
            .iter_mut()
            .filter(|(k, _)| files.map_or(true, |names| names.contains(&k.as_str())))
            .map(|(k, v)| (k.as_str(), v))
            .collect())
    }

    /// Write a tag to the selected images, stopping at the first failure.
    pub fn write_tag(
        &mut self,
        key: impl Into<TagKey>,
        value: impl Into<TagValue>,
        ifd: Option<Ifd>,
        files: Option<&[&str]>,
    ) -> Result<()> {
        let key = key.into();
        let value = value.into();
        for (_, image) in self.select(files)? {
            image.write_tag(&key, value.clone(), ifd)?;
        }
        Ok(())
    }

    pub fn write_tags<K, V>(
        &mut self,
        tags: impl IntoIterator<Item = (K, V)>,
        ifd: Option<Ifd>,
        files: Option<&[&str]>,
    ) -> Result<()>
    where
        K: Into<TagKey>,
        V: Into<TagValue>,
    {
        let tags: Vec<(TagKey, TagValue)> = tags
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        for (_, image) in self.select(files)? {
            image.write_tags(tags.iter().map(|(k, v)| (k, v.clone())), ifd)?;
        }
        Ok(())
    }

    /// Delete a tag from the selected images. Every image is attempted;
    /// failures are reported as [`Error::Batch`] keyed by file.
    pub fn delete_tag(
        &mut self,
        key: impl Into<TagKey>,
        ifd: Option<Ifd>,
        files: Option<&[&str]>,
    ) -> Result<()> {
        let key = key.into();
        let mut failures = BatchError::default();
        for (file, image) in self.select(files)? {
            if let Err(e) = image.delete_tag(&key, ifd) {
                failures.push(file, e);
            }
        }
        failures.into_result().map_err(Error::from)
    }

    /// Delete tags from the selected images. Every tag of every image is
    /// attempted; each failure is reported once per file.
    pub fn delete_tags<K>(
        &mut self,
        keys: impl IntoIterator<Item = K>,
        ifd: Option<Ifd>,
        files: Option<&[&str]>,
    ) -> Result<()>
    where
        K: Into<TagKey>,
    {
        let keys: Vec<TagKey> = keys.into_iter().map(Into::into).collect();
        let mut failures = BatchError::default();
        for (file, image) in self.select(files)? {
            if let Err(e) = image.delete_tags(&keys, ifd) {
                failures.push(file, e);
            }
        }
        failures.into_result().map_err(Error::from)
    }

    pub fn set_datetime(
        &mut self,
        dt: NaiveDateTime,
        tags: Option<&[&str]>,
        files: Option<&[&str]>,
    ) -> Result<()> {
        for (_, image) in self.select(files)? {
            image.set_datetime(dt, tags)?;
        }
        Ok(())
    }

    pub fn offset_datetime(
        &mut self,
        delta: TimeDelta,
        tags: Option<&[&str]>,
        files: Option<&[&str]>,
    ) -> Result<()> {
        for (_, image) in self.select(files)? {
            image.offset_datetime(delta, tags)?;
        }
        Ok(())
    }

    /// See [`ExifImage::get_datetime`].
    pub fn get_datetime(&self, tag: Option<&str>) -> Result<IndexMap<&str, Option<NaiveDateTime>>> {
        self.iter()
            .map(|(file, image)| Ok((file, image.get_datetime(tag)?)))
            .collect()
    }

    pub fn get_all_datetimes(
        &self,
    ) -> Result<IndexMap<&str, IndexMap<&'static str, Option<NaiveDateTime>>>> {
        self.iter()
            .map(|(file, image)| Ok((file, image.get_all_datetimes()?)))
            .collect()
    }

    pub fn records(
        &self,
        binary_format: BinaryFormat,
        render_bytes: bool,
    ) -> IndexMap<&str, Vec<TagRecord>> {
        self.iter()
            .map(|(file, image)| (file, image.records(binary_format, render_bytes)))
            .collect()
    }

    /// Save every dirty image. A failing image doesn't stop the others;
    /// failures are reported together as [`Error::Batch`] keyed by file.
    pub fn save_all(&mut self, create_backup: bool) -> Result<()> {
        let mut failures = BatchError::default();
        for (file, image) in self.files.iter_mut() {
            if !image.is_dirty() {
                continue;
            }
            if let Err(e) = image.save(create_backup) {
                tracing::warn!(file = %file, error = %e, "save failed");
                failures.push(file.as_str(), e);
            }
        }
        failures.into_result().map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        testkit::{default_context, seed, FailingBackend},
        MemoryBackend,
    };

    fn collection(backend: Arc<dyn IfdBackend>) -> ExifImageCollection {
        ExifImageCollection::open(["a.jpg", "b.jpg", "c.jpg"], default_context(), backend).unwrap()
    }

    #[test]
    fn duplicate_paths() {
        let ctx = default_context();
        let backend = Arc::new(MemoryBackend::new());
        seed(&backend, "a.jpg", &[("Make", "Canon".into())]);
        seed(&backend, "b.jpg", &[("Make", "Nikon".into())]);

        let err = ExifImageCollection::open(["a.jpg", "b.jpg", "a.jpg"], ctx.clone(), backend.clone())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateFile(ref f) if f == "a.jpg"));
        assert_eq!(err.to_string(), "file 'a.jpg' is already in the collection");

        let images = ["b.jpg", "a.jpg"]
            .into_iter()
            .map(|p| ExifImage::open(p, ctx.clone(), backend.clone()).unwrap());
        let files = ExifImageCollection::from_images(images).unwrap();
        assert_eq!(files.files().collect::<Vec<_>>(), ["b.jpg", "a.jpg"]);
    }

    fn memory() -> Arc<MemoryBackend> {
        let backend = Arc::new(MemoryBackend::new());
        for f in ["a.jpg", "b.jpg", "c.jpg"] {
            seed(&backend, f, &[("Make", "Canon".into())]);
        }
        backend
    }

    #[test]
    fn open_and_count() {
        let c = collection(memory());
        assert_eq!(c.n_files(), 3);
        assert_eq!(c.n_tags(), 3);
        assert_eq!(c.files().collect::<Vec<_>>(), ["a.jpg", "b.jpg", "c.jpg"]);
        assert!(c.get("b.jpg").is_some());
        assert!(c.get("d.jpg").is_none());

        let err = ExifImageCollection::open(["a.jpg", "d.jpg"], default_context(), memory())
            .unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn broadcast_writes() {
        let mut c = collection(memory());
        c.write_tag("Artist", "Jane", None, None).unwrap();
        c.write_tags([("Model", "R5"), ("Software", "tagkit")], None, Some(&["b.jpg"]))
            .unwrap();
        assert_eq!(c.n_tags(), 8);
        assert!(c.iter().all(|(_, x)| x.is_dirty()));

        assert!(matches!(
            c.write_tag("Artist", "Jane", None, Some(&["z.jpg"])),
            Err(Error::FileNotInCollection(f)) if f == "z.jpg"
        ));
        assert!(matches!(
            c.write_tag("Orientation", "up", None, None),
            Err(Error::TagType { .. })
        ));
    }

    #[test]
    fn delete_reports_per_file() {
        let mut c = collection(memory());
        c.write_tag("Artist", "Jane", None, Some(&["a.jpg", "c.jpg"])).unwrap();

        let err = c.delete_tag("Artist", None, None).unwrap_err();
        let Error::Batch(batch) = err else {
            panic!("expected a batch error");
        };
        assert_eq!(batch.items().collect::<Vec<_>>(), ["b.jpg"]);
        assert!(batch.failures[0].error.is_not_found());
        assert_eq!(c.n_tags(), 3);

        let err = c.delete_tags(["Make", "Model"], None, None).unwrap_err();
        let Error::Batch(batch) = err else {
            panic!("expected a batch error");
        };
        assert_eq!(batch.len(), 3);
        assert_eq!(c.n_tags(), 0);
    }

    #[test]
    fn save_all_partial_failure() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let memory = memory();
        let backend = Arc::new(FailingBackend::new(memory.clone(), "b.jpg"));
        let mut c = collection(backend);
        c.write_tag("Artist", "Jane", None, None).unwrap();

        let err = c.save_all(false).unwrap_err();
        let Error::Batch(batch) = err else {
            panic!("expected a batch error");
        };
        assert_eq!(batch.items().collect::<Vec<_>>(), ["b.jpg"]);

        let saved: Vec<_> = memory.writes().into_iter().map(|(p, _)| p).collect();
        assert_eq!(saved, [Path::new("a.jpg"), Path::new("c.jpg")]);
        assert!(!c.get("a.jpg").unwrap().is_dirty());
        assert!(c.get("b.jpg").unwrap().is_dirty());
        assert!(!c.get("c.jpg").unwrap().is_dirty());

        // clean images are skipped
        c.get_mut("b.jpg").unwrap().delete_tag("Artist", None).unwrap();
        assert!(c.save_all(false).is_err());
        assert_eq!(memory.writes().len(), 2);
    }

    #[test]
    fn datetimes_and_records() {
        let mut c = collection(memory());
        let dt = NaiveDate::from_ymd_opt(2025, 5, 1)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        c.set_datetime(dt, None, Some(&["a.jpg"])).unwrap();
        c.offset_datetime(TimeDelta::days(1), Some(&["DateTimeOriginal"]), None)
            .unwrap();

        let primary = c.get_datetime(None).unwrap();
        assert_eq!(primary["a.jpg"], Some(dt + TimeDelta::days(1)));
        assert_eq!(primary["b.jpg"], None);

        let all = c.get_all_datetimes().unwrap();
        assert_eq!(all["a.jpg"]["DateTime"], Some(dt));

        let records = c.records(BinaryFormat::Bytes, false);
        assert_eq!(records["a.jpg"].len(), 4);
        assert_eq!(records["c.jpg"][0].value, "Canon");
    }
}
