use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use crate::{
    Error, ExifContext, ExifImage, IfdBackend, MemoryBackend, Result, TagRegistry, TagStore,
    TagValue,
};

const FIXTURE_SCHEMA: &str = r#"
Image:
  271: {name: Make, type: ASCII}
  272: {name: Model, type: ASCII}
Exif:
  33434: {name: ExposureTime, type: RATIONAL}
  34850: {name: ExposureProgram, type: SHORT}
GPS:
  1: {name: GPSLatitudeRef, type: ASCII}
  2: {name: GPSLatitude, type: RATIONAL}
Interop:
  1: {name: InteropIndex, type: ASCII}
"#;

/// `TestTag` (123) lives in both IFD0 and Exif.
pub const AMBIGUOUS_SCHEMA: &str = r#"
Image:
  123: {name: TestTag, type: ASCII}
Exif:
  123: {name: TestTag, type: ASCII}
  124: {name: OnlyExif, type: SHORT}
"#;

pub fn fixture_registry() -> TagRegistry {
    TagRegistry::from_yaml_str(FIXTURE_SCHEMA).unwrap()
}

pub fn default_context() -> Arc<ExifContext> {
    ExifContext::load_default().unwrap().into_shared()
}

/// Store `tags` as the main tags of `path`, in the given order.
pub fn seed(backend: &MemoryBackend, path: &str, tags: &[(&str, TagValue)]) {
    let registry = TagRegistry::load_default().unwrap();
    let mut main = TagStore::main();
    for (name, value) in tags {
        main.set(&registry, *name, value.clone(), None).unwrap();
    }
    backend.put_tags(path, &main, &TagStore::thumbnail()).unwrap();
}

/// Seed `path` and open it.
pub fn open_memory(
    ctx: &Arc<ExifContext>,
    backend: &Arc<MemoryBackend>,
    path: &str,
    tags: &[(&str, TagValue)],
) -> ExifImage {
    seed(backend, path, tags);
    ExifImage::open(path, ctx.clone(), backend.clone()).unwrap()
}

/// Delegates to a [`MemoryBackend`], but every save of `failing` errors.
pub struct FailingBackend {
    inner: Arc<MemoryBackend>,
    failing: PathBuf,
}

impl FailingBackend {
    pub fn new(inner: Arc<MemoryBackend>, failing: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            failing: failing.into(),
        }
    }
}

impl IfdBackend for FailingBackend {
    fn load_tags(&self, path: &Path) -> Result<(TagStore, TagStore)> {
        self.inner.load_tags(path)
    }

    fn save_tags(&self, path: &Path, main: &TagStore, thumbnail: &TagStore) -> Result<()> {
        if path == self.failing {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "read-only file",
            )));
        }
        self.inner.save_tags(path, main, thumbnail)
    }

    fn backup(&self, path: &Path) -> Result<PathBuf> {
        self.inner.backup(path)
    }
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` under a thread-local subscriber and return what it logged.
pub fn capture_logs(f: impl FnOnce()) -> String {
    let buf = LogBuffer::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let logs = buf.0.lock().unwrap();
    String::from_utf8_lossy(&logs).into_owned()
}
