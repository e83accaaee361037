use std::sync::Arc;

use crate::{ExifType, Ifd, Result, TagRegistry, ValueFormatter};

/// The schema state every image operation needs: one [`TagRegistry`] and
/// one [`ValueFormatter`].
///
/// A context is built once, customized with [`register_custom_tag`], then
/// shared read-only between images with an `Arc`:
///
/// ```rust
/// use exif_tagkit::{ExifContext, ExifType, Ifd};
///
/// let mut ctx = ExifContext::load_default().unwrap();
/// ctx.register_custom_tag("StudioId", 0xc350, ExifType::Ascii, Ifd::Ifd0).unwrap();
/// let ctx = ctx.into_shared();
/// assert_eq!(ctx.registry().resolve_tag_id("StudioId").unwrap(), 0xc350);
/// ```
///
/// [`register_custom_tag`]: ExifContext::register_custom_tag
#[derive(Debug, Clone)]
pub struct ExifContext {
    registry: TagRegistry,
    formatter: ValueFormatter,
}

impl ExifContext {
    pub fn new(registry: TagRegistry, formatter: ValueFormatter) -> Self {
        Self {
            registry,
            formatter,
        }
    }

    /// Context built from the schemas shipped with this crate.
    pub fn load_default() -> Result<Self> {
        Ok(Self::new(
            TagRegistry::load_default()?,
            ValueFormatter::load_default()?,
        ))
    }

    pub fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    pub fn formatter(&self) -> &ValueFormatter {
        &self.formatter
    }

    /// See [`TagRegistry::register_custom_tag`].
    pub fn register_custom_tag(
        &mut self,
        name: impl Into<String>,
        id: u16,
        exif_type: ExifType,
        ifd: Ifd,
    ) -> Result<()> {
        self.registry.register_custom_tag(name, id, exif_type, ifd)
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}
