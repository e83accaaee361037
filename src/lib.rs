//! exif-tagkit is a schema-driven Exif tag editing library written in pure
//! Rust. Tags are looked up by name or id through a [`TagRegistry`],
//! rendered for display by a [`ValueFormatter`], and edited in memory on an
//! [`ExifImage`] until it is saved through an [`IfdBackend`].
//!
//! ## Key Features
//!
//! - Schema driven: the tag table (id, name, IFD, type) and the display
//!   rules are plain YAML resources. The defaults are embedded; custom
//!   schemas load with `from_yaml_str` / `from_yaml_path`, and custom tags
//!   can be registered on an [`ExifContext`] before it is shared.
//!
//! - Deterministic lookups: a bare name or id present in several IFDs is
//!   resolved by a fixed precedence (`IFD0, Exif, GPS, Interop`, or `IFD1`
//!   first for thumbnail tags). [`TagRegistry::resolve_ifd`] reports whether
//!   a lookup was ambiguous; [`TagRegistry::get_ifd_for_tag`] logs a warning
//!   and carries on.
//!
//! - Typed values: every write is coerced to and validated against the
//!   tag's [`ExifType`], so a bad value fails at `write_tag` instead of at
//!   save time.
//!
//! - Edit in memory, save explicitly: writes and deletes only mark the
//!   image dirty. [`ExifImage::save`] overwrites the whole tag set through
//!   the backend, optionally keeping a `.bak` copy first.
//!
//! - Batch editing: [`ExifImageCollection`] broadcasts edits to many
//!   images. Bulk deletes and [`ExifImageCollection::save_all`] attempt
//!   every file and report failures together as a [`BatchError`].
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use exif_tagkit::*;
//!
//! fn main() -> Result<()> {
//!     let ctx = ExifContext::load_default()?.into_shared();
//!     let backend = Arc::new(MemoryBackend::new());
//!
//!     let mut main = TagStore::main();
//!     main.set(ctx.registry(), "FNumber", Rational(28, 10), None)?;
//!     main.set(ctx.registry(), "Flash", 16i64, None)?;
//!     backend.put_tags("photo.jpg", &main, &TagStore::thumbnail())?;
//!
//!     let mut image = ExifImage::open("photo.jpg", ctx.clone(), backend.clone())?;
//!     let fnumber = image.read_tag_formatted("FNumber", None, BinaryFormat::Bytes, true)?;
//!     assert_eq!(fnumber, "f/2.8");
//!     let flash = image.read_tag_formatted("Flash", None, BinaryFormat::Bytes, true)?;
//!     assert_eq!(flash, "Flash did not fire, compulsory flash mode");
//!
//!     image.write_tag("Artist", "Jane Doe", None)?;
//!     image.save(false)?;
//!
//!     let image = ExifImage::open("photo.jpg", ctx, backend)?;
//!     assert_eq!(image.read_tag("Artist", None)?.as_str(), Some("Jane Doe"));
//!     Ok(())
//! }
//! ```
//!
//! ## Binary values
//!
//! `UNDEFINED` and `BYTE` values are rendered according to a
//! [`BinaryFormat`]; [`decode_binary`] turns any of the renderings back into
//! the exact bytes.
//!
//! ```rust
//! use exif_tagkit::{decode_binary, BinaryFormat};
//!
//! let bytes = [0x41, 0x00, 0xff];
//! for format in [BinaryFormat::Bytes, BinaryFormat::Hex, BinaryFormat::Base64] {
//!     assert_eq!(decode_binary(&format.encode(&bytes)).unwrap(), bytes);
//! }
//! assert_eq!(BinaryFormat::Hex.encode(&bytes), "hex:4100ff");
//! ```

pub use backend::{backup_path, IfdBackend, JsonBackend, MemoryBackend};
pub use collection::ExifImageCollection;
pub use context::ExifContext;
pub use format::{decode_binary, default_format, BinaryFormat, FormattingRule, ValueFormatter};
pub use image::{
    format_exif_datetime, parse_exif_datetime, ExifImage, GpsInfo, DATETIME_TAGS,
};
pub use registry::{ExifType, Ifd, IfdResolution, Scope, TagKey, TagRegistry, TagSchemaEntry};
pub use store::TagStore;
pub use tag::{ExifTag, TagRecord};
pub use values::{Rational, TagValue};

pub use error::{BatchError, Error, ItemFailure};
pub type Result<T> = std::result::Result<T, Error>;

mod backend;
mod collection;
mod context;
mod error;
mod format;
mod image;
mod registry;
mod store;
mod tag;
mod values;

#[cfg(test)]
mod testkit;
