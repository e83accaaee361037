use indexmap::IndexMap;

use crate::{Error, ExifTag, Ifd, Result, Scope, TagKey, TagRegistry, TagValue};

/// All tags of one IFD-group of an image: IFD0 (or IFD1 for the thumbnail
/// store) plus the Exif, GPS and Interop sub-IFDs.
///
/// Entries are keyed by `(id, ifd)` and iterate in first-insertion order;
/// replacing a tag keeps its position. Lookups by bare id or name resolve
/// the IFD through the registry (see [`TagRegistry::get_ifd_for_tag`]).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TagStore {
    scope: Scope,
    tags: IndexMap<(u16, Ifd), ExifTag>,
}

impl TagStore {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            tags: IndexMap::new(),
        }
    }

    pub fn main() -> Self {
        Self::new(Scope::Main)
    }

    pub fn thumbnail() -> Self {
        Self::new(Scope::Thumbnail)
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExifTag> {
        self.tags.values()
    }

    pub fn contains(&self, id: u16, ifd: Ifd) -> bool {
        self.tags.contains_key(&(id, ifd))
    }

    /// Insert `tag` as is, without resolution or validation. Returns the
    /// replaced tag, if any; a replaced tag keeps its position.
    pub fn insert(&mut self, tag: ExifTag) -> Option<ExifTag> {
        self.tags.insert((tag.id(), tag.ifd()), tag)
    }

    /// Resolve `key` to the `(id, ifd)` pair it addresses in this store. An
    /// `ifd` outside the store's scope is rejected.
    fn locate(&self, registry: &TagRegistry, key: &TagKey, ifd: Option<Ifd>) -> Result<(u16, Ifd)> {
        if let Some(ifd) = ifd.filter(|x| !self.scope.contains(*x)) {
            return Err(Error::TagNotInIfd {
                tag: key.to_string(),
                ifd,
            });
        }
        let ifd = registry.get_ifd_for_tag(key, ifd, self.scope)?;
        let entry = registry.lookup(key, ifd)?;
        Ok((entry.id, ifd))
    }

    pub fn get(
        &self,
        registry: &TagRegistry,
        key: impl Into<TagKey>,
        ifd: Option<Ifd>,
    ) -> Result<&ExifTag> {
        let key = key.into();
        let loc = self.locate(registry, &key, ifd)?;
        self.tags.get(&loc).ok_or_else(|| Error::TagNotFound {
            tag: key.to_string(),
            ifd: loc.1,
        })
    }

    /// Set a tag, inserting it or replacing the existing value in place.
    ///
    /// The value is coerced and validated against the tag's registered type,
    /// see [`ExifTag::checked`].
    pub fn set(
        &mut self,
        registry: &TagRegistry,
        key: impl Into<TagKey>,
        value: impl Into<TagValue>,
        ifd: Option<Ifd>,
    ) -> Result<()> {
        let key = key.into();
        let (id, ifd) = self.locate(registry, &key, ifd)?;
        let tag = ExifTag::checked(registry, id, value, ifd)?;
        tracing::debug!(tag = %key, id, %ifd, value = %tag.value(), "set tag");
        self.insert(tag);
        Ok(())
    }

    pub fn delete(
        &mut self,
        registry: &TagRegistry,
        key: impl Into<TagKey>,
        ifd: Option<Ifd>,
    ) -> Result<ExifTag> {
        let key = key.into();
        let loc = self.locate(registry, &key, ifd)?;
        let tag = self.tags.shift_remove(&loc).ok_or_else(|| Error::TagNotFound {
            tag: key.to_string(),
            ifd: loc.1,
        })?;
        tracing::debug!(tag = %key, id = loc.0, ifd = %loc.1, "delete tag");
        Ok(tag)
    }

    /// Tags matching both filters, in store order.
    ///
    /// `tags` restricts the result to the given names or ids (any IFD);
    /// `ifd` restricts it to one IFD. Unknown names are an error.
    pub fn filter(
        &self,
        registry: &TagRegistry,
        tags: Option<&[TagKey]>,
        ifd: Option<Ifd>,
    ) -> Result<Vec<&ExifTag>> {
        let ids = match tags {
            Some(keys) => Some(
                keys.iter()
                    .map(|k| match k {
                        TagKey::Id(id) => Ok(*id),
                        TagKey::Name(_) => registry.resolve_tag_id(k),
                    })
                    .collect::<Result<Vec<u16>>>()?,
            ),
            None => None,
        };

        Ok(self
            .iter()
            .filter(|t| ifd.map_or(true, |x| t.ifd() == x))
            .filter(|t| ids.as_ref().map_or(true, |ids| ids.contains(&t.id())))
            .collect())
    }
}

impl<'a> IntoIterator for &'a TagStore {
    type Item = &'a ExifTag;
    type IntoIter = indexmap::map::Values<'a, (u16, Ifd), ExifTag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.values()
    }
}
