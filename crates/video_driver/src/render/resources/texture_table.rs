//! Texture table
//!
//! Owns the metadata of every texture a driver created. Entries are keyed by
//! generational slot map keys, so a handle whose texture was destroyed is
//! detected as stale instead of aliasing a newer texture.

use crate::foundation::collections::{DriverId, SlotMap, TextureKey};
use crate::foundation::math::Dimension2;
use crate::render::backend::BackendTextureId;
use crate::render::error::{DriverError, DriverResult};

/// Opaque reference to a texture owned by one driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle {
    key: TextureKey,
    driver: DriverId,
}

impl TextureHandle {
    /// Driver that created the texture
    pub const fn driver(&self) -> DriverId {
        self.driver
    }
}

/// Metadata of one texture
#[derive(Debug, Clone, PartialEq)]
pub struct TextureEntry {
    /// Name used for lookups; file path or "rt" for render targets
    pub name: String,
    /// Backend object holding the texels
    pub backend_id: BackendTextureId,
    /// Size of the source image
    pub original_size: Dimension2,
    /// Size of the backend storage (may be rounded up to a power of two)
    pub size: Dimension2,
    /// Whether mip levels were uploaded
    pub has_mip_maps: bool,
    /// Whether the texture receives rendering output
    pub is_render_target: bool,
    ref_count: u32,
}

impl TextureEntry {
    /// New entry with a single owner
    pub fn new(name: impl Into<String>, backend_id: BackendTextureId, original_size: Dimension2, size: Dimension2) -> Self {
        Self {
            name: name.into(),
            backend_id,
            original_size,
            size,
            has_mip_maps: false,
            is_render_target: false,
            ref_count: 1,
        }
    }

    /// Number of owners
    pub const fn ref_count(&self) -> u32 {
        self.ref_count
    }
}

/// All textures of one driver
#[derive(Debug)]
pub struct TextureTable {
    driver: DriverId,
    entries: SlotMap<TextureKey, TextureEntry>,
}

impl TextureTable {
    /// Empty table for the given driver
    pub fn new(driver: DriverId) -> Self {
        Self {
            driver,
            entries: SlotMap::with_key(),
        }
    }

    /// Add an entry and return its handle
    pub fn insert(&mut self, entry: TextureEntry) -> TextureHandle {
        TextureHandle {
            key: self.entries.insert(entry),
            driver: self.driver,
        }
    }

    fn check_owner(&self, handle: TextureHandle) -> DriverResult<()> {
        if handle.driver != self.driver {
            log::error!(
                "Texture of driver {} used with driver {}",
                handle.driver.0,
                self.driver.0
            );
            return Err(DriverError::CrossDriverResource);
        }
        Ok(())
    }

    /// Look up a live texture
    ///
    /// # Errors
    /// `CrossDriverResource` for handles of another driver, `InvalidHandle`
    /// for destroyed textures.
    pub fn resolve(&self, handle: TextureHandle) -> DriverResult<&TextureEntry> {
        self.check_owner(handle)?;
        self.entries.get(handle.key).ok_or(DriverError::InvalidHandle)
    }

    /// Find a texture by name
    pub fn find(&self, name: &str) -> Option<TextureHandle> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.name == name)
            .map(|(key, _)| TextureHandle { key, driver: self.driver })
    }

    /// Add an owner
    ///
    /// # Errors
    /// As [`TextureTable::resolve`].
    pub fn grab(&mut self, handle: TextureHandle) -> DriverResult<()> {
        self.check_owner(handle)?;
        let entry = self.entries.get_mut(handle.key).ok_or(DriverError::InvalidHandle)?;
        entry.ref_count += 1;
        Ok(())
    }

    /// Drop an owner; returns the entry when the last owner is gone
    ///
    /// # Errors
    /// As [`TextureTable::resolve`].
    pub fn release(&mut self, handle: TextureHandle) -> DriverResult<Option<TextureEntry>> {
        self.check_owner(handle)?;
        let entry = self.entries.get_mut(handle.key).ok_or(DriverError::InvalidHandle)?;
        entry.ref_count = entry.ref_count.saturating_sub(1);
        if entry.ref_count > 0 {
            return Ok(None);
        }
        Ok(self.entries.remove(handle.key))
    }

    /// Remove an entry regardless of its owners
    ///
    /// Removing a texture that is already gone returns `Ok(None)`.
    ///
    /// # Errors
    /// `CrossDriverResource` for handles of another driver.
    pub fn remove(&mut self, handle: TextureHandle) -> DriverResult<Option<TextureEntry>> {
        self.check_owner(handle)?;
        Ok(self.entries.remove(handle.key))
    }

    /// Flag a texture as render target
    ///
    /// # Errors
    /// As [`TextureTable::resolve`].
    pub fn mark_render_target(&mut self, handle: TextureHandle) -> DriverResult<()> {
        self.check_owner(handle)?;
        let entry = self.entries.get_mut(handle.key).ok_or(DriverError::InvalidHandle)?;
        entry.is_render_target = true;
        Ok(())
    }

    /// Number of live textures
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no texture is alive
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and return every entry
    pub fn drain(&mut self) -> Vec<TextureEntry> {
        self.entries.drain().map(|(_, entry)| entry).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, id: u32) -> TextureEntry {
        TextureEntry::new(name, BackendTextureId(id), Dimension2::new(4, 4), Dimension2::new(4, 4))
    }

    #[test]
    fn test_destroyed_handle_is_invalid() {
        let mut table = TextureTable::new(DriverId::next());
        let handle = table.insert(entry("a", 1));

        assert!(table.remove(handle).unwrap().is_some());
        assert_eq!(table.resolve(handle), Err(DriverError::InvalidHandle));
        // second destroy is a no-op
        assert_eq!(table.remove(handle), Ok(None));
    }

    #[test]
    fn test_stale_handle_does_not_alias_new_texture() {
        let mut table = TextureTable::new(DriverId::next());
        let old = table.insert(entry("old", 1));
        table.remove(old).unwrap();
        let new = table.insert(entry("new", 2));

        assert!(table.resolve(old).is_err());
        assert_eq!(table.resolve(new).unwrap().name, "new");
    }

    #[test]
    fn test_foreign_handle_is_rejected() {
        let mut first = TextureTable::new(DriverId::next());
        let mut second = TextureTable::new(DriverId::next());
        let handle = first.insert(entry("a", 1));
        second.insert(entry("b", 1));

        assert_eq!(second.resolve(handle), Err(DriverError::CrossDriverResource));
        assert_eq!(second.remove(handle), Err(DriverError::CrossDriverResource));
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn test_release_destroys_at_zero() {
        let mut table = TextureTable::new(DriverId::next());
        let handle = table.insert(entry("a", 1));
        table.grab(handle).unwrap();

        assert_eq!(table.release(handle), Ok(None));
        assert!(table.release(handle).unwrap().is_some());
        assert!(table.is_empty());
    }

    #[test]
    fn test_find_by_name() {
        let mut table = TextureTable::new(DriverId::next());
        let handle = table.insert(entry("media/wall.png", 1));

        assert_eq!(table.find("media/wall.png"), Some(handle));
        assert_eq!(table.find("missing.png"), None);
    }
}
