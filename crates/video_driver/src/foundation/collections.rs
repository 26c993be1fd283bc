//! Handle-keyed storage
//!
//! GPU resources live in slot maps. A slot map key carries a generation, so a
//! key that outlived its resource is rejected instead of aliasing whatever
//! reused the slot.

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Key of a texture entry in the driver's texture table
    pub struct TextureKey;

    /// Key of a shader program entry in the driver's program table
    pub struct ProgramKey;
}

/// Identifier of one driver instance
///
/// Every handle remembers the driver that minted it so that a handle from a
/// different driver can be refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DriverId(pub u32);

impl DriverId {
    /// Allocate a process-unique driver id
    pub fn next() -> Self {
        use std::sync::atomic::{AtomicU32, Ordering};
        static NEXT_ID: AtomicU32 = AtomicU32::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_ids_are_unique() {
        let first = DriverId::next();
        let second = DriverId::next();

        assert_ne!(first, second);
    }

    #[test]
    fn test_stale_key_is_rejected() {
        let mut map: SlotMap<TextureKey, u32> = SlotMap::with_key();
        let key = map.insert(7);
        map.remove(key);
        let reused = map.insert(8);

        assert!(map.get(key).is_none());
        assert_eq!(map.get(reused), Some(&8));
    }
}
