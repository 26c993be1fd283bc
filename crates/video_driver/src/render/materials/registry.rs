//! Material renderer registry
//!
//! A dense, append-only table. Ids are `base + position` and never change
//! while the driver lives. One renderer instance may sit at several
//! positions.

use std::rc::Rc;

use crate::render::error::{DriverError, DriverResult};
use crate::render::material::MaterialTypeId;

use super::MaterialRenderer;

/// Table of material renderers indexed by material type id
pub struct MaterialRendererRegistry {
    base: i32,
    renderers: Vec<Rc<dyn MaterialRenderer>>,
}

impl std::fmt::Debug for MaterialRendererRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterialRendererRegistry")
            .field("base", &self.base)
            .field("renderers", &self.renderers.iter().map(|r| r.name().to_string()).collect::<Vec<_>>())
            .finish()
    }
}

impl MaterialRendererRegistry {
    /// Empty registry handing out ids from `base`
    pub fn new(base: i32) -> Self {
        Self {
            base,
            renderers: Vec::new(),
        }
    }

    /// Id of the first entry
    pub const fn base(&self) -> i32 {
        self.base
    }

    /// Id the next registration will receive
    ///
    /// # Errors
    /// `MaterialTypeIdsExhausted` when the id would not fit an `i32`.
    pub fn next_id(&self) -> DriverResult<MaterialTypeId> {
        i32::try_from(self.renderers.len())
            .ok()
            .and_then(|len| self.base.checked_add(len))
            .map(MaterialTypeId)
            .ok_or(DriverError::MaterialTypeIdsExhausted(self.base))
    }

    /// Append a renderer and return its id
    ///
    /// # Errors
    /// `MaterialTypeIdsExhausted`; the table is unchanged then.
    pub fn register(&mut self, renderer: Rc<dyn MaterialRenderer>) -> DriverResult<MaterialTypeId> {
        let id = self.next_id()?;
        log::debug!("Registered material renderer '{}' as type {}", renderer.name(), id.0);
        self.renderers.push(renderer);
        Ok(id)
    }

    /// Renderer for an id; `None` for ids outside the table
    pub fn get(&self, id: MaterialTypeId) -> Option<Rc<dyn MaterialRenderer>> {
        let index = usize::try_from(id.0.checked_sub(self.base)?).ok()?;
        self.renderers.get(index).cloned()
    }

    /// Number of registered ids
    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }

    /// Drop every renderer
    pub fn clear(&mut self) {
        self.renderers.clear();
    }
}
