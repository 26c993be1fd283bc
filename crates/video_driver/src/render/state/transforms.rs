//! Transformation matrices
//!
//! The model-view matrix is derived from the view and world matrices every
//! time either changes; it is cached only so that re-entering 3D mode can
//! upload it without recomputing.

use crate::foundation::math::Mat4;
use crate::render::backend::MatrixMode;
use crate::render::material::MATERIAL_MAX_TEXTURES;
use crate::render::types::TransformSlot;

/// Matrices set by the client plus derived state
#[derive(Debug, Clone)]
pub struct TransformState {
    matrices: [Mat4; TransformSlot::COUNT],
    model_view: Mat4,
    changed_3d: bool,
    texture_dirty: [bool; MATERIAL_MAX_TEXTURES],
}

impl Default for TransformState {
    fn default() -> Self {
        Self {
            matrices: [Mat4::identity(); TransformSlot::COUNT],
            model_view: Mat4::identity(),
            changed_3d: false,
            texture_dirty: [false; MATERIAL_MAX_TEXTURES],
        }
    }
}

impl TransformState {
    /// Store a matrix
    ///
    /// Returns the backend matrix stack that has to be reloaded, if any.
    /// Texture slots are only marked for upload at draw time.
    pub fn set(&mut self, slot: TransformSlot, matrix: Mat4) -> Option<MatrixMode> {
        self.matrices[slot.index()] = matrix;
        self.changed_3d = true;

        match slot {
            TransformSlot::World | TransformSlot::View => {
                self.model_view = self.get(TransformSlot::View) * self.get(TransformSlot::World);
                Some(MatrixMode::ModelView)
            }
            TransformSlot::Projection => Some(MatrixMode::Projection),
            _ => {
                if let Some(stage) = slot.texture_stage() {
                    self.texture_dirty[stage] = true;
                }
                None
            }
        }
    }

    /// Matrix stored in a slot
    pub fn get(&self, slot: TransformSlot) -> &Mat4 {
        &self.matrices[slot.index()]
    }

    /// View times world
    pub const fn model_view(&self) -> &Mat4 {
        &self.model_view
    }

    /// Matrix for a backend stack
    pub fn for_mode(&self, mode: MatrixMode) -> &Mat4 {
        match mode {
            MatrixMode::ModelView => &self.model_view,
            MatrixMode::Projection => self.get(TransformSlot::Projection),
            MatrixMode::Texture(stage) => TransformSlot::for_texture_stage(usize::from(stage))
                .map_or(&self.model_view, |slot| self.get(slot)),
        }
    }

    /// True when a matrix changed since 2D mode last loaded identities
    pub const fn changed_3d(&self) -> bool {
        self.changed_3d
    }

    /// Clear the 3D change marker
    pub fn clear_changed_3d(&mut self) {
        self.changed_3d = false;
    }

    /// Texture stages whose matrix waits for upload; clears the marks
    pub fn take_dirty_texture_stages(&mut self) -> impl Iterator<Item = usize> {
        let dirty = std::mem::take(&mut self.texture_dirty);
        dirty.into_iter().enumerate().filter_map(|(stage, d)| d.then_some(stage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use approx::assert_relative_eq;

    #[test]
    fn test_model_view_is_view_times_world_in_any_order() {
        let world = Mat4::new_translation(&Vec3::new(1.0, 0.0, 0.0));
        let view = Mat4::new_nonuniform_scaling(&Vec3::new(2.0, 2.0, 2.0));

        let mut first = TransformState::default();
        first.set(TransformSlot::World, world);
        first.set(TransformSlot::View, view);

        let mut second = TransformState::default();
        second.set(TransformSlot::View, view);
        second.set(TransformSlot::World, world);

        assert_relative_eq!(*first.model_view(), view * world);
        assert_relative_eq!(*second.model_view(), view * world);
    }

    #[test]
    fn test_texture_slots_are_deferred() {
        let mut transforms = TransformState::default();

        assert_eq!(transforms.set(TransformSlot::Texture1, Mat4::identity()), None);
        assert_eq!(transforms.take_dirty_texture_stages().collect::<Vec<_>>(), vec![1]);
        assert_eq!(transforms.take_dirty_texture_stages().count(), 0);
    }

    #[test]
    fn test_projection_requests_upload() {
        let mut transforms = TransformState::default();

        assert_eq!(
            transforms.set(TransformSlot::Projection, Mat4::identity()),
            Some(MatrixMode::Projection)
        );
        assert!(transforms.changed_3d());
    }
}
