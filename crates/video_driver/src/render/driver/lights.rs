//! Dynamic lights, ambient light and fog

use crate::foundation::color::ColorF;
use crate::foundation::math::Mat4;
use crate::render::backend::Capability;
use crate::render::lighting::{Fog, Light};
use crate::render::types::TransformSlot;

use super::VideoDriver;

impl VideoDriver {
    /// Add a dynamic light to the next free light slot
    ///
    /// Lights past the backend capacity are ignored. The light is placed with
    /// an identity world matrix, so its position is in world space.
    pub fn add_dynamic_light(&mut self, light: &Light) {
        let slot = self.lights.len();
        if slot >= self.max_dynamic_lights() {
            log::debug!("All {slot} light slots are in use, ignoring light");
            return;
        }
        let Ok(capability_slot) = u8::try_from(slot) else { return };

        self.set_transform(TransformSlot::World, Mat4::identity());
        self.backend.set_light(slot, &light.to_backend());
        self.backend.set_capability(Capability::Light(capability_slot), true);
        self.lights.push(light.clone());
    }

    /// Switch off every dynamic light
    pub fn delete_all_dynamic_lights(&mut self) {
        for slot in 0..self.lights.len() {
            if let Ok(slot) = u8::try_from(slot) {
                self.backend.set_capability(Capability::Light(slot), false);
            }
        }
        self.lights.clear();
    }

    /// Number of light slots of the backend
    pub fn max_dynamic_lights(&self) -> usize {
        self.caps.max_lights as usize
    }

    /// Number of active dynamic lights
    pub fn dynamic_light_count(&self) -> usize {
        self.lights.len()
    }

    /// Active dynamic light by slot
    pub fn dynamic_light(&self, index: usize) -> Option<&Light> {
        self.lights.get(index)
    }

    /// Set the global ambient light
    pub fn set_ambient_light(&mut self, color: ColorF) {
        self.ambient_light = color;
        self.backend.set_ambient_light(color);
    }

    /// Global ambient light
    pub const fn ambient_light(&self) -> ColorF {
        self.ambient_light
    }

    /// Set the fog parameters used by materials with fog enabled
    pub fn set_fog(&mut self, fog: Fog) {
        self.fog = fog;
        self.backend.set_fog(&fog);
    }

    /// Current fog parameters
    pub const fn fog(&self) -> &Fog {
        &self.fog
    }
}
