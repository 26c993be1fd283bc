//! Dynamic lights and fog
//!
//! Lights are value types. The backend only supports a small fixed number of
//! simultaneously active lights; the driver fills slots 0..N in the order
//! lights are added and ignores additions past the capacity.

use serde::{Deserialize, Serialize};

use crate::foundation::color::{Color, ColorF};
use crate::foundation::math::Vec3;

/// Kind of dynamic light
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LightType {
    /// Omnidirectional light at a position
    #[default]
    Point,
    /// Cone light; treated as a point light by the fixed-function path
    Spot,
    /// Infinitely distant light; `position` holds the direction it shines to
    Directional,
}

/// A dynamic light
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    /// Kind of light
    pub light_type: LightType,
    /// Position, or direction for directional lights
    pub position: Vec3,
    /// Ambient contribution
    pub ambient_color: ColorF,
    /// Diffuse contribution
    pub diffuse_color: ColorF,
    /// Specular contribution
    pub specular_color: ColorF,
    /// Distance at which the light's influence falls off
    pub radius: f32,
    /// Whether shadow volumes should be generated for this light
    pub cast_shadows: bool,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            light_type: LightType::Point,
            position: Vec3::zeros(),
            ambient_color: ColorF::new(0.0, 0.0, 0.0, 1.0),
            diffuse_color: ColorF::new(1.0, 1.0, 1.0, 1.0),
            specular_color: ColorF::new(1.0, 1.0, 1.0, 1.0),
            radius: 100.0,
            cast_shadows: true,
        }
    }
}

impl Light {
    /// Point light at `position`
    pub fn point(position: Vec3, diffuse_color: ColorF, radius: f32) -> Self {
        Self {
            position,
            diffuse_color,
            radius,
            ..Self::default()
        }
    }

    /// Directional light shining along `direction`
    pub fn directional(direction: Vec3, diffuse_color: ColorF) -> Self {
        Self {
            light_type: LightType::Directional,
            position: direction,
            diffuse_color,
            ..Self::default()
        }
    }

    /// Backend light parameters for this light
    ///
    /// Directional lights are sent as a position at infinity pointing back
    /// towards the light, with a full 180 degree cutoff. Attenuation is linear
    /// in `1 / radius`.
    pub fn to_backend(&self) -> BackendLight {
        let (position, spot) = match self.light_type {
            LightType::Directional => {
                let dir = [-self.position.x, -self.position.y, -self.position.z];
                (
                    [dir[0], dir[1], dir[2], 0.0],
                    Some(SpotParameters {
                        direction: dir,
                        cutoff: 180.0,
                        exponent: 0.0,
                    }),
                )
            }
            LightType::Point | LightType::Spot => {
                ([self.position.x, self.position.y, self.position.z, 1.0], None)
            }
        };

        let linear = if self.radius > 0.0 { 1.0 / self.radius } else { 0.0 };

        BackendLight {
            position,
            spot,
            diffuse: self.diffuse_color.to_array(),
            specular: self.specular_color.to_array(),
            ambient: self.ambient_color.to_array(),
            attenuation: [0.0, linear, 0.0],
        }
    }
}

/// Spot parameters of a backend light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotParameters {
    /// Spot direction
    pub direction: [f32; 3],
    /// Cutoff angle in degrees
    pub cutoff: f32,
    /// Spot exponent
    pub exponent: f32,
}

/// Light parameters in the form a fixed-function backend consumes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackendLight {
    /// Homogeneous position; w = 0 marks a directional light
    pub position: [f32; 4],
    /// Spot parameters, when the light has any
    pub spot: Option<SpotParameters>,
    /// Diffuse RGBA
    pub diffuse: [f32; 4],
    /// Specular RGBA
    pub specular: [f32; 4],
    /// Ambient RGBA
    pub ambient: [f32; 4],
    /// Constant, linear and quadratic attenuation
    pub attenuation: [f32; 3],
}

/// Fog falloff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FogType {
    /// Linear between `start` and `end`
    Linear,
    /// Exponential with `density`
    Exponential,
}

/// Fog settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fog {
    /// Fog colour
    pub color: Color,
    /// Falloff function
    pub fog_type: FogType,
    /// Distance where linear fog starts
    pub start: f32,
    /// Distance where linear fog is complete
    pub end: f32,
    /// Density of exponential fog
    pub density: f32,
    /// Per-pixel instead of per-vertex fog
    pub pixel_fog: bool,
    /// Range based instead of depth based fog
    pub range_fog: bool,
}

impl Default for Fog {
    fn default() -> Self {
        Self {
            color: Color::new(0, 255, 255, 255),
            fog_type: FogType::Linear,
            start: 50.0,
            end: 100.0,
            density: 0.01,
            pixel_fog: false,
            range_fog: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_directional_light_is_negated_at_infinity() {
        let light = Light::directional(Vec3::new(0.0, -1.0, 0.5), ColorF::new(1.0, 1.0, 1.0, 1.0));
        let backend = light.to_backend();

        assert_eq!(backend.position, [-0.0, 1.0, -0.5, 0.0]);
        let spot = backend.spot.unwrap();
        assert_relative_eq!(spot.cutoff, 180.0);
        assert_eq!(spot.direction, [-0.0, 1.0, -0.5]);
    }

    #[test]
    fn test_point_light_attenuation() {
        let light = Light::point(Vec3::new(1.0, 2.0, 3.0), ColorF::new(1.0, 0.5, 0.5, 1.0), 50.0);
        let backend = light.to_backend();

        assert_eq!(backend.position, [1.0, 2.0, 3.0, 1.0]);
        assert!(backend.spot.is_none());
        assert_relative_eq!(backend.attenuation[1], 0.02);
    }

    #[test]
    fn test_fog_defaults() {
        let fog = Fog::default();

        assert_eq!(fog.fog_type, FogType::Linear);
        assert_relative_eq!(fog.start, 50.0);
        assert_relative_eq!(fog.end, 100.0);
    }
}
