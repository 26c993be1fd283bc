//! # Rendering Core
//!
//! The hardware-abstracted video driver and everything it is built from.
//!
//! ## Architecture
//!
//! - **Driver**: [`VideoDriver`], the facade scene graphs and GUIs draw through
//! - **State Cache**: mirror of the backend state, emits only real changes
//! - **Resources**: handle tables for textures and shader programs
//! - **Material Renderers**: pluggable strategies behind material type ids
//! - **Backend**: the [`backend::GraphicsBackend`] seam plus a headless implementation
//!
//! Collaborators only ever talk to [`VideoDriver`]. The cache, the tables and
//! the renderer registry are owned by one driver instance and never shared.

pub mod backend;
pub mod driver;
pub mod error;
pub mod image;
pub mod lighting;
pub mod material;
pub mod materials;
pub mod resources;
pub mod state;
pub mod types;
pub mod vertex;

#[cfg(test)]
mod driver_tests;

pub use driver::{CurrentContext, VideoDriver};
pub use error::{BackendError, BackendResult, DriverError, DriverResult};
pub use image::{ColorFormat, Image};
pub use lighting::{Fog, FogType, Light, LightType};
pub use material::{Material, MaterialTypeId, MATERIAL_MAX_TEXTURES};
pub use materials::{BuiltinMaterial, MaterialRenderer, MaterialRendererServices, ShaderConstantSetCallback};
pub use resources::TextureHandle;
pub use types::{
    ClearFlags, FrameStats, PrimitiveType, RenderMode, TextureCreationFlags, TransformSlot, VertexType,
    VideoDriverFeature,
};
pub use vertex::{Vertex, Vertex2TCoords, Vertex3D, VertexTangents};
