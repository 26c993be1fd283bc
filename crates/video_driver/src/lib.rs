//! # Video Driver
//!
//! A hardware-abstracted video driver over stateful, immediate-mode graphics
//! APIs. It caches render state to avoid redundant backend calls, manages
//! GPU resources through handle tables and dispatches draws through
//! pluggable material renderers.
//!
//! ## Features
//!
//! - **State Caching**: material diffs emit only the state groups that changed
//! - **2D and 3D Drawing**: indexed triangle lists and fans, clipped 2D blits
//! - **Material Renderers**: 23 built-in fixed-function and program renderers,
//!   custom and shader materials registered at runtime
//! - **Resource Handles**: generational texture handles that refuse stale or
//!   foreign use
//! - **Headless Backend**: a software backend with a call log for tests and tools
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use video_driver::prelude::*;
//!
//! fn main() -> Result<(), DriverError> {
//!     video_driver::foundation::logging::init();
//!
//!     let mut factory = HeadlessFactory::new();
//!     let mut driver = VideoDriver::new(DriverConfig::default(), &mut factory)?;
//!
//!     driver.begin_scene(true, true, Color::new(255, 40, 40, 60));
//!     driver.draw_2d_rectangle(Color::WHITE, Rect::new(10, 10, 110, 60), None);
//!     driver.end_scene();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod render;

/// Common imports for driver users
pub mod prelude {
    pub use crate::{
        config::{Config, DriverConfig, TextureCreationConfig},
        foundation::{
            color::{Color, ColorF},
            math::{Dimension2, Mat4, Mat4Ext, Position2, Rect, Vec3},
        },
        render::{
            backend::{BackendFactory, GraphicsBackend, HeadlessBackend, HeadlessFactory},
            ClearFlags, DriverError, DriverResult, Fog, Image, Light, Material, MaterialRenderer,
            MaterialRendererServices, MaterialTypeId, ShaderConstantSetCallback, TextureCreationFlags,
            TextureHandle, TransformSlot, Vertex3D, VideoDriver, VideoDriverFeature,
        },
    };
}
