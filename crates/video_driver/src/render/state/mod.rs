//! Render state tracking
//!
//! [`StateCache`] mirrors what the backend currently has applied so that the
//! driver only emits state changes that actually change something.

pub mod state_cache;
pub mod transforms;

pub use state_cache::{texture_filter_for, Mode2DConfig, StageTexture, StateCache};
pub use transforms::TransformState;
