//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the driver:
//! - Math types and screen-space rectangles
//! - Colour types and channel conversions
//! - Handle-keyed collections
//! - Logging utilities

pub mod collections;
pub mod color;
pub mod logging;
pub mod math;
