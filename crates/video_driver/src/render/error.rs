//! Error types for the video driver
//!
//! The facade never panics on bad input. Operations that can fail return a
//! [`DriverResult`] and log the failure at the point where it is detected.
//! Degenerate input (empty draws, fully clipped blits, lights beyond capacity)
//! is not an error at all and never reaches these types.

use thiserror::Error;

/// Errors reported by the video driver facade
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    /// The image uses a pixel format the driver cannot upload
    ///
    /// Compressed formats are never decoded by the driver; they have to be
    /// converted by the image collaborator first.
    #[error("Unsupported pixel format: {0}")]
    UnsupportedFormat(String),

    /// A resource handle minted by a different driver instance was used
    #[error("Resource is not owned by this driver")]
    CrossDriverResource,

    /// A resource handle that no longer refers to a live resource was used
    #[error("Invalid or destroyed resource handle")]
    InvalidHandle,

    /// No rendering context could be created, not even a degraded one
    #[error("Context creation failed: {0}")]
    ContextCreation(String),

    /// A shader program was rejected by the backend compiler
    #[error("Shader compilation failed: {0}")]
    ShaderCompilation(String),

    /// A high-level shader program failed to link
    #[error("Shader link failed: {0}")]
    ShaderLink(String),

    /// The operation requires a capability the backend does not have
    #[error("Feature unavailable: {0}")]
    FeatureUnavailable(String),

    /// Every material type id above the configured base is taken
    #[error("No material type id left above base {0}")]
    MaterialTypeIdsExhausted(i32),

    /// Backend-specific failure
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Errors raised by a graphics backend adapter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The adapter could not create a context with the requested settings
    #[error("Context unavailable: {0}")]
    ContextUnavailable(String),

    /// Program source was rejected
    #[error("Compile error: {0}")]
    Compile(String),

    /// Program objects could not be linked together
    #[error("Link error: {0}")]
    Link(String),

    /// Texture storage could not be allocated
    #[error("Out of texture memory: {0}")]
    OutOfMemory(String),

    /// The adapter does not know the given object id
    #[error("Unknown backend object: {0}")]
    UnknownObject(u32),

    /// Buffers could not be presented
    #[error("Present failed: {0}")]
    Present(String),
}

/// Result type for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_converts_into_driver_error() {
        let err: DriverError = BackendError::UnknownObject(3).into();

        assert_eq!(err, DriverError::Backend(BackendError::UnknownObject(3)));
        assert_eq!(err.to_string(), "Backend error: Unknown backend object: 3");
    }
}
