//! Engine error types

use ash::vk;
use thiserror::Error;

use super::types::BackendApi;

/// Recoverable engine failures
///
/// Capability misses are not errors; they come back as `None` or `0`.
#[derive(Debug, Error)]
pub enum EngineError {
    /// `SharedContext::init` was called a second time
    #[error("Shared context is already initialized")]
    AlreadyInitialized,

    /// A query needed the device before `init` ran
    #[error("Shared context is not initialized")]
    NotInitialized,

    /// Device and context were created for different backends
    #[error("Backend mismatch: context expects {expected:?}, device is {actual:?}")]
    BackendMismatch {
        /// Backend the context was created for
        expected: BackendApi,
        /// Backend the device reports
        actual: BackendApi,
    },

    /// The shared context has been discarded
    #[error("Shared context has been discarded")]
    Discarded,

    /// No stage is registered under this ID
    #[error("Unknown fragment stage: {0}")]
    UnknownStage(u32),

    /// A pipeline key does not describe a well-formed stage tree
    #[error("Malformed pipeline key: {reason}")]
    MalformedKey {
        /// What is wrong with the key
        reason: String,
    },

    /// The backend failed to build a pipeline
    #[error("Pipeline compilation failed: {0}")]
    PipelineCompilation(String),

    /// The backend failed to allocate an image
    #[error("Image creation failed: {0}")]
    ImageCreation(String),

    /// Native API error returned from a recoverable call
    #[error("Vulkan API error: {0:?}")]
    Vulkan(vk::Result),

    /// The device has been marked immutable and accepts no more work
    #[error("Device is immutable")]
    DeviceImmutable,
}

impl From<vk::Result> for EngineError {
    fn from(result: vk::Result) -> Self {
        Self::Vulkan(result)
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
