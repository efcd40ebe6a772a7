//! Sort engine error handling
//!
//! Every failure the sorter can report is raised while a scene is being loaded
//! (configuration, sizing, allocation). Recording and running a frame's sort has
//! no error path; inconsistencies there are programming errors and are caught by
//! debug assertions instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SortError {
    #[error("Invalid sort configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read config file '{path}': {error}")]
    ConfigIo {
        path: String,
        error: std::io::Error,
    },

    #[error("Failed to parse sort configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Primitive count {count} exceeds the sortable maximum of {max}")]
    TooManyPrimitives { count: u64, max: u32 },

    #[error("Buffer '{label}' needs {requested} bytes but the device allows at most {limit}")]
    BufferTooLarge {
        label: &'static str,
        requested: u64,
        limit: u64,
    },

    #[error("Out of device memory while allocating sort buffers: {0}")]
    OutOfDeviceMemory(String),

    #[error("Splat buffer holds {actual} bytes but {expected} are needed")]
    SplatBufferMismatch { expected: u64, actual: u64 },

    #[error("GPU operation '{operation}' failed: {error}")]
    GpuOperationFailed { operation: String, error: String },

    #[error("Failed to map GPU buffer: {0}")]
    BufferMapping(String),

    #[error("No suitable GPU adapter found")]
    NoAdapter,

    #[error("Shader preprocessing failed: {0}")]
    Shader(String),
}

/// Type alias for sort engine results
pub type SortResult<T> = Result<T, SortError>;

/// Helper trait attaching an operation name to foreign errors
pub trait SortErrorContext<T> {
    fn gpu_context(self, operation: &str) -> SortResult<T>;
}

impl<T, E> SortErrorContext<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn gpu_context(self, operation: &str) -> SortResult<T> {
        self.map_err(|e| gpu_operation_error(operation, e))
    }
}

/// Create a GPU operation error
pub fn gpu_operation_error(operation: &str, error: impl std::fmt::Display) -> SortError {
    SortError::GpuOperationFailed {
        operation: operation.to_string(),
        error: error.to_string(),
    }
}

/// Create a buffer mapping error
pub fn buffer_mapping_error(buffer: &str, error: impl std::fmt::Display) -> SortError {
    SortError::BufferMapping(format!("{}: {}", buffer, error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_wraps_foreign_error() {
        let result: Result<(), String> = Err("device lost".to_string());
        let err = result.gpu_context("submit sort").unwrap_err();

        match err {
            SortError::GpuOperationFailed { operation, error } => {
                assert_eq!(operation, "submit sort");
                assert_eq!(error, "device lost");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_error_messages_name_the_limit() {
        let err = SortError::BufferTooLarge {
            label: "Entry Buffer A",
            requested: 1 << 33,
            limit: 1 << 30,
        };
        let message = err.to_string();
        assert!(message.contains("Entry Buffer A"));
        assert!(message.contains(&(1u64 << 30).to_string()));
    }
}
