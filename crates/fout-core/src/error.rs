use std::time::Duration;

use thiserror::Error;

/// Errors surfaced to callers of [`crate::fout`].
#[derive(Debug, Error)]
pub enum CoreError {
    /// Required options missing. Raised before any storage or DOM access.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The font watcher failed; the class was not applied.
    #[error(transparent)]
    Detection(#[from] DetectionError),

    /// No container given and the platform has no document root element.
    #[error("container unavailable: {0}")]
    Container(String),
}

/// Failure reported by a [`crate::FontWatcher`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectionError {
    #[error("font '{family}' not available after {}ms", timeout.as_millis())]
    Timeout { family: String, timeout: Duration },

    #[error("font '{family}' failed to load: {message}")]
    Failed { family: String, message: String },
}

/// Failure reading or writing the marker store.
///
/// Never surfaced by [`crate::fout`]: a failed read counts as a cache miss and
/// a failed write is logged and dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("storage error on '{key}': {message}")]
pub struct StorageError {
    pub key: String,
    pub message: String,
}

impl StorageError {
    pub fn new(key: &str, message: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_reports_millis() {
        let err = DetectionError::Timeout {
            family: "Inter".into(),
            timeout: Duration::from_millis(3000),
        };
        assert_eq!(err.to_string(), "font 'Inter' not available after 3000ms");
    }

    #[test]
    fn detection_converts_into_core_error() {
        let err: CoreError = DetectionError::Failed {
            family: "Inter".into(),
            message: "network".into(),
        }
        .into();
        assert!(matches!(err, CoreError::Detection(_)));
        assert_eq!(err.to_string(), "font 'Inter' failed to load: network");
    }
}
