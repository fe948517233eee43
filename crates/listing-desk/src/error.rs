use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::listings::ListingServiceError;
use thiserror::Error;

/// Failures surfaced by the binary: startup, serving, and the console demo.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("listing workflow error: {0}")]
    Workflow(#[from] ListingServiceError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::listings::AuthorizationError;
    use std::error::Error as _;

    #[test]
    fn workflow_failures_keep_their_cause() {
        let err = AppError::from(ListingServiceError::from(AuthorizationError::AdminRequired));
        assert!(err.to_string().starts_with("listing workflow error: "));
        assert!(err.source().is_some());
    }

    #[test]
    fn config_failures_name_the_key() {
        let err = AppError::from(ConfigError::InvalidNumber {
            key: "UPLOAD_MAX_ATTEMPTS",
        });
        assert_eq!(
            err.to_string(),
            "configuration error: UPLOAD_MAX_ATTEMPTS must be a positive integer"
        );
    }
}
