use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("progress_threshold must be within (0, 100], got {value}")]
    InvalidProgressThreshold { value: f64 },

    #[error("max_title_length must be at least 1")]
    InvalidMaxTitleLength,

    #[error("{field} must be at least 1 second")]
    InvalidPollInterval { field: &'static str },
}

/// Validate cross-field constraints the serde layer cannot express
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    let threshold = config.downloader.progress_threshold;
    if !(threshold > 0.0 && threshold <= 100.0) {
        return Err(ValidationError::InvalidProgressThreshold { value: threshold });
    }

    if config.downloader.max_title_length == 0 {
        return Err(ValidationError::InvalidMaxTitleLength);
    }

    if config.downloader.metadata_poll_seconds == 0 {
        return Err(ValidationError::InvalidPollInterval {
            field: "metadata_poll_seconds",
        });
    }

    if config.downloader.download_poll_seconds == 0 {
        return Err(ValidationError::InvalidPollInterval {
            field: "download_poll_seconds",
        });
    }

    Ok(())
}
