use super::models::Config;
use crate::extract::{IpPolicy, PolicyError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("pool.worker_count must be at least 1")]
    NoWorkers,

    #[error("pool.queue_capacity must be at least 1")]
    ZeroQueueCapacity,

    #[error("Byte limit must be positive: {field}")]
    ZeroByteLimit { field: &'static str },

    #[error("extractor.wait_timeout_secs must be positive")]
    ZeroWaitTimeout,

    #[error(transparent)]
    InvalidRange(#[from] PolicyError),
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_pool(config)?;
    validate_extractor(config)?;
    Ok(())
}

fn validate_pool(config: &Config) -> Result<(), ValidationError> {
    if config.pool.worker_count == 0 {
        return Err(ValidationError::NoWorkers);
    }

    if config.pool.queue_capacity == Some(0) {
        return Err(ValidationError::ZeroQueueCapacity);
    }

    Ok(())
}

fn validate_extractor(config: &Config) -> Result<(), ValidationError> {
    let extractor = &config.extractor;

    if extractor.html_bytes_to_read.as_u64() == 0 {
        return Err(ValidationError::ZeroByteLimit {
            field: "html_bytes_to_read",
        });
    }

    if extractor.binary_bytes_to_read.as_u64() == 0 {
        return Err(ValidationError::ZeroByteLimit {
            field: "binary_bytes_to_read",
        });
    }

    if extractor.wait_timeout_secs == 0 {
        return Err(ValidationError::ZeroWaitTimeout);
    }

    IpPolicy::from_ranges(&extractor.whitelist_ranges, &extractor.blacklist_ranges)?;

    Ok(())
}
