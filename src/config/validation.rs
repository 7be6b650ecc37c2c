use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },

    #[error("{field} must be an http(s) URL, got '{value}'")]
    InvalidUrl { field: &'static str, value: String },

    #[error("server.videos_dir must not be empty")]
    EmptyVideosDir,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_discovery(config)?;
    validate_urls(config)?;
    validate_server(config)?;
    Ok(())
}

fn validate_discovery(config: &Config) -> Result<(), ValidationError> {
    let discovery = &config.discovery;

    if discovery.max_retries == 0 {
        return Err(ValidationError::ZeroValue {
            field: "discovery.max_retries",
        });
    }
    if discovery.batch_size == 0 {
        return Err(ValidationError::ZeroValue {
            field: "discovery.batch_size",
        });
    }
    if discovery.max_scroll_per_pass == 0 {
        return Err(ValidationError::ZeroValue {
            field: "discovery.max_scroll_per_pass",
        });
    }
    Ok(())
}

fn validate_urls(config: &Config) -> Result<(), ValidationError> {
    let urls = [
        ("resolver.base_url", &config.resolver.base_url),
        ("extractor.webdriver_url", &config.extractor.webdriver_url),
        ("extractor.site_url", &config.extractor.site_url),
        ("extractor.popular_url", &config.extractor.popular_url),
        ("extractor.hashtags_url", &config.extractor.hashtags_url),
    ];

    for (field, value) in urls {
        let valid = reqwest::Url::parse(value)
            .map(|url| matches!(url.scheme(), "http" | "https"))
            .unwrap_or(false);
        if !valid {
            return Err(ValidationError::InvalidUrl {
                field,
                value: value.clone(),
            });
        }
    }
    Ok(())
}

fn validate_server(config: &Config) -> Result<(), ValidationError> {
    if config.server.videos_dir.as_os_str().is_empty() {
        return Err(ValidationError::EmptyVideosDir);
    }
    if config.server.max_payload_bytes.as_u64() == 0 {
        return Err(ValidationError::ZeroValue {
            field: "server.max_payload_bytes",
        });
    }
    Ok(())
}
