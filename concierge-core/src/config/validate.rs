//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    let base_url = config.client.base_url.trim();
    if base_url.is_empty() {
        errors.push("client.base_url must not be empty".to_string());
    } else if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        errors.push("client.base_url must start with http:// or https://".to_string());
    }

    if config.server.host.trim().is_empty() {
        errors.push("server.host must not be empty".to_string());
    }
    if config.server.port == 0 {
        errors.push("server.port must be > 0".to_string());
    }
    if config.server.api_base.trim().is_empty() {
        errors.push("server.api_base must not be empty".to_string());
    }
    if config.server.model.trim().is_empty() {
        errors.push("server.model must not be empty".to_string());
    }
    if config.server.max_tokens == 0 {
        errors.push("server.max_tokens must be > 0".to_string());
    }
    if !(0.0..=1.0).contains(&config.server.funny_probability) {
        errors.push("server.funny_probability must be in [0.0, 1.0]".to_string());
    }

    let format = config.logging.format.to_lowercase();
    if format != "text" && format != "json" {
        errors.push("logging.format must be \"text\" or \"json\"".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}
