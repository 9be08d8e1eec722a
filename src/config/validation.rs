use crate::config::types::{CacheConfig, Config, OutputConfig, RenderConfig, SourceConfig};
use crate::{ConfigError, ConfigResult};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_source_config(&config.source)?;
    validate_cache_config(&config.cache)?;
    validate_render_config(&config.render)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the remote source configuration
fn validate_source_config(config: &SourceConfig) -> ConfigResult<()> {
    validate_domain_string(&config.domain)?;

    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.timeout_ms < 100 || config.timeout_ms > 600_000 {
        return Err(ConfigError::Validation(format!(
            "timeout-ms must be between 100 and 600000, got {}",
            config.timeout_ms
        )));
    }

    if config.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates cache configuration
fn validate_cache_config(config: &CacheConfig) -> ConfigResult<()> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "cache directory cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates rendering configuration
fn validate_render_config(config: &RenderConfig) -> ConfigResult<()> {
    if config.name_max_length < 1 {
        return Err(ConfigError::Validation(
            "name-max-length must be >= 1".to_string(),
        ));
    }

    if config.summary_max_length < 1 {
        return Err(ConfigError::Validation(
            "summary-max-length must be >= 1".to_string(),
        ));
    }

    if config.diff_edit_cost > 64 {
        return Err(ConfigError::Validation(format!(
            "diff-edit-cost must be <= 64, got {}",
            config.diff_edit_cost
        )));
    }

    if config.default_type.is_empty() {
        return Err(ConfigError::Validation(
            "default-type cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates a bare domain string such as `arbital.com`
fn validate_domain_string(domain: &str) -> ConfigResult<()> {
    if domain.is_empty() {
        return Err(ConfigError::Validation("domain cannot be empty".to_string()));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_domain_string() {
        assert!(validate_domain_string("arbital.com").is_ok());
        assert!(validate_domain_string("wiki.example.org").is_ok());
        assert!(validate_domain_string("localhost").is_ok());

        assert!(validate_domain_string("").is_err());
        assert!(validate_domain_string(".example.com").is_err());
        assert!(validate_domain_string("example.com.").is_err());
        assert!(validate_domain_string("exa mple.com").is_err());
        assert!(validate_domain_string("a..b").is_err());
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let mut config = Config::default();
        config.source.base_url = "ftp://arbital.com".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let mut config = Config::default();
        config.source.timeout_ms = 50;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.render.diff_edit_cost = 1000;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.render.summary_max_length = 0;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.output.directory = String::new();
        assert!(validate(&config).is_err());
    }
}
