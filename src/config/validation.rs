use crate::config::types::{Config, CrawlerConfig, LoginConfig, OutputConfig, ScopeConfig, SimilarityConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_similarity_config(&config.similarity)?;
    validate_scope_config(&config.scope)?;
    if let Some(login) = &config.login {
        validate_login_config(login)?;
    }
    validate_http_url("webdriver-url", &config.browser.webdriver_url)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_http_url("start-url", &config.start_url)?;

    if config.max_click_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_click_retries must be >= 1, got {}",
            config.max_click_retries
        )));
    }

    validate_ratio("error_ratio_threshold", config.error_ratio_threshold)?;

    Ok(())
}

/// Validates thresholds and weights of the similarity oracle
fn validate_similarity_config(config: &SimilarityConfig) -> Result<(), ConfigError> {
    validate_ratio("duplicate_threshold", config.duplicate_threshold)?;
    validate_ratio("login_change_threshold", config.login_change_threshold)?;
    validate_ratio("cluster_threshold", config.cluster_threshold)?;

    let weights = [
        ("clickable_weight", config.clickable_weight),
        ("form_weight", config.form_weight),
        ("link_weight", config.link_weight),
    ];
    for (name, weight) in weights {
        if !weight.is_finite() || weight < 0.0 {
            return Err(ConfigError::Validation(format!(
                "{} must be a non-negative number, got {}",
                name, weight
            )));
        }
    }

    if weights.iter().map(|(_, w)| w).sum::<f64>() <= 0.0 {
        return Err(ConfigError::Validation(
            "at least one similarity weight must be positive".to_string(),
        ));
    }

    Ok(())
}

/// Validates scope domain patterns
fn validate_scope_config(config: &ScopeConfig) -> Result<(), ConfigError> {
    for pattern in &config.allowed_domains {
        validate_domain_pattern(pattern)?;
    }

    if config.exclude_patterns.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::Validation(
            "exclude_patterns cannot contain empty strings".to_string(),
        ));
    }

    Ok(())
}

/// Validates login configuration
fn validate_login_config(config: &LoginConfig) -> Result<(), ConfigError> {
    validate_http_url("url-with-login-form", &config.url_with_login_form)?;

    if config.data.len() < 2 {
        return Err(ConfigError::Validation(format!(
            "login data needs at least two credential fields, got {}",
            config.data.len()
        )));
    }

    if config.data.keys().any(|k| k.is_empty()) {
        return Err(ConfigError::Validation(
            "login data field names cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.report_path.is_empty() {
        return Err(ConfigError::Validation(
            "report_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_ratio(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Validation(format!(
            "{} must be between 0 and 1, got {}",
            name, value
        )));
    }
    Ok(())
}

fn validate_http_url(name: &str, raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            name, raw
        )));
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);
    validate_domain_string(domain)
}

/// Validates a domain string (without wildcard prefix)
///
/// Single-label hosts such as `localhost` are accepted since dynamic
/// applications are often explored on development machines.
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_validate_domain_pattern() {
        assert!(validate_domain_pattern("example.com").is_ok());
        assert!(validate_domain_pattern("*.example.com").is_ok());
        assert!(validate_domain_pattern("localhost").is_ok());

        assert!(validate_domain_pattern("").is_err());
        assert!(validate_domain_pattern("*.").is_err());
        assert!(validate_domain_pattern(".example.com").is_err());
        assert!(validate_domain_pattern("example.com.").is_err());
        assert!(validate_domain_pattern("exa mple.com").is_err());
    }

    #[test]
    fn test_validate_ratio() {
        assert!(validate_ratio("x", 0.0).is_ok());
        assert!(validate_ratio("x", 0.9).is_ok());
        assert!(validate_ratio("x", 1.0).is_ok());
        assert!(validate_ratio("x", -0.1).is_err());
        assert!(validate_ratio("x", 1.5).is_err());
        assert!(validate_ratio("x", f64::NAN).is_err());
    }

    #[test]
    fn test_validate_http_url() {
        assert!(validate_http_url("u", "http://localhost:8080/").is_ok());
        assert!(validate_http_url("u", "https://example.com").is_ok());
        assert!(validate_http_url("u", "ftp://example.com").is_err());
        assert!(validate_http_url("u", "not a url").is_err());
    }

    #[test]
    fn test_login_needs_two_fields() {
        let mut data = BTreeMap::new();
        data.insert("user".to_string(), "admin".to_string());
        let mut login = LoginConfig {
            url_with_login_form: "http://localhost/login".to_string(),
            username: "admin".to_string(),
            data,
        };
        assert!(validate_login_config(&login).is_err());

        login.data.insert("pass".to_string(), "secret".to_string());
        assert!(validate_login_config(&login).is_ok());
    }

    #[test]
    fn test_weights_must_not_all_be_zero() {
        let mut config = SimilarityConfig::default();
        assert!(validate_similarity_config(&config).is_ok());

        config.clickable_weight = 0.0;
        config.form_weight = 0.0;
        config.link_weight = 0.0;
        assert!(validate_similarity_config(&config).is_err());
    }
}
