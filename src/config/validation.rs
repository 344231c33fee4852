use crate::config::types::{
    Config, FetchConfig, FieldSelectors, HarvestConfig, LoginConfig, OutputConfig, StrategyKind,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvest_config(&config.harvest)?;
    validate_fetch_config(&config.fetch)?;
    validate_output_config(&config.output)?;
    validate_field_selectors(&config.fields)?;
    validate_login_config(&config.login)?;
    Ok(())
}

/// Validates batch controller settings
fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    if config.start_id < 1 {
        return Err(ConfigError::Validation(
            "start_id must be >= 1".to_string(),
        ));
    }

    if config.batch_size < 1 || config.batch_size > 100 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and 100, got {}",
            config.batch_size
        )));
    }

    if config.empty_batch_threshold < 1 {
        return Err(ConfigError::Validation(format!(
            "empty_batch_threshold must be >= 1, got {}",
            config.empty_batch_threshold
        )));
    }

    Ok(())
}

/// Validates remote source and transport settings
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    validate_http_url("base_url", &config.base_url)?;

    if config.timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "timeout_ms must be > 0".to_string(),
        ));
    }

    if config.probe_timeout_ms < config.timeout_ms {
        return Err(ConfigError::Validation(format!(
            "probe_timeout_ms ({}) must be >= timeout_ms ({})",
            config.probe_timeout_ms, config.timeout_ms
        )));
    }

    if config.probe_id < 1 {
        return Err(ConfigError::Validation(
            "probe_id must be >= 1".to_string(),
        ));
    }

    match config.strategy {
        StrategyKind::Direct => {}
        StrategyKind::Authenticated => {
            let login_url = config.login_url.as_deref().ok_or_else(|| {
                ConfigError::Validation(
                    "login_url is required for the authenticated strategy".to_string(),
                )
            })?;
            validate_http_url("login_url", login_url)?;

            if config.session_cookie.is_empty() {
                return Err(ConfigError::Validation(
                    "session_cookie cannot be empty".to_string(),
                ));
            }
        }
        StrategyKind::Browser => {
            if !cfg!(feature = "browser") {
                return Err(ConfigError::Validation(
                    "the browser strategy requires building with the `browser` feature"
                        .to_string(),
                ));
            }

            if config.dom_timeout_ms == 0 {
                return Err(ConfigError::Validation(
                    "dom_timeout_ms must be > 0".to_string(),
                ));
            }
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.file.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output file cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_field_selectors(fields: &FieldSelectors) -> Result<(), ConfigError> {
    for (field, selector) in fields.entries() {
        validate_selector(field, selector)?;
    }
    Ok(())
}

fn validate_login_config(login: &LoginConfig) -> Result<(), ConfigError> {
    validate_selector("username_selector", &login.username_selector)?;
    validate_selector("password_selector", &login.password_selector)?;
    validate_selector("submit_selector", &login.submit_selector)?;
    if let Some(remember) = &login.remember_selector {
        validate_selector("remember_selector", remember)?;
    }

    if login.username.is_empty() || login.password.is_empty() {
        return Err(ConfigError::Validation(
            "login form parameter names cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_selector(field: &str, selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
        field: field.to_string(),
        selector: selector.to_string(),
    })?;
    Ok(())
}

/// Requires an absolute http(s) URL
fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use the http or https scheme",
            name, value
        )));
    }

    Ok(())
}
