//! Configuration loading from disk and the process environment.
//!
//! Precedence, lowest first: built-in defaults, the optional TOML file,
//! environment variables.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{RunMode, LogFormat, SiteConfig};
use crate::config::validation::{validate_config, ValidationIssue};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {name}: '{value}'")]
    Env { name: &'static str, value: String },

    #[error("Validation failed: {}", join_issues(.0))]
    Validation(Vec<ValidationIssue>),
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a configuration file without applying the environment.
pub fn load_file(path: &Path) -> Result<SiteConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Load and validate configuration from an optional TOML file and the
/// process environment.
pub fn load_config(path: Option<&Path>) -> Result<SiteConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_file(path)?,
        None => SiteConfig::default(),
    };

    apply_env(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto `config`.
///
/// `lookup` abstracts the environment so callers (and tests) can supply
/// their own source.
pub fn apply_env<F>(config: &mut SiteConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        let parsed = port.trim().parse::<u16>().map_err(|_| ConfigError::Env {
            name: "PORT",
            value: port.clone(),
        })?;
        config.listener.set_port(parsed);
    }

    if let Some(origins) = lookup("ALLOWED_ORIGINS") {
        config.cors.allowed_origins = origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();
    }

    if let Some(name) = lookup("SCHOOL_NAME").filter(|v| !v.is_empty()) {
        config.school.name = name;
    }
    if let Some(year) = lookup("ESTABLISHED_YEAR").filter(|v| !v.is_empty()) {
        config.school.established_year = year;
    }
    if let Some(email) = lookup("SCHOOL_EMAIL").filter(|v| !v.is_empty()) {
        config.school.email = email;
    }

    if let Some(url) = lookup("FACEBOOK_URL") {
        config.social.facebook = url;
    }
    if let Some(url) = lookup("INSTAGRAM_URL") {
        config.social.instagram = url;
    }
    if let Some(url) = lookup("TIKTOK_URL") {
        config.social.tiktok = url;
    }

    // Only the exact string "true" enables a feature.
    if let Some(flag) = lookup("ENABLE_WHATSAPP") {
        config.features.enable_whatsapp = flag == "true";
    }
    if let Some(flag) = lookup("ENABLE_CONTACT_FORM") {
        config.features.enable_contact_form = flag == "true";
    }

    if let Some(number) = lookup("WHATSAPP_NUMBER") {
        config.whatsapp.number = Some(number).filter(|n| !n.is_empty());
    }

    if let Some(mode) = lookup("RUN_MODE").or_else(|| lookup("NODE_ENV")) {
        config.observability.run_mode = RunMode::from_name(&mode);
    }

    if let Some(format) = lookup("LOG_FORMAT") {
        config.observability.log_format = match format.trim().to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "pretty" | "text" => Some(LogFormat::Pretty),
            _ => {
                return Err(ConfigError::Env {
                    name: "LOG_FORMAT",
                    value: format,
                })
            }
        };
    }

    if let Some(root) = lookup("SITE_ROOT").filter(|v| !v.is_empty()) {
        config.site.root = PathBuf::from(root);
    }

    Ok(())
}
