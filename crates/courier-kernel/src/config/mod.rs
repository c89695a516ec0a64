//! Configuration loading.
//!
//! Supports INI, TOML, YAML and JSON files (format picked from the extension),
//! `${VAR}` / `$VAR` substitution inside file contents, and
//! `COURIER__SECTION__KEY` environment overrides layered on top.
//!
//! INI values are taken verbatim: backslashes are not escape sequences, so
//! `re = ^\d{6}$` reaches the matcher unchanged.
//!
//! The typed gateway configuration lives in [`settings`].

pub mod settings;


pub use settings::{
    DialogSection, DiscoverySection, GatewayConfig, GatewaySection, GeneralSection,
    MatcherSection, SecuritySection,
};

pub use config::FileFormat;

use config::{Config as Cfg, Environment, File};
use ini::{Ini, ParseOption};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::LazyLock;

/// Prefix for environment overrides, e.g. `COURIER__SECURITY__SECRET_KEY`.
pub const ENV_PREFIX: &str = "COURIER";

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parsing error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

static BRACED_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("literal regex compiles")
});

static BARE_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)\b").expect("literal regex compiles")
});

/// Detect configuration format from file extension.
///
/// - INI: `.ini`
/// - TOML: `.toml`
/// - YAML: `.yaml`, `.yml`
/// - JSON: `.json`
pub fn detect_format(path: &str) -> ConfigResult<FileFormat> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat("No file extension found".to_string()))?;

    match ext.to_lowercase().as_str() {
        "ini" => Ok(FileFormat::Ini),
        "toml" => Ok(FileFormat::Toml),
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "json" => Ok(FileFormat::Json),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

/// Substitute environment variables in a string.
///
/// `${VAR_NAME}` is replaced first, then bare `$VAR_NAME`. References to unset
/// variables are left untouched.
pub fn substitute_env_vars(content: &str) -> String {
    let braced = BRACED_VAR.replace_all(content, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    });

    BARE_VAR
        .replace_all(&braced, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Re-read INI content without escape processing and hand it to the
/// builder as JSON. Other formats pass through untouched.
fn normalize_source(content: String, format: FileFormat) -> ConfigResult<(String, FileFormat)> {
    if format != FileFormat::Ini {
        return Ok((content, format));
    }

    let options = ParseOption {
        enabled_escape: false,
        ..ParseOption::default()
    };
    let ini = Ini::load_from_str_opt(&content, options)
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    let mut root = Map::new();
    for (section, properties) in ini.iter() {
        let target = match section {
            Some(name) => match root
                .entry(name.to_string())
                .or_insert_with(|| Value::Object(Map::new()))
            {
                Value::Object(map) => map,
                _ => {
                    return Err(ConfigError::Parse(format!(
                        "section [{name}] clashes with a top-level key"
                    )));
                }
            },
            None => &mut root,
        };
        for (key, value) in properties.iter() {
            target.insert(key.to_string(), Value::String(value.to_string()));
        }
    }

    Ok((Value::Object(root).to_string(), FileFormat::Json))
}

/// Parse configuration from a string with an explicit format.
pub fn from_str<T>(content: &str, format: FileFormat) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let (source, format) = normalize_source(substitute_env_vars(content), format)?;

    let config = Cfg::builder()
        .add_source(File::from_str(&source, format))
        .build()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| ConfigError::Serialization(e.to_string()))
}

/// Load configuration from a file, with environment variable overrides.
///
/// Environment variables use `{env_prefix}__SECTION__KEY`.
pub fn load_with_env<T>(path: &str, env_prefix: &str) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    tracing::debug!(path, format = ?format, env_prefix, "loading configuration");
    let (source, format) = normalize_source(substitute_env_vars(&content), format)?;

    let config = Cfg::builder()
        .add_source(File::from_str(&source, format))
        .add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| ConfigError::Serialization(e.to_string()))
}
