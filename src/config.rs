//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$EML2HTML_CONFIG` (environment variable)
//! 2. `~/.config/eml2html/config.toml` (Linux/macOS)
//!    `%APPDATA%\eml2html\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::export::attachment::ExportOptions;
use crate::export::filename::FilenamePolicy;
use crate::parser::tree::ParserOptions;
use crate::render::{RenderOptions, DEFAULT_DATE_FORMAT};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// MIME parser leniency.
    pub parser: ParserConfig,
    /// HTML output settings.
    pub render: RenderConfig,
    /// Attachment extraction settings.
    pub attachments: AttachmentsConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// MIME parser leniency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Deepest multipart nesting that is still descended into.
    pub max_depth: usize,
    /// Drop a leading mbox `From ` line.
    pub skip_from_line: bool,
    /// Keep what can be decoded from corrupt base64 instead of failing.
    pub ignore_base64_errors: bool,
}

/// HTML output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Do not prepend the From/Subject/To/Cc/Date table.
    pub hide_headers: bool,
    /// Do not embed inline images.
    pub hide_images: bool,
    /// `strftime` format string for the sent date.
    pub date_format: String,
}

/// Attachment extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentsConfig {
    /// Substitute for characters not allowed in filenames.
    pub replacement_char: char,
    /// Filename rules: "host", "windows" or "unix".
    pub policy: String,
    /// Prefix of names generated for attachments without one.
    pub nameless_prefix: String,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        let options = ParserOptions::default();
        Self {
            max_depth: options.max_depth,
            skip_from_line: options.skip_from_line,
            ignore_base64_errors: options.ignore_base64_errors,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            hide_headers: false,
            hide_images: false,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            replacement_char: '_',
            policy: "host".to_string(),
            nameless_prefix: "nameless-".to_string(),
        }
    }
}

// ── Conversions ─────────────────────────────────────────────────

impl Config {
    /// Parser options; the content type handler is always the default one.
    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            max_depth: self.parser.max_depth,
            skip_from_line: self.parser.skip_from_line,
            ignore_base64_errors: self.parser.ignore_base64_errors,
            ..ParserOptions::default()
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            hide_images: self.render.hide_images,
            date_format: self.render.date_format.clone(),
        }
    }

    /// Export options; an unknown policy name falls back to the host's rules.
    pub fn export_options(&self) -> ExportOptions {
        let policy = FilenamePolicy::from_name(&self.attachments.policy).unwrap_or_else(|| {
            tracing::warn!(
                policy = %self.attachments.policy,
                "Unknown filename policy, using the host's"
            );
            FilenamePolicy::host()
        });
        ExportOptions {
            replacement_char: self.attachments.replacement_char,
            policy,
            nameless_prefix: self.attachments.nameless_prefix.clone(),
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    // 1. Environment variable override
    if let Ok(env_path) = std::env::var("EML2HTML_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    // 2. Standard config directory
    dirs::config_dir().map(|d| d.join("eml2html").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("eml2html")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("eml2html.log")
}
