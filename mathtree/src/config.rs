//! Configuration for the mathtree CLI
//!
//! Sources, highest priority first:
//! 1. Command-line flags
//! 2. Environment variables (`MATHTREE_*`)
//! 3. Configuration files (`.mathtree.yaml`, `.mathtree.json`, ...)
//! 4. Built-in defaults

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "MATHTREE_CONFIG";

const FILE_NAMES: [&str; 4] = [
    ".mathtree.yaml",
    ".mathtree.yml",
    ".mathtree.json",
    ".mathtree.toml",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MathTreeConfig {
    #[serde(default)]
    pub eval: EvalConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Limit on nested user-function calls
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Limit on range lengths and matrix growth
    #[serde(default = "default_max_elements")]
    pub max_elements: usize,
    /// Pre-populate the scope with pi, e, i, ...
    #[serde(default = "default_true")]
    pub constants: bool,
    /// Log every compiled tree and result
    #[serde(default)]
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Notation used when echoing expressions
    #[serde(default)]
    pub notation: Notation,
    /// Print the expression before its value
    #[serde(default)]
    pub echo: bool,
    /// Print evaluation time
    #[serde(default)]
    pub timing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Notation {
    #[default]
    Text,
    Tex,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }
}

fn default_max_depth() -> usize {
    mathtree_compile::DEFAULT_MAX_DEPTH
}

fn default_max_elements() -> usize {
    mathtree_compile::DEFAULT_MAX_ELEMENTS
}

fn default_true() -> bool {
    true
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_elements: default_max_elements(),
            constants: true,
            verbose: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            notation: Notation::Text,
            echo: false,
            timing: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            debug: false,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Files, then the process environment.
    pub fn load() -> Result<MathTreeConfig> {
        let mut config = Self::load_from_files()?;
        Self::apply_environment(&mut config, |key| env::var(key).ok());
        Ok(config)
    }

    fn load_from_files() -> Result<MathTreeConfig> {
        for path in Self::candidate_paths() {
            if path.is_file() {
                info!("Loading configuration from: {}", path.display());
                return Self::load_from_file(&path);
            }
        }
        debug!("No configuration file found, using defaults");
        Ok(MathTreeConfig::default())
    }

    /// Candidate configuration files in lookup order.
    pub fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(config_path) = env::var(CONFIG_ENV) {
            paths.push(PathBuf::from(config_path));
        }
        if let Ok(current_dir) = env::current_dir() {
            paths.extend(FILE_NAMES.iter().map(|name| current_dir.join(name)));
        }
        if let Some(home_dir) = dirs::home_dir() {
            paths.extend(FILE_NAMES.iter().map(|name| home_dir.join(name)));
            paths.push(home_dir.join(".config/mathtree/config.yaml"));
        }
        paths
    }

    pub fn load_from_file(path: &Path) -> Result<MathTreeConfig> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?,
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?,
            Some("toml") => toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?,
            _ => {
                if let Ok(config) = serde_yaml::from_str(&content) {
                    config
                } else if let Ok(config) = toml::from_str(&content) {
                    config
                } else {
                    anyhow::bail!(
                        "Could not parse config file {} (tried YAML, JSON, TOML)",
                        path.display()
                    );
                }
            }
        };
        Ok(config)
    }

    /// Applies `MATHTREE_*` overrides read through `lookup`. Unparseable
    /// values are ignored.
    pub fn apply_environment<F>(config: &mut MathTreeConfig, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(depth) = lookup("MATHTREE_MAX_DEPTH").and_then(|v| v.parse().ok()) {
            config.eval.max_depth = depth;
        }
        if let Some(limit) = lookup("MATHTREE_MAX_ELEMENTS").and_then(|v| v.parse().ok()) {
            config.eval.max_elements = limit;
        }
        if let Some(constants) = lookup("MATHTREE_CONSTANTS").and_then(|v| parse_bool(&v)) {
            config.eval.constants = constants;
        }
        if let Some(verbose) = lookup("MATHTREE_VERBOSE").and_then(|v| parse_bool(&v)) {
            config.eval.verbose = verbose;
        }
        if let Some(notation) = lookup("MATHTREE_NOTATION") {
            config.output.notation = match notation.to_lowercase().as_str() {
                "text" => Notation::Text,
                "tex" | "latex" => Notation::Tex,
                _ => config.output.notation,
            };
        }
        if let Some(timing) = lookup("MATHTREE_TIMING").and_then(|v| parse_bool(&v)) {
            config.output.timing = timing;
        }
        if let Some(debug) = lookup("MATHTREE_DEBUG").and_then(|v| parse_bool(&v)) {
            config.logging.debug = debug;
        }
        if let Some(level) = lookup("MATHTREE_LOG_LEVEL").and_then(|v| LogLevel::parse(&v)) {
            config.logging.level = level;
        }
    }

    pub fn save_to_file(config: &MathTreeConfig, path: &Path) -> Result<()> {
        let content = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(config)
                .context("Failed to serialize config to JSON")?,
            Some("toml") => {
                toml::to_string_pretty(config).context("Failed to serialize config to TOML")?
            }
            _ => serde_yaml::to_string(config).context("Failed to serialize config to YAML")?,
        };
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    pub fn generate_sample_config() -> Result<String> {
        serde_yaml::to_string(&MathTreeConfig::default())
            .context("Failed to serialize default configuration")
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
