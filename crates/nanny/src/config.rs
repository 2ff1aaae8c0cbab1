//! Process configuration

use anyhow::{Context, Result};
use nanny_lib::{Configuration, NannyConfig};
use std::path::PathBuf;

/// Environment variable naming an optional configuration file
const CONFIG_FILE_ENV: &str = "NANNY_CONFIG_FILE";

/// Validated settings for the nanny process
#[derive(Debug, Clone)]
pub struct Settings {
    pub configuration: Configuration,
    pub api_port: u16,
}

impl Settings {
    /// Load and validate configuration; any error is fatal at startup
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_FILE_ENV).map(PathBuf::from);
        let raw = NannyConfig::load(path.as_deref()).with_context(|| match &path {
            Some(path) => format!("Failed to load configuration from {}", path.display()),
            None => "Failed to load configuration from environment".to_string(),
        })?;

        let configuration = raw.validate().context("Invalid configuration")?;

        Ok(Self {
            configuration,
            api_port: raw.api_port,
        })
    }
}
