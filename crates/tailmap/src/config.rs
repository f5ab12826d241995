//! CLI configuration: TOML file + environment, merged via figment.
//!
//! The config file holds source credentials and the core tuning knobs;
//! `GlobalOpts` flags override it. Core defaults live in
//! `tailmap_core::CoreConfig`, not here.

use std::path::PathBuf;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use tailmap_api::DirectoryClient;
use tailmap_core::{CoreConfig, DirectorySource, FileSource, Source};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── TOML config struct ──────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Tailnet name for the directory API.
    pub tailnet: Option<String>,

    /// Directory API key (prefer the TAILMAP_API_KEY environment
    /// variable over storing this in the file).
    pub api_key: Option<String>,

    /// Manual device file used as the fallback source.
    pub device_file: Option<PathBuf>,

    /// Core tuning (staleness threshold, refresh interval, topology
    /// policy, canvas, layout).
    pub core: CoreConfig,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "tailmap", "tailmap").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("tailmap");
    p
}

// ── Loading ─────────────────────────────────────────────────────────

pub fn load_config() -> Result<Config, CliError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(config_path()))
        .merge(Env::prefixed("TAILMAP_"));

    let config: Config = figment.extract().map_err(Box::new)?;
    Ok(config)
}

// ── Source-chain resolution ─────────────────────────────────────────

/// Build the ordered source chain from config + flag overrides.
///
/// Directory API first (when a tailnet and key are available), then the
/// manual device file. An empty chain is fine for `watch`-style reads of
/// the seed set but is an error for an explicit refresh, so callers that
/// require a source should check `is_empty` themselves.
pub fn build_sources(
    config: &Config,
    global: &GlobalOpts,
) -> Result<Vec<Box<dyn Source>>, CliError> {
    let mut sources: Vec<Box<dyn Source>> = Vec::new();

    let tailnet = global.tailnet.as_ref().or(config.tailnet.as_ref());
    let api_key = global.api_key.as_ref().or(config.api_key.as_ref());
    if let (Some(tailnet), Some(key)) = (tailnet, api_key) {
        if tailnet.is_empty() {
            return Err(CliError::Validation {
                field: "tailnet".into(),
                reason: "must not be empty".into(),
            });
        }
        let client = DirectoryClient::new(tailnet.clone(), SecretString::from(key.clone()))?;
        tracing::debug!(tailnet = client.tailnet(), "directory source configured");
        sources.push(Box::new(DirectorySource::new(client)));
    }

    if let Some(path) = global.device_file.as_ref().or(config.device_file.as_ref()) {
        sources.push(Box::new(FileSource::new(path.clone())));
    }

    Ok(sources)
}
