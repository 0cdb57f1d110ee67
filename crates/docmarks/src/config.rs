//! CLI-owned configuration: TOML file + environment, translated into
//! `docmarks_core::ViewConfig`.
//!
//! Core never sees these types -- it receives a pre-built `ViewConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use docmarks_core::ViewConfig;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

// ── TOML config structs ──────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Fixture file loaded into the in-memory repositories.
    pub seed: Option<PathBuf>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Collection view tuning.
    #[serde(default)]
    pub view: ViewSettings,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Simulated repository latency.
    #[serde(default)]
    pub latency_ms: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            latency_ms: 0,
        }
    }
}

fn default_output() -> String {
    "table".into()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ViewSettings {
    #[serde(default = "default_command_channel_size")]
    pub command_channel_size: usize,

    /// 0 = unbounded.
    #[serde(default = "default_delete_concurrency")]
    pub delete_concurrency: usize,

    #[serde(default)]
    pub mask_pending_removals: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        let core = ViewConfig::default();
        Self {
            command_channel_size: core.command_channel_size,
            delete_concurrency: core.delete_concurrency,
            mask_pending_removals: core.mask_pending_removals,
        }
    }
}

fn default_command_channel_size() -> usize {
    ViewConfig::default().command_channel_size
}
fn default_delete_concurrency() -> usize {
    ViewConfig::default().delete_concurrency
}

impl ViewSettings {
    pub fn to_view_config(&self) -> ViewConfig {
        ViewConfig {
            command_channel_size: self.command_channel_size,
            delete_concurrency: self.delete_concurrency,
            mask_pending_removals: self.mask_pending_removals,
        }
    }
}

// ── Paths ────────────────────────────────────────────────────────────

/// Default config file location.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("", "", "docmarks").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("docmarks");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ───────────────────────────────────────────────────

/// Load the full Config from defaults, file, and environment.
///
/// Nested keys come from `DOCMARKS_` variables split on `__`, e.g.
/// `DOCMARKS_VIEW__DELETE_CONCURRENCY=2`.
pub fn load_config(path: &Path) -> Result<Config, CliError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("DOCMARKS_").split("__"));

    Ok(figment.extract()?)
}

// ── Resolution ───────────────────────────────────────────────────────

/// Everything a command needs, with CLI flags applied over config.
#[derive(Debug)]
pub struct Settings {
    pub config_path: PathBuf,
    pub seed: Option<PathBuf>,
    pub output: OutputFormat,
    pub latency: Duration,
    pub quiet: bool,
    pub view: ViewConfig,
}

/// Merge the loaded config with global flags (flags win).
pub fn resolve(global: &GlobalOpts) -> Result<Settings, CliError> {
    let config_path = global.config.clone().unwrap_or_else(config_path);
    let config = load_config(&config_path)?;

    let output = match global.output {
        Some(format) => format,
        None => OutputFormat::from_str(&config.defaults.output, true).map_err(|reason| {
            CliError::Validation {
                field: "defaults.output".into(),
                reason,
            }
        })?,
    };

    Ok(Settings {
        seed: global.seed.clone().or(config.seed),
        output,
        latency: Duration::from_millis(global.latency_ms.unwrap_or(config.defaults.latency_ms)),
        quiet: global.quiet,
        view: config.view.to_view_config(),
        config_path,
    })
}
