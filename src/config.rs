// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::display::{DisplayOptions, DisplayStrategy};
use crate::ssh::SshParams;

const APP_DIR_NAME: &str = "topyaz";
const CONFIG_FILE_NAME: &str = "topyaz.toml";
const CONFIG_ENV_VAR: &str = "TOPYAZ_CONFIG_PATH";
const DEFAULT_BASE_DIR: &str = "/tmp/topyaz";
const DEFAULT_PORT: u16 = 22;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 3600;
const DEFAULT_KEEPALIVE_SECS: u64 = 15;

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    host: Option<String>,
    user: Option<String>,
    port: Option<u16>,
    ssh_key: Option<String>,
    base_dir: Option<String>,
    connect_timeout_secs: Option<u64>,
    command_timeout_secs: Option<u64>,
    keepalive_secs: Option<u64>,
    display: Option<FileDisplayConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct FileDisplayConfig {
    enabled: Option<bool>,
    strategy: Option<String>,
    screen_size: Option<String>,
    force: Option<bool>,
}

/// Resolved configuration for remote execution.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: Option<String>,
    pub user: Option<String>,
    pub port: u16,
    pub ssh_key: Option<PathBuf>,
    pub base_dir: String,
    pub connect_timeout_secs: u64,
    pub command_timeout_secs: u64,
    pub keepalive_secs: u64,
    pub display: DisplayOptions,
    pub config_path: Option<PathBuf>,
}

/// Command-line style overrides; take precedence over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub user: Option<String>,
    pub port: Option<u16>,
    pub ssh_key: Option<PathBuf>,
    pub base_dir: Option<String>,
}

impl Config {
    /// Connection parameters for a remote executor. Host and user must
    /// be configured by the time a connection is wanted.
    pub fn ssh_params(&self) -> Result<SshParams> {
        let host = self
            .host
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .context("no remote host configured; set `host` in the config file")?;
        let user = self
            .user
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .context("no remote user configured; set `user` in the config file")?;
        let mut params = SshParams::new(host, user);
        params.port = self.port;
        params.identity_path = self.ssh_key.clone();
        params.connect_timeout_secs = self.connect_timeout_secs;
        params.keepalive_secs = self.keepalive_secs;
        Ok(params)
    }
}

/// Load configuration with precedence defaults < config file < overrides.
///
/// The config path itself resolves override > `TOPYAZ_CONFIG_PATH` >
/// default location; only explicitly named files are required to exist.
pub fn load(config_path_override: Option<PathBuf>, overrides: Overrides) -> Result<Config> {
    let (config_path, required) = match config_path_override {
        Some(path) => (Some(expand_path(path)), true),
        None => match config_path_from_env()? {
            Some(path) => (Some(expand_path(path)), true),
            None => (default_config_path().ok(), false),
        },
    };

    let file_config = match config_path.as_deref() {
        Some(path) => read_config_file(path, required)?,
        None => FileConfig::default(),
    };
    let config_dir = config_path.as_deref().and_then(Path::parent);

    let ssh_key = match overrides.ssh_key {
        Some(path) => Some(expand_path(path)),
        None => file_config
            .ssh_key
            .as_deref()
            .map(|raw| resolve_path(raw, config_dir)),
    };

    let display = build_display_options(file_config.display.unwrap_or_default())?;

    Ok(Config {
        host: overrides.host.or(file_config.host),
        user: overrides.user.or(file_config.user),
        port: overrides.port.or(file_config.port).unwrap_or(DEFAULT_PORT),
        ssh_key,
        base_dir: overrides
            .base_dir
            .or(file_config.base_dir)
            .unwrap_or_else(|| DEFAULT_BASE_DIR.to_string()),
        connect_timeout_secs: file_config
            .connect_timeout_secs
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        command_timeout_secs: file_config
            .command_timeout_secs
            .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS),
        keepalive_secs: file_config.keepalive_secs.unwrap_or(DEFAULT_KEEPALIVE_SECS),
        display,
        config_path,
    })
}

fn build_display_options(file: FileDisplayConfig) -> Result<DisplayOptions> {
    let mut options = DisplayOptions::default();
    if let Some(enabled) = file.enabled {
        options.enabled = enabled;
    }
    if let Some(raw) = file.strategy.as_deref() {
        options.strategy = raw
            .parse::<DisplayStrategy>()
            .map_err(|e| anyhow::anyhow!(e))
            .context("invalid `display.strategy` in config file")?;
    }
    if let Some(size) = file.screen_size {
        options.screen_size = size;
    }
    if let Some(force) = file.force {
        options.force = force;
    }
    Ok(options)
}

fn read_config_file(path: &Path, required: bool) -> Result<FileConfig> {
    if !path.exists() {
        if required {
            anyhow::bail!("config file not found at {}", path.display());
        }
        return Ok(FileConfig::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

fn resolve_path(raw: &str, base_dir: Option<&Path>) -> PathBuf {
    let expanded = shellexpand::tilde(raw);
    let path = PathBuf::from(expanded.as_ref());
    if path.is_absolute() {
        return path;
    }
    match base_dir {
        Some(dir) => dir.join(path),
        None => path,
    }
}

fn expand_path(path: PathBuf) -> PathBuf {
    let path_string = path.to_string_lossy().to_string();
    let expanded = shellexpand::tilde(&path_string);
    PathBuf::from(expanded.as_ref())
}

fn config_path_from_env() -> Result<Option<PathBuf>> {
    match env::var_os(CONFIG_ENV_VAR) {
        Some(value) => {
            if value.is_empty() {
                anyhow::bail!("{CONFIG_ENV_VAR} is set but empty");
            }
            Ok(Some(PathBuf::from(value)))
        }
        None => Ok(None),
    }
}

fn default_config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("failed to resolve config directory")?;
    Ok(base.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}
