/*
 *  config.rs
 *
 *  trixel - every frame counts
 *  (c) 2025-26
 *
 *  Layered configuration: defaults, YAML file, CLI overrides
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, process};

use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crashlog::DEFAULT_RING_CAPACITY;
use crate::fetch::DEFAULT_FETCH_TIMEOUT;
use crate::supervisor::DEFAULT_FAILURE_THRESHOLD;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration. All fields optional so layers merge
/// Option-by-Option; effective values come from the accessors below.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,
    pub server: Option<ServerConfig>,
    pub display: Option<DisplayConfig>,
    pub crash: Option<CrashConfig>,
    pub supervisor: Option<SupervisorConfig>,
    pub fetch: Option<FetchConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    /// Listen address, e.g. "0.0.0.0:8080"
    pub bind: Option<String>,
    /// Shared secret required in the X-Trixel-Key header; open access
    /// when unset.
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub driver: Option<DriverKind>,
    /// Device node for the fbdev driver, e.g. "/dev/fb0"
    pub device: Option<PathBuf>,
    pub brightness: Option<u8>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Fbdev,
    Mock,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CrashConfig {
    pub log_file: Option<PathBuf>,
    pub counter_file: Option<PathBuf>,
    pub ring_capacity: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SupervisorConfig {
    /// Consecutive failed service cycles before a recovery attempt.
    pub failure_threshold: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FetchConfig {
    pub timeout_secs: Option<u64>,
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone)]
#[command(name = "trixel", about = "HTTP-fed frame server for pixel-matrix displays")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// Shorthand for --log-level debug
    #[arg(short = 'v', long, action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long)]
    pub bind: Option<String>,
    #[arg(long)]
    pub api_key: Option<String>,
    #[arg(long)]
    pub display_width: Option<u32>,
    #[arg(long)]
    pub display_height: Option<u32>,
    #[arg(long, value_enum)]
    pub display_driver: Option<CliDriverKind>,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub display_device: Option<PathBuf>,
    /// Dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliDriverKind {
    Fbdev,
    Mock,
}

impl From<CliDriverKind> for DriverKind {
    fn from(kind: CliDriverKind) -> Self {
        match kind {
            CliDriverKind::Fbdev => DriverKind::Fbdev,
            CliDriverKind::Mock => DriverKind::Mock,
        }
    }
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<Config, ConfigError> {
    let cli = Cli::parse();
    load_with(cli)
}

fn load_with(cli: Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, &cli);

    // 4) Validate
    validate(&cfg)?;

    if cli.dump_config {
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        process::exit(0);
    }

    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    if let Some(home) = home_dir() {
        let p = home.join(".config/trixel/config.yaml");
        if p.exists() {
            return Some(p);
        }
        let p = home.join(".config/trixel.yaml");
        if p.exists() {
            return Some(p);
        }
    }
    for candidate in &["trixel.yaml", "config.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return Some(p);
        }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some() {
        dst.log_level = src.log_level;
    }
    merge_group(&mut dst.server, src.server, |d, s| {
        if s.bind.is_some() {
            d.bind = s.bind;
        }
        if s.api_key.is_some() {
            d.api_key = s.api_key;
        }
    });
    merge_group(&mut dst.display, src.display, |d, s| {
        if s.width.is_some() {
            d.width = s.width;
        }
        if s.height.is_some() {
            d.height = s.height;
        }
        if s.driver.is_some() {
            d.driver = s.driver;
        }
        if s.device.is_some() {
            d.device = s.device;
        }
        if s.brightness.is_some() {
            d.brightness = s.brightness;
        }
    });
    merge_group(&mut dst.crash, src.crash, |d, s| {
        if s.log_file.is_some() {
            d.log_file = s.log_file;
        }
        if s.counter_file.is_some() {
            d.counter_file = s.counter_file;
        }
        if s.ring_capacity.is_some() {
            d.ring_capacity = s.ring_capacity;
        }
    });
    merge_group(&mut dst.supervisor, src.supervisor, |d, s| {
        if s.failure_threshold.is_some() {
            d.failure_threshold = s.failure_threshold;
        }
    });
    merge_group(&mut dst.fetch, src.fetch, |d, s| {
        if s.timeout_secs.is_some() {
            d.timeout_secs = s.timeout_secs;
        }
    });
}

fn merge_group<T>(dst: &mut Option<T>, src: Option<T>, merge_fields: impl FnOnce(&mut T, T)) {
    match (dst.as_mut(), src) {
        (None, Some(s)) => *dst = Some(s),
        (Some(d), Some(s)) => merge_fields(d, s),
        _ => {}
    }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some() {
        cfg.log_level = cli.log_level.clone();
    }
    if cli.debug {
        cfg.log_level = Some("debug".to_string());
    }

    if cli.bind.is_some() || cli.api_key.is_some() {
        let server = cfg.server.get_or_insert_with(ServerConfig::default);
        if cli.bind.is_some() {
            server.bind = cli.bind.clone();
        }
        if cli.api_key.is_some() {
            server.api_key = cli.api_key.clone();
        }
    }

    let any_display = cli.display_width.is_some()
        || cli.display_height.is_some()
        || cli.display_driver.is_some()
        || cli.display_device.is_some();
    if any_display {
        let display = cfg.display.get_or_insert_with(DisplayConfig::default);
        if cli.display_width.is_some() {
            display.width = cli.display_width;
        }
        if cli.display_height.is_some() {
            display.height = cli.display_height;
        }
        if let Some(kind) = cli.display_driver {
            display.driver = Some(kind.into());
        }
        if cli.display_device.is_some() {
            display.device = cli.display_device.clone();
        }
    }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(server) = cfg.server.as_ref() {
        if let Some(bind) = server.bind.as_ref() {
            bind.parse::<SocketAddr>().map_err(|_| {
                ConfigError::Validation(format!("server bind is not host:port: {bind}"))
            })?;
        }
    }
    if let Some(display) = cfg.display.as_ref() {
        if let (Some(w), Some(h)) = (display.width, display.height) {
            if w == 0 || h == 0 {
                return Err(ConfigError::Validation(
                    "display width/height must be > 0".into(),
                ));
            }
        }
    }
    if let Some(supervisor) = cfg.supervisor.as_ref() {
        if supervisor.failure_threshold == Some(0) {
            return Err(ConfigError::Validation(
                "supervisor failure_threshold must be >= 1".into(),
            ));
        }
    }
    if let Some(crash) = cfg.crash.as_ref() {
        if crash.ring_capacity == Some(0) {
            return Err(ConfigError::Validation(
                "crash ring_capacity must be >= 1".into(),
            ));
        }
    }
    Ok(())
}

impl Config {
    pub fn bind_addr(&self) -> SocketAddr {
        self.server
            .as_ref()
            .and_then(|s| s.bind.as_deref())
            .and_then(|b| b.parse().ok())
            .unwrap_or_else(|| "0.0.0.0:8080".parse().unwrap())
    }

    pub fn api_key(&self) -> Option<String> {
        self.server.as_ref().and_then(|s| s.api_key.clone())
    }

    pub fn effective_log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn display(&self) -> DisplayConfig {
        self.display.clone().unwrap_or_default()
    }

    pub fn crash_log_file(&self) -> PathBuf {
        self.crash
            .as_ref()
            .and_then(|c| c.log_file.clone())
            .unwrap_or_else(|| PathBuf::from("/var/lib/trixel/crash.log"))
    }

    pub fn crash_counter_file(&self) -> PathBuf {
        self.crash
            .as_ref()
            .and_then(|c| c.counter_file.clone())
            .unwrap_or_else(|| PathBuf::from("/var/lib/trixel/crash.count"))
    }

    pub fn ring_capacity(&self) -> usize {
        self.crash
            .as_ref()
            .and_then(|c| c.ring_capacity)
            .unwrap_or(DEFAULT_RING_CAPACITY)
    }

    pub fn failure_threshold(&self) -> u32 {
        self.supervisor
            .as_ref()
            .and_then(|s| s.failure_threshold)
            .unwrap_or(DEFAULT_FAILURE_THRESHOLD)
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch
            .as_ref()
            .and_then(|f| f.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_FETCH_TIMEOUT)
    }
}
