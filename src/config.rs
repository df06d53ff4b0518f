//! Gateway configuration.
//!
//! Loaded from the TOML file named by `--config`; without one every section
//! takes its defaults. `--export` overrides `[export] path`.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use serde::Deserialize;

use crate::filetable::{DeviceSpec, DeviceTable};
use crate::protocol::nfs::BootParams;

#[derive(Parser, Debug)]
#[command(name = "nfs-gateway")]
#[command(about = "NFSv2/v3 gateway exporting a host directory", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host directory to export (overrides the config file)
    #[arg(short, long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
    pub bootparam: BootparamConfig,
    /// Device nodes shown under `dev` directories; the built-in table if absent.
    pub devices: Option<Vec<DeviceSpec>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub nfs_port: u16,
    pub portmap_port: u16,
    pub flush_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub path: PathBuf,
    /// Directory path clients pass to MNT.
    pub name: String,
    pub read_only: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log filter. If not set, falls back to RUST_LOG env var, then "info"
    pub level: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BootparamConfig {
    pub client_name: String,
    pub domain_name: String,
    pub server_name: String,
    pub server_address: Ipv4Addr,
    /// Root path handed to GETFILE; the export name if unset.
    pub root_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            nfs_port: 2049,
            portmap_port: 111,
            flush_interval_secs: 5,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("."), name: "/export".to_string(), read_only: false }
    }
}

impl Default for BootparamConfig {
    fn default() -> Self {
        let params = BootParams::default();
        Self {
            client_name: params.client_name,
            domain_name: params.domain_name,
            server_name: params.server_name,
            server_address: params.server_address,
            root_path: None,
        }
    }
}

impl ServerConfig {
    /// Flush period, clamped to 1..=10 seconds.
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs.clamp(1, 10))
    }

    pub fn nfs_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.nfs_port)
    }

    pub fn portmap_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.portmap_port)
    }
}

impl ExportConfig {
    /// Export name with exactly one leading slash and no trailing one.
    pub fn mount_path(&self) -> String {
        format!("/{}", self.name.trim_matches('/'))
    }
}

impl LoggingConfig {
    /// Get log filter with fallback: config -> RUST_LOG -> "info"
    pub fn effective_level(&self) -> String {
        match self.level.as_deref() {
            Some(level) => level.to_string(),
            None => std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

impl BootparamConfig {
    pub fn to_params(&self, export_name: &str) -> BootParams {
        BootParams {
            client_name: self.client_name.clone(),
            domain_name: self.domain_name.clone(),
            server_name: self.server_name.clone(),
            server_address: self.server_address,
            root_path: self.root_path.clone().unwrap_or_else(|| export_name.to_string()),
        }
    }
}

impl Config {
    /// Load configuration from the command line and the file it names.
    pub fn load() -> anyhow::Result<Self> {
        let cli = Cli::parse();
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };
        if let Some(export) = cli.export {
            config.export.path = export;
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            anyhow::bail!("Configuration file not found: {}", path.display());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
    }

    pub fn device_table(&self) -> DeviceTable {
        match &self.devices {
            Some(devices) => DeviceTable::new(devices.clone()),
            None => DeviceTable::default(),
        }
    }
}
