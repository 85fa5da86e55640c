//! Configuration: `regsnap.toml` sections plus defaults.
//!
//! Every field has a default, so a zero-flag `regsnap run` with no config
//! file behaves like the original fixed-target tool. A `regsnap.toml` in the
//! working directory is picked up automatically; CLI flags override file
//! values (the CLI applies those on top).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::remote::{DumpCommand, DumpMode};

/// Config file looked up in the working directory.
pub const FILE_NAME: &str = "regsnap.toml";

/// `[remote]` — the ssh session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// ssh destination, e.g. `root@192.168.1.10`.
    pub host: String,
    /// ssh program name.
    pub program: String,
    /// Extra arguments placed before the destination.
    pub args: Vec<String>,
    /// Prefix the remote dump command with `sudo`.
    pub sudo: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: "root@192.168.1.10".to_string(),
            program: "ssh".to_string(),
            args: Vec::new(),
            sudo: true,
        }
    }
}

/// `[bus]` — the I²C target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub bus: u8,
    /// 7-bit slave address.
    pub address: u8,
    /// Dump mode: `w` (16-bit words) or `b` (bytes).
    pub mode: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            bus: 1,
            address: 0x09,
            mode: "w".to_string(),
        }
    }
}

/// `[decode]` — the external interpreter script.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    pub interpreter: String,
    pub script: PathBuf,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            script: PathBuf::from("describe.py"),
        }
    }
}

/// `[archive]` — where runs land.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub root: PathBuf,
    /// Sweep every workdir `*.txt` into the archive (legacy behavior).
    pub sweep: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("dumps"),
            sweep: false,
        }
    }
}

/// `[run]` — pipeline execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub workdir: PathBuf,
    /// Abort on the first stage failure instead of continuing best-effort.
    pub strict: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("."),
            strict: false,
        }
    }
}

/// Full regsnap configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub bus: BusConfig,
    pub decode: DecodeConfig,
    pub archive: ArchiveConfig,
    pub run: RunConfig,
}

impl Config {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = toml::from_str(&text).map_err(|e| Error::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `regsnap.toml` from the working directory if present, defaults
    /// otherwise.
    pub fn load_or_default(workdir: &Path) -> Result<Config> {
        let path = workdir.join(FILE_NAME);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Config::default())
        }
    }

    /// Semantic validation of the loaded values.
    pub fn validate(&self) -> Result<()> {
        if self.remote.host.trim().is_empty() {
            return Err(Error::config("remote.host must not be empty"));
        }
        if self.bus.address >= 0x80 {
            return Err(Error::config(format!(
                "bus.address 0x{:02X} is not a 7-bit address",
                self.bus.address
            )));
        }
        self.bus
            .mode
            .parse::<DumpMode>()
            .map_err(Error::config)?;
        Ok(())
    }

    /// The remote dump command this configuration describes.
    pub fn dump_command(&self) -> Result<DumpCommand> {
        let mode = self.bus.mode.parse::<DumpMode>().map_err(Error::config)?;
        Ok(DumpCommand {
            bus: self.bus.bus,
            address: self.bus.address,
            mode,
            sudo: self.remote.sudo,
        })
    }
}
