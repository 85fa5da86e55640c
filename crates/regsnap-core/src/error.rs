//! Error types for the regsnap pipeline.

use std::path::PathBuf;
use std::process::ExitStatus;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong in a regsnap run.
///
/// Child-process variants carry the tool name so a best-effort run's log
/// makes clear which external collaborator (ssh, interpreter) failed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Semantic configuration problem (bad address, empty host, ...).
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML.
    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// An external tool could not be spawned at all.
    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// An external tool ran but exited unsuccessfully.
    #[error("{tool} failed: {status}")]
    ChildFailed { tool: String, status: ExitStatus },

    /// Filesystem failure inside a named pipeline stage.
    #[error("{stage} stage failed on {path}: {source}")]
    Stage {
        stage: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A register listing line that is not `0xNN: XXXX` shaped.
    #[error("invalid register listing at line {line}: {content:?}")]
    ListingParse { line: usize, content: String },

    /// Lookup of a command code the listing does not contain.
    #[error("no register at command code 0x{code:02X}")]
    RegisterMissing { code: u8 },

    /// The register exists but its word token is not 16-bit hex
    /// (an `XXXX` placeholder from an unreadable register, typically).
    #[error("register 0x{code:02X} is unreadable: {token:?}")]
    RegisterUnreadable { code: u8, token: String },

    /// Uncategorized I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest (de)serialization failure.
    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a semantic configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}
