//! Remote capture: the ssh session and the dump command it runs.
//!
//! The remote session is the system `ssh` binary, spawned once per run with
//! a fixed destination and the rendered dump command. Authentication is
//! whatever the local ssh configuration provides (key-based, typically);
//! this crate never handles credentials itself.

use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::str::FromStr;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// RemoteShell
// ---------------------------------------------------------------------------

/// A remote command-execution session.
///
/// `run` executes one command on the remote side and streams its stdout into
/// `out`. Implementations report spawn failures and non-zero remote exit
/// statuses as errors; what the caller does with those depends on the
/// pipeline's failure policy.
pub trait RemoteShell {
    fn run(&self, command: &str, out: &mut dyn Write) -> Result<()>;
}

/// Remote shell backed by the system `ssh` binary.
///
/// Invokes `<program> [extra_args..] <destination> <command>`, pipes the
/// child's stdout into the caller's writer, and lets stderr pass through to
/// the terminal so remote diagnostics stay visible.
pub struct SshShell {
    pub program: String,
    pub destination: String,
    pub extra_args: Vec<String>,
}

impl SshShell {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            program: "ssh".to_string(),
            destination: destination.into(),
            extra_args: Vec::new(),
        }
    }
}

impl RemoteShell for SshShell {
    fn run(&self, command: &str, out: &mut dyn Write) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.extra_args)
            .arg(&self.destination)
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Error::Spawn {
                tool: self.program.clone(),
                source: e,
            })?;

        if let Some(mut stdout) = child.stdout.take() {
            io::copy(&mut stdout, out)?;
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(Error::ChildFailed {
                tool: self.program.clone(),
                status,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Dump command
// ---------------------------------------------------------------------------

/// Register width of the dump: 16-bit words (the LTC-style register file)
/// or single bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DumpMode {
    #[default]
    Word,
    Byte,
}

impl DumpMode {
    /// The `i2cdump` mode flag.
    pub fn flag(self) -> &'static str {
        match self {
            DumpMode::Word => "w",
            DumpMode::Byte => "b",
        }
    }
}

impl FromStr for DumpMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "w" | "word" => Ok(DumpMode::Word),
            "b" | "byte" => Ok(DumpMode::Byte),
            other => Err(format!("invalid dump mode '{other}' (expected w or b)")),
        }
    }
}

/// The diagnostic read executed on the remote host.
///
/// Renders to `[sudo] i2cdump -y <bus> 0x<addr> <mode>`. The address is a
/// 7-bit SMBus slave address; 0x09 is the supercap controller this tool was
/// built around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpCommand {
    pub bus: u8,
    pub address: u8,
    pub mode: DumpMode,
    pub sudo: bool,
}

impl Default for DumpCommand {
    fn default() -> Self {
        Self {
            bus: 1,
            address: 0x09,
            mode: DumpMode::Word,
            sudo: true,
        }
    }
}

impl DumpCommand {
    /// Render the remote command line.
    pub fn render(&self) -> String {
        format!(
            "{}i2cdump -y {} 0x{:02x} {}",
            if self.sudo { "sudo " } else { "" },
            self.bus,
            self.address,
            self.mode.flag()
        )
    }
}
