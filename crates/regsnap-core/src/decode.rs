//! Decode stage: run the external interpreter script over a capture file.
//!
//! The script itself (the register bit-field interpreter) is an opaque
//! collaborator. This module only owns the invocation contract: one
//! positional argument — the capture file path — and stdout becomes the
//! description file.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

/// Turns a capture file into human-readable decoded text.
pub trait Decoder {
    fn describe(&self, capture: &Path, out: &mut dyn Write) -> Result<()>;
}

/// Decoder backed by an external interpreter and script, invoked as
/// `<interpreter> <script> <capture-path>`. Stderr passes through to the
/// terminal; a non-zero exit is an error.
pub struct ScriptDecoder {
    pub interpreter: String,
    pub script: PathBuf,
}

impl ScriptDecoder {
    pub fn new(interpreter: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            script: script.into(),
        }
    }
}

impl Decoder for ScriptDecoder {
    fn describe(&self, capture: &Path, out: &mut dyn Write) -> Result<()> {
        let mut child = Command::new(&self.interpreter)
            .arg(&self.script)
            .arg(capture)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Error::Spawn {
                tool: self.interpreter.clone(),
                source: e,
            })?;

        if let Some(mut stdout) = child.stdout.take() {
            io::copy(&mut stdout, out)?;
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(Error::ChildFailed {
                tool: self.interpreter.clone(),
                status,
            });
        }
        Ok(())
    }
}
