//! # regsnap-core
//!
//! Remote I²C register dump pipeline: capture, decode, archive.
//!
//! A run drives four sequential stages against a networked device:
//!
//! 1. **Timestamp** — a filename-safe `DDD-HH-MM-SS` stamp names the capture
//!    file (and, independently, the archive directory).
//! 2. **Capture** — a privileged `i2cdump` runs on the remote host over an
//!    ssh session; its stdout is streamed byte-for-byte into `<stamp>.txt`.
//! 3. **Decode** — an external interpreter script reads the capture file and
//!    its stdout becomes `description_<stamp>.txt`.
//! 4. **Archive** — a fresh timestamped directory under the archive root
//!    receives the run's files plus a `run.json` manifest.
//!
//! ## Quick Start
//!
//! ```no_run
//! use regsnap_core::{Config, Pipeline, RunOptions, ScriptDecoder, SshShell, SystemClock};
//!
//! let config = Config::default();
//! let command = config.dump_command().unwrap().render();
//!
//! let pipeline = Pipeline::new(
//!     Box::new(SshShell::new(&config.remote.host)),
//!     Box::new(ScriptDecoder::new(&config.decode.interpreter, &config.decode.script)),
//!     Box::new(SystemClock),
//! );
//!
//! let report = pipeline.run(&RunOptions::new(&config, command)).unwrap();
//! println!("archived to {:?}", report.archive_dir);
//! ```
//!
//! Every collaborator sits behind a trait ([`RemoteShell`], [`Decoder`],
//! [`Clock`]) so the pipeline runs against fakes under test. The default
//! failure policy is best-effort: a failed stage is logged and recorded in
//! the [`RunReport`], and the run continues — the same observable behavior
//! as running the equivalent shell one-liner. Strict mode aborts on the
//! first failure instead.

pub mod archive;
pub mod config;
pub mod decode;
pub mod dump;
pub mod error;
pub mod pipeline;
pub mod remote;
pub mod timestamp;

pub use archive::{ArchivePolicy, ArchivedFile, RunManifest, StageOutcomes};
pub use config::Config;
pub use decode::{Decoder, ScriptDecoder};
pub use dump::{RegisterMap, convert};
pub use error::{Error, Result};
pub use pipeline::{FailureMode, Pipeline, RunOptions, RunReport, Stage};
pub use remote::{DumpCommand, DumpMode, RemoteShell, SshShell};
pub use timestamp::{Clock, FixedClock, SystemClock, TickingClock};

/// Crate version, surfaced in the CLI and in run manifests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
