//! The capture → decode → archive pipeline runner.
//!
//! Stage order is fixed: stamp, capture, decode, stamp, archive. The two
//! stamps come from two independent clock reads, so the capture file name
//! and the archive directory name can differ across a second boundary.
//!
//! Failure policy is explicit. `BestEffort` (the default) logs a failed
//! stage, records it in the [`RunReport`], and keeps going — a failed remote
//! call still leaves an (empty) capture file, the decode script still runs,
//! and the archive directory is still produced. `Strict` aborts on the first
//! stage failure.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::archive::{self, ArchivePolicy, ArchivedFile, RunManifest, StageOutcomes};
use crate::config::Config;
use crate::decode::Decoder;
use crate::error::{Error, Result};
use crate::remote::RemoteShell;
use crate::timestamp::{self, Clock};

// ---------------------------------------------------------------------------
// Options and report
// ---------------------------------------------------------------------------

/// What to do when a stage fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Log, record, continue. Matches the original tool's behavior.
    #[default]
    BestEffort,
    /// Abort the run on the first stage failure.
    Strict,
}

/// Pipeline stage names, used in reports and manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Capture,
    Decode,
    Archive,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Capture => write!(f, "capture"),
            Stage::Decode => write!(f, "decode"),
            Stage::Archive => write!(f, "archive"),
        }
    }
}

/// A stage failure recorded during a best-effort run.
#[derive(Debug, Clone)]
pub struct StageError {
    pub stage: Stage,
    pub message: String,
}

/// Everything a single run needs, threaded in explicitly so nothing reads
/// ambient process state.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub workdir: PathBuf,
    pub archive_root: PathBuf,
    /// Remote endpoint, recorded in the manifest.
    pub endpoint: String,
    /// Rendered remote command line.
    pub command: String,
    pub failure_mode: FailureMode,
    pub archive_policy: ArchivePolicy,
}

impl RunOptions {
    /// Build run options from a [`Config`] and a rendered dump command.
    ///
    /// A relative archive root is anchored at the working directory, the
    /// way the original tool's `dumps/` sat inside its cwd.
    pub fn new(config: &Config, command: String) -> Self {
        let workdir = config.run.workdir.clone();
        let archive_root = if config.archive.root.is_absolute() {
            config.archive.root.clone()
        } else {
            workdir.join(&config.archive.root)
        };
        Self {
            workdir,
            archive_root,
            endpoint: config.remote.host.clone(),
            command,
            failure_mode: if config.run.strict {
                FailureMode::Strict
            } else {
                FailureMode::BestEffort
            },
            archive_policy: if config.archive.sweep {
                ArchivePolicy::Sweep
            } else {
                ArchivePolicy::Explicit
            },
        }
    }
}

/// Outcome of one pipeline run.
#[derive(Debug)]
pub struct RunReport {
    pub id: String,
    pub capture_stamp: String,
    pub archive_stamp: String,
    pub capture_path: PathBuf,
    pub description_path: PathBuf,
    /// `None` when the archive stage failed before creating the directory.
    pub archive_dir: Option<PathBuf>,
    pub archived: Vec<ArchivedFile>,
    /// Stage failures tolerated under best-effort. Empty on a clean run.
    pub errors: Vec<StageError>,
}

impl RunReport {
    /// Whether a stage completed without a recorded failure.
    pub fn stage_ok(&self, stage: Stage) -> bool {
        !self.errors.iter().any(|e| e.stage == stage)
    }

    /// Exit-code signal: only the final (archive) stage counts, matching
    /// the original tool whose exit code was whatever `mv` returned.
    pub fn archive_ok(&self) -> bool {
        self.stage_ok(Stage::Archive)
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// The four-stage runner with injected collaborators.
pub struct Pipeline {
    shell: Box<dyn RemoteShell>,
    decoder: Box<dyn Decoder>,
    clock: Box<dyn Clock>,
}

impl Pipeline {
    pub fn new(
        shell: Box<dyn RemoteShell>,
        decoder: Box<dyn Decoder>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            shell,
            decoder,
            clock,
        }
    }

    /// Execute one run: stamp, capture, decode, stamp, archive.
    ///
    /// Returns `Err` only in strict mode (first stage failure) — a
    /// best-effort run always returns a report, with failures listed in
    /// [`RunReport::errors`].
    pub fn run(&self, opts: &RunOptions) -> Result<RunReport> {
        let run_id = Uuid::new_v4().to_string();
        let started = self.clock.now();
        let capture_stamp = timestamp::day_stamp(started);
        let capture_name = timestamp::capture_file_name(&capture_stamp);
        let capture_path = opts.workdir.join(&capture_name);
        let description_path = opts
            .workdir
            .join(timestamp::description_file_name(&capture_name));

        let mut errors: Vec<StageError> = Vec::new();

        log::info!(
            "capture: {:?} -> {}",
            opts.command,
            capture_path.display()
        );
        if let Err(e) = self.capture(&capture_path, &opts.command) {
            note_failure(Stage::Capture, e, opts.failure_mode, &mut errors)?;
        }

        // The decode script reads the capture by path; an upstream failure
        // propagates as empty input. Diagnostics only.
        match fs::metadata(&capture_path) {
            Ok(m) if m.len() == 0 => {
                log::warn!("capture file {} is empty", capture_path.display());
            }
            Err(_) => {
                log::warn!("capture file {} is missing", capture_path.display());
            }
            _ => {}
        }

        log::info!(
            "decode: {} -> {}",
            capture_path.display(),
            description_path.display()
        );
        if let Err(e) = self.decode(&capture_path, &description_path) {
            note_failure(Stage::Decode, e, opts.failure_mode, &mut errors)?;
        }

        // Second independent stamp, taken at archive time.
        let archived_at = self.clock.now();
        let archive_stamp = timestamp::day_stamp(archived_at);

        let mut report = RunReport {
            id: run_id.clone(),
            capture_stamp: capture_stamp.clone(),
            archive_stamp: archive_stamp.clone(),
            capture_path: capture_path.clone(),
            description_path: description_path.clone(),
            archive_dir: None,
            archived: Vec::new(),
            errors: Vec::new(),
        };

        let manifest = RunManifest {
            version: 1,
            id: run_id,
            endpoint: opts.endpoint.clone(),
            command: opts.command.clone(),
            capture_stamp,
            archive_stamp: archive_stamp.clone(),
            started_at: manifest_time(started),
            ended_at: manifest_time(archived_at),
            stages: StageOutcomes {
                capture: outcome(&errors, Stage::Capture),
                decode: outcome(&errors, Stage::Decode),
                archive: "ok".to_string(),
            },
            files: Vec::new(),
            regsnap_version: crate::VERSION.to_string(),
        };

        log::info!(
            "archive: {} -> {}",
            opts.workdir.display(),
            opts.archive_root.join(&archive_stamp).display()
        );
        match archive::create_archive_dir(&opts.archive_root, &archive_stamp) {
            Ok(dir) => {
                // The directory exists from here on; a failed move later
                // leaves a partial archive, and the report says so.
                report.archive_dir = Some(dir.clone());
                match self.archive_into(&dir, opts, manifest, &capture_path, &description_path) {
                    Ok(files) => report.archived = files,
                    Err(e) => {
                        note_failure(Stage::Archive, e, opts.failure_mode, &mut errors)?;
                    }
                }
            }
            Err(e) => {
                note_failure(Stage::Archive, e, opts.failure_mode, &mut errors)?;
            }
        }

        report.errors = errors;
        Ok(report)
    }

    /// Capture stage. The file is created before the remote command runs,
    /// mirroring shell redirection: a failed session still leaves an empty
    /// capture file.
    fn capture(&self, path: &Path, command: &str) -> Result<()> {
        let file = File::create(path).map_err(|e| Error::Stage {
            stage: "capture",
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut out = BufWriter::new(file);
        self.shell.run(command, &mut out)?;
        out.flush().map_err(|e| Error::Stage {
            stage: "capture",
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }

    /// Decode stage, with the same redirection-first lifecycle.
    fn decode(&self, capture: &Path, description: &Path) -> Result<()> {
        let file = File::create(description).map_err(|e| Error::Stage {
            stage: "decode",
            path: description.to_path_buf(),
            source: e,
        })?;
        let mut out = BufWriter::new(file);
        self.decoder.describe(capture, &mut out)?;
        out.flush().map_err(|e| Error::Stage {
            stage: "decode",
            path: description.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }

    /// Move the selected files into an already-created archive directory
    /// and write the manifest.
    fn archive_into(
        &self,
        dir: &Path,
        opts: &RunOptions,
        mut manifest: RunManifest,
        capture: &Path,
        description: &Path,
    ) -> Result<Vec<ArchivedFile>> {
        let mut selected = vec![capture.to_path_buf(), description.to_path_buf()];
        if opts.archive_policy == ArchivePolicy::Sweep {
            for candidate in archive::sweep_candidates(&opts.workdir)? {
                if !selected.contains(&candidate) {
                    selected.push(candidate);
                }
            }
        }

        let mut files = Vec::new();
        for path in selected {
            if !path.exists() {
                match opts.failure_mode {
                    FailureMode::Strict => {
                        return Err(Error::Stage {
                            stage: "archive",
                            path,
                            source: std::io::Error::new(
                                std::io::ErrorKind::NotFound,
                                "file missing before archive",
                            ),
                        });
                    }
                    FailureMode::BestEffort => {
                        log::warn!("skipping missing file {}", path.display());
                        continue;
                    }
                }
            }
            let moved = archive::move_into(dir, &path)?;
            files.push(archive::describe_file(&moved)?);
        }

        manifest.files = files.clone();
        archive::write_manifest(dir, &manifest)?;
        Ok(files)
    }
}

/// Apply the failure policy to a stage error.
fn note_failure(
    stage: Stage,
    err: Error,
    mode: FailureMode,
    errors: &mut Vec<StageError>,
) -> Result<()> {
    match mode {
        FailureMode::Strict => Err(err),
        FailureMode::BestEffort => {
            log::warn!("{stage} stage failed: {err}");
            errors.push(StageError {
                stage,
                message: err.to_string(),
            });
            Ok(())
        }
    }
}

/// Manifest outcome string for a stage: `"ok"` or the failure message.
fn outcome(errors: &[StageError], stage: Stage) -> String {
    errors
        .iter()
        .find(|e| e.stage == stage)
        .map(|e| e.message.clone())
        .unwrap_or_else(|| "ok".to_string())
}

/// Wall-clock rendering used in `run.json`.
fn manifest_time(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::{FixedClock, TickingClock};
    use chrono::NaiveDate;
    use std::io;

    // -----------------------------------------------------------------------
    // Fakes
    // -----------------------------------------------------------------------

    struct CannedShell(&'static [u8]);

    impl RemoteShell for CannedShell {
        fn run(&self, _command: &str, out: &mut dyn Write) -> Result<()> {
            out.write_all(self.0)?;
            Ok(())
        }
    }

    struct FailingShell;

    impl RemoteShell for FailingShell {
        fn run(&self, _command: &str, _out: &mut dyn Write) -> Result<()> {
            Err(Error::Spawn {
                tool: "ssh".to_string(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
            })
        }
    }

    struct StubDecoder(&'static str);

    impl Decoder for StubDecoder {
        fn describe(&self, _capture: &Path, out: &mut dyn Write) -> Result<()> {
            out.write_all(self.0.as_bytes())?;
            Ok(())
        }
    }

    /// Echoes the capture file's content into the description file.
    struct EchoDecoder;

    impl Decoder for EchoDecoder {
        fn describe(&self, capture: &Path, out: &mut dyn Write) -> Result<()> {
            let bytes = fs::read(capture)?;
            out.write_all(&bytes)?;
            Ok(())
        }
    }

    struct FailingDecoder;

    impl Decoder for FailingDecoder {
        fn describe(&self, _capture: &Path, _out: &mut dyn Write) -> Result<()> {
            Err(Error::Spawn {
                tool: "python3".to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
            })
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn fixed_clock() -> Box<FixedClock> {
        Box::new(FixedClock::new(
            NaiveDate::from_ymd_opt(2021, 8, 21)
                .unwrap()
                .and_hms_opt(14, 5, 9)
                .unwrap(),
        ))
    }

    fn options(workdir: &Path) -> RunOptions {
        RunOptions {
            workdir: workdir.to_path_buf(),
            archive_root: workdir.join("dumps"),
            endpoint: "root@192.168.1.10".to_string(),
            command: "sudo i2cdump -y 1 0x09 w".to_string(),
            failure_mode: FailureMode::BestEffort,
            archive_policy: ArchivePolicy::Explicit,
        }
    }

    fn workdir_txt_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .flatten()
            .filter(|e| e.path().extension().is_some_and(|x| x == "txt"))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    // -----------------------------------------------------------------------
    // Clean run
    // -----------------------------------------------------------------------

    #[test]
    fn clean_run_produces_capture_description_and_archive() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            Box::new(CannedShell(b"DE AD BE EF\n")),
            Box::new(StubDecoder("register=0xDEADBEEF")),
            fixed_clock(),
        );

        let report = pipeline.run(&options(tmp.path())).unwrap();
        assert!(report.errors.is_empty());
        assert!(report.archive_ok());
        assert_eq!(report.capture_stamp, "233-14-05-09");
        assert_eq!(report.archive_stamp, "233-14-05-09");

        let dir = report.archive_dir.clone().unwrap();
        assert_eq!(dir, tmp.path().join("dumps").join("233-14-05-09"));
        assert_eq!(
            fs::read_to_string(dir.join("233-14-05-09.txt")).unwrap(),
            "DE AD BE EF\n"
        );
        assert_eq!(
            fs::read_to_string(dir.join("description_233-14-05-09.txt")).unwrap(),
            "register=0xDEADBEEF"
        );

        // Workdir is clean of .txt files after archival.
        assert!(workdir_txt_files(tmp.path()).is_empty());
    }

    #[test]
    fn clean_run_writes_manifest_with_digests() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            Box::new(CannedShell(b"DE AD BE EF\n")),
            Box::new(StubDecoder("register=0xDEADBEEF")),
            fixed_clock(),
        );

        let report = pipeline.run(&options(tmp.path())).unwrap();
        let dir = report.archive_dir.unwrap();
        let manifest = archive::read_manifest(&dir).unwrap();

        assert_eq!(manifest.version, 1);
        assert_eq!(manifest.id, report.id);
        assert_eq!(manifest.endpoint, "root@192.168.1.10");
        assert_eq!(manifest.command, "sudo i2cdump -y 1 0x09 w");
        assert_eq!(manifest.capture_stamp, "233-14-05-09");
        assert_eq!(manifest.started_at, "2021-08-21T14:05:09");
        assert_eq!(manifest.stages.capture, "ok");
        assert_eq!(manifest.stages.decode, "ok");
        assert_eq!(manifest.stages.archive, "ok");

        assert_eq!(manifest.files.len(), 2);
        let capture_entry = manifest
            .files
            .iter()
            .find(|f| f.name == "233-14-05-09.txt")
            .unwrap();
        assert_eq!(capture_entry.size, 12);
        assert_eq!(capture_entry.sha256, archive::sha256_hex(b"DE AD BE EF\n"));
    }

    #[test]
    fn decode_stage_sees_the_capture_by_path() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            Box::new(CannedShell(b"DE AD BE EF\n")),
            Box::new(EchoDecoder),
            fixed_clock(),
        );

        let report = pipeline.run(&options(tmp.path())).unwrap();
        let dir = report.archive_dir.unwrap();
        assert_eq!(
            fs::read_to_string(dir.join("description_233-14-05-09.txt")).unwrap(),
            "DE AD BE EF\n"
        );
    }

    // -----------------------------------------------------------------------
    // Independent stamps
    // -----------------------------------------------------------------------

    #[test]
    fn stamps_differ_when_the_run_straddles_a_second() {
        let tmp = tempfile::tempdir().unwrap();
        let clock = TickingClock::new(
            NaiveDate::from_ymd_opt(2021, 8, 21)
                .unwrap()
                .and_hms_opt(14, 5, 9)
                .unwrap(),
            1,
        );
        let pipeline = Pipeline::new(
            Box::new(CannedShell(b"data\n")),
            Box::new(StubDecoder("decoded")),
            Box::new(clock),
        );

        let report = pipeline.run(&options(tmp.path())).unwrap();
        assert_eq!(report.capture_stamp, "233-14-05-09");
        assert_eq!(report.archive_stamp, "233-14-05-10");

        // The run still archives its own files, wherever the stamps landed.
        let dir = report.archive_dir.unwrap();
        assert_eq!(dir, tmp.path().join("dumps").join("233-14-05-10"));
        assert!(dir.join("233-14-05-09.txt").exists());
        assert!(dir.join("description_233-14-05-09.txt").exists());
        assert!(workdir_txt_files(tmp.path()).is_empty());
    }

    // -----------------------------------------------------------------------
    // Archive policies
    // -----------------------------------------------------------------------

    #[test]
    fn explicit_policy_leaves_unrelated_files_alone() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("old.txt"), "stray").unwrap();

        let pipeline = Pipeline::new(
            Box::new(CannedShell(b"data\n")),
            Box::new(StubDecoder("decoded")),
            fixed_clock(),
        );
        let report = pipeline.run(&options(tmp.path())).unwrap();

        let dir = report.archive_dir.unwrap();
        assert!(!dir.join("old.txt").exists());
        assert_eq!(workdir_txt_files(tmp.path()), vec!["old.txt"]);
    }

    #[test]
    fn sweep_policy_also_moves_unrelated_txt_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("old.txt"), "stray").unwrap();

        let pipeline = Pipeline::new(
            Box::new(CannedShell(b"data\n")),
            Box::new(StubDecoder("decoded")),
            fixed_clock(),
        );
        let mut opts = options(tmp.path());
        opts.archive_policy = ArchivePolicy::Sweep;
        let report = pipeline.run(&opts).unwrap();

        let dir = report.archive_dir.unwrap();
        assert!(dir.join("old.txt").exists());
        assert!(dir.join("233-14-05-09.txt").exists());
        assert!(workdir_txt_files(tmp.path()).is_empty());
        assert_eq!(report.archived.len(), 3);
    }

    // -----------------------------------------------------------------------
    // Failure policies
    // -----------------------------------------------------------------------

    #[test]
    fn best_effort_run_survives_a_failed_remote_call() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            Box::new(FailingShell),
            Box::new(StubDecoder("decoded nothing")),
            fixed_clock(),
        );

        let report = pipeline.run(&options(tmp.path())).unwrap();
        assert!(!report.stage_ok(Stage::Capture));
        assert!(report.stage_ok(Stage::Decode));
        assert!(report.archive_ok());

        // Capture file exists but is empty; decode still ran; archive exists.
        let dir = report.archive_dir.unwrap();
        assert_eq!(fs::read(dir.join("233-14-05-09.txt")).unwrap().len(), 0);
        assert_eq!(
            fs::read_to_string(dir.join("description_233-14-05-09.txt")).unwrap(),
            "decoded nothing"
        );

        let manifest = archive::read_manifest(&dir).unwrap();
        assert!(manifest.stages.capture.contains("failed to spawn ssh"));
        assert_eq!(manifest.stages.decode, "ok");
    }

    #[test]
    fn best_effort_run_survives_a_failed_decode() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            Box::new(CannedShell(b"data\n")),
            Box::new(FailingDecoder),
            fixed_clock(),
        );

        let report = pipeline.run(&options(tmp.path())).unwrap();
        assert!(report.stage_ok(Stage::Capture));
        assert!(!report.stage_ok(Stage::Decode));
        assert!(report.archive_ok());

        // The (empty) description file was created before the decoder ran.
        let dir = report.archive_dir.unwrap();
        assert!(dir.join("description_233-14-05-09.txt").exists());
    }

    #[test]
    fn partial_archive_still_reports_the_created_directory() {
        let tmp = tempfile::tempdir().unwrap();
        // Occupy the capture file's destination with a directory so the
        // move (rename and copy fallback both) fails after the archive
        // directory was created.
        let dir = tmp.path().join("dumps").join("233-14-05-09");
        fs::create_dir_all(dir.join("233-14-05-09.txt")).unwrap();

        let pipeline = Pipeline::new(
            Box::new(CannedShell(b"data\n")),
            Box::new(StubDecoder("decoded")),
            fixed_clock(),
        );
        let report = pipeline.run(&options(tmp.path())).unwrap();

        assert!(!report.archive_ok());
        // The directory exists on disk and the report points at it.
        assert_eq!(report.archive_dir, Some(dir.clone()));
        assert!(dir.is_dir());
        // The failed move left the capture file in the workdir.
        assert!(tmp.path().join("233-14-05-09.txt").exists());
    }

    #[test]
    fn strict_run_aborts_before_decode_and_archive() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            Box::new(FailingShell),
            Box::new(StubDecoder("unreachable")),
            fixed_clock(),
        );
        let mut opts = options(tmp.path());
        opts.failure_mode = FailureMode::Strict;

        let err = pipeline.run(&opts).unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));

        // Capture file was created (redirection-first), but nothing else.
        assert!(tmp.path().join("233-14-05-09.txt").exists());
        assert!(!tmp.path().join("description_233-14-05-09.txt").exists());
        assert!(!tmp.path().join("dumps").exists());
    }

    #[test]
    fn run_options_from_config_anchor_relative_archive_root() {
        let mut config = Config::default();
        config.run.workdir = PathBuf::from("/work");
        config.archive.sweep = true;
        config.run.strict = true;

        let opts = RunOptions::new(&config, "cmd".to_string());
        assert_eq!(opts.archive_root, PathBuf::from("/work/dumps"));
        assert_eq!(opts.failure_mode, FailureMode::Strict);
        assert_eq!(opts.archive_policy, ArchivePolicy::Sweep);
        assert_eq!(opts.endpoint, "root@192.168.1.10");
    }
}
