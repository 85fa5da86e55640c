//! Archive stage primitives: the timestamped directory, file moves, and the
//! `run.json` manifest.
//!
//! Each archived run directory contains the files moved out of the working
//! directory plus a manifest recording the run's identity, the command that
//! produced it, per-stage outcomes, and a SHA-256 digest of every file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Manifest file name inside an archive directory.
pub const MANIFEST_FILE: &str = "run.json";

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Which files the archive stage moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchivePolicy {
    /// Move exactly the capture and description files this run produced.
    #[default]
    Explicit,
    /// Additionally sweep every `*.txt` directly inside the working
    /// directory, unrelated files included. This reproduces the original
    /// shell behavior and its known indiscriminate-sweep defect.
    Sweep,
}

// ---------------------------------------------------------------------------
// Manifest (run.json)
// ---------------------------------------------------------------------------

/// Per-stage outcome strings: `"ok"` or the failure message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcomes {
    pub capture: String,
    pub decode: String,
    pub archive: String,
}

/// One archived file: name, size, content digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedFile {
    pub name: String,
    pub size: u64,
    pub sha256: String,
}

/// Run metadata written to `run.json` after the moves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub version: u32,
    pub id: String,
    pub endpoint: String,
    pub command: String,
    pub capture_stamp: String,
    pub archive_stamp: String,
    pub started_at: String,
    pub ended_at: String,
    pub stages: StageOutcomes,
    pub files: Vec<ArchivedFile>,
    pub regsnap_version: String,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Create (or reuse) the archive directory `<root>/<stamp>/`.
///
/// `create_dir_all` means a same-second collision reuses the directory;
/// stamps carry no uniqueness guarantee.
pub fn create_archive_dir(root: &Path, stamp: &str) -> Result<PathBuf> {
    let dir = root.join(stamp);
    fs::create_dir_all(&dir).map_err(|e| Error::Stage {
        stage: "archive",
        path: dir.clone(),
        source: e,
    })?;
    Ok(dir)
}

/// All `*.txt` files directly inside the working directory, sorted by name.
pub fn sweep_candidates(workdir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(workdir).map_err(|e| Error::Stage {
        stage: "archive",
        path: workdir.to_path_buf(),
        source: e,
    })?;

    let mut out = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

/// Move a file into the archive directory, returning its new path.
///
/// Renames when the archive root is on the same filesystem; falls back to
/// copy-then-remove across devices.
pub fn move_into(dir: &Path, file: &Path) -> Result<PathBuf> {
    let name = file.file_name().ok_or_else(|| Error::Stage {
        stage: "archive",
        path: file.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
    })?;
    let dest = dir.join(name);

    if fs::rename(file, &dest).is_err() {
        fs::copy(file, &dest).map_err(|e| Error::Stage {
            stage: "archive",
            path: dest.clone(),
            source: e,
        })?;
        fs::remove_file(file).map_err(|e| Error::Stage {
            stage: "archive",
            path: file.to_path_buf(),
            source: e,
        })?;
    }
    Ok(dest)
}

/// Build the manifest entry for an archived file.
pub fn describe_file(path: &Path) -> Result<ArchivedFile> {
    let bytes = fs::read(path).map_err(|e| Error::Stage {
        stage: "archive",
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(ArchivedFile {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        size: bytes.len() as u64,
        sha256: sha256_hex(&bytes),
    })
}

/// Write `run.json` into an archive directory.
pub fn write_manifest(dir: &Path, manifest: &RunManifest) -> Result<()> {
    let json = serde_json::to_string_pretty(manifest)?;
    fs::write(dir.join(MANIFEST_FILE), json).map_err(|e| Error::Stage {
        stage: "archive",
        path: dir.join(MANIFEST_FILE),
        source: e,
    })
}

/// Read `run.json` back from an archive directory.
pub fn read_manifest(dir: &Path) -> Result<RunManifest> {
    let path = dir.join(MANIFEST_FILE);
    let text = fs::read_to_string(&path).map_err(|e| Error::Stage {
        stage: "archive",
        path,
        source: e,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// SHA-256 of a byte slice as lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let digest = Sha256::digest(bytes);
    let mut s = String::with_capacity(64);
    for b in digest {
        let _ = write!(s, "{b:02x}");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest_fixture() -> RunManifest {
        RunManifest {
            version: 1,
            id: "test-id".to_string(),
            endpoint: "root@192.168.1.10".to_string(),
            command: "sudo i2cdump -y 1 0x09 w".to_string(),
            capture_stamp: "233-14-05-09".to_string(),
            archive_stamp: "233-14-05-10".to_string(),
            started_at: "2021-08-21T14:05:09".to_string(),
            ended_at: "2021-08-21T14:05:10".to_string(),
            stages: StageOutcomes {
                capture: "ok".to_string(),
                decode: "ok".to_string(),
                archive: "ok".to_string(),
            },
            files: vec![ArchivedFile {
                name: "233-14-05-09.txt".to_string(),
                size: 12,
                sha256: sha256_hex(b"DE AD BE EF\n"),
            }],
            regsnap_version: crate::VERSION.to_string(),
        }
    }

    #[test]
    fn create_archive_dir_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("dumps");
        let a = create_archive_dir(&root, "233-14-05-10").unwrap();
        let b = create_archive_dir(&root, "233-14-05-10").unwrap();
        assert_eq!(a, b);
        assert!(a.is_dir());
    }

    #[test]
    fn sweep_candidates_matches_only_loose_txt_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("old.txt"), "stray").unwrap();
        fs::write(tmp.path().join("233-14-05-09.txt"), "dump").unwrap();
        fs::write(tmp.path().join("notes.md"), "skip me").unwrap();
        fs::create_dir(tmp.path().join("nested.txt")).unwrap();

        let names: Vec<String> = sweep_candidates(tmp.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["233-14-05-09.txt", "old.txt"]);
    }

    #[test]
    fn move_into_relocates_the_file() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("cap.txt");
        fs::write(&src, "payload").unwrap();
        let dir = create_archive_dir(tmp.path(), "233-14-05-10").unwrap();

        let dest = move_into(&dir, &src).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(dest).unwrap(), "payload");
    }

    #[test]
    fn describe_file_digests_content() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cap.txt");
        fs::write(&path, "DE AD BE EF\n").unwrap();

        let entry = describe_file(&path).unwrap();
        assert_eq!(entry.name, "cap.txt");
        assert_eq!(entry.size, 12);
        assert_eq!(entry.sha256, sha256_hex(b"DE AD BE EF\n"));
    }

    #[test]
    fn manifest_roundtrips_through_run_json() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = manifest_fixture();
        write_manifest(tmp.path(), &manifest).unwrap();

        let parsed = read_manifest(tmp.path()).unwrap();
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.id, "test-id");
        assert_eq!(parsed.capture_stamp, "233-14-05-09");
        assert_eq!(parsed.stages.capture, "ok");
        assert_eq!(parsed.files.len(), 1);
        assert_eq!(parsed.files[0].sha256, manifest.files[0].sha256);
    }

    #[test]
    fn read_manifest_missing_file_is_stage_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = read_manifest(tmp.path()).unwrap_err();
        assert!(matches!(err, Error::Stage { stage: "archive", .. }));
    }

    #[test]
    fn sha256_hex_known_vector() {
        // SHA-256 of the empty string.
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
