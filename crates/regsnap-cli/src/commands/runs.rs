//! `regsnap runs` — list and inspect archived runs.

use std::path::{Path, PathBuf};

use regsnap_core::archive::{self, MANIFEST_FILE, RunManifest};

use super::{stage_summary, truncate};

/// Run the runs command.
pub fn run(run_path: Option<&str>, dir: &str) {
    if let Some(path) = run_path {
        let run_dir = PathBuf::from(path);
        if !run_dir.join(MANIFEST_FILE).exists() {
            eprintln!("Not a run directory: {path}");
            eprintln!("Expected {MANIFEST_FILE} in that directory.");
            std::process::exit(1);
        }
        show_run(&run_dir);
    } else {
        list_runs(dir);
    }
}

/// List all runs under an archive root.
fn list_runs(dir: &str) {
    let root = PathBuf::from(dir);
    if !root.exists() {
        println!("No archive directory found at {dir}");
        println!("Capture a run first: regsnap run");
        return;
    }

    let entries = match std::fs::read_dir(&root) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Failed to read {dir}: {e}");
            return;
        }
    };

    let mut runs: Vec<(PathBuf, RunManifest)> = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        // Pre-manifest directories (or foreign ones) are skipped silently.
        if let Ok(manifest) = archive::read_manifest(&path) {
            runs.push((path, manifest));
        }
    }

    if runs.is_empty() {
        println!("No runs found in {dir}/");
        println!("Capture a run first: regsnap run");
        return;
    }

    // Newest first.
    runs.sort_by(|a, b| b.1.started_at.cmp(&a.1.started_at));

    println!(
        "{:<16} {:<24} {:<14} {:>5} {:<19}",
        "Run", "Endpoint", "Stages", "Files", "Started"
    );
    println!("{}", "-".repeat(82));

    for (path, manifest) in &runs {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!(
            "{:<16} {:<24} {:<14} {:>5} {:<19}",
            truncate(&name, 16),
            truncate(&manifest.endpoint, 24),
            stage_summary(
                &manifest.stages.capture,
                &manifest.stages.decode,
                &manifest.stages.archive
            ),
            manifest.files.len(),
            manifest.started_at,
        );
    }

    println!("\n{} run(s) in {dir}/", runs.len());
    println!("Run: regsnap runs <path>  for full details");
}

/// Show full manifest details for a single run.
fn show_run(run_dir: &Path) {
    let manifest = match archive::read_manifest(run_dir) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    println!("Run: {}", run_dir.display());
    println!("  ID:            {}", manifest.id);
    println!("  Endpoint:      {}", manifest.endpoint);
    println!("  Command:       {}", manifest.command);
    println!("  Started:       {}", manifest.started_at);
    println!("  Ended:         {}", manifest.ended_at);
    println!("  Capture stamp: {}", manifest.capture_stamp);
    println!("  Archive stamp: {}", manifest.archive_stamp);
    println!("  Version:       {}", manifest.regsnap_version);

    println!("\n  Stages:");
    println!("    capture  {}", manifest.stages.capture);
    println!("    decode   {}", manifest.stages.decode);
    println!("    archive  {}", manifest.stages.archive);

    if manifest.files.is_empty() {
        println!("\n  No files archived.");
    } else {
        println!("\n  Files:");
        for file in &manifest.files {
            println!(
                "    {:<40} {:>8} bytes  sha256:{}",
                file.name,
                file.size,
                &file.sha256[..16.min(file.sha256.len())]
            );
        }
    }

    println!();
}
