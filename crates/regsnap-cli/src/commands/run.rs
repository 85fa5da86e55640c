//! `regsnap run` — the full capture/decode/archive pipeline.

use std::path::PathBuf;

use regsnap_core::{
    Config, FailureMode, Pipeline, RunOptions, ScriptDecoder, SshShell, SystemClock,
};

/// Flag overrides gathered from the command line. `None` keeps the config
/// file (or default) value.
pub struct RunCommandConfig<'a> {
    pub config_path: Option<&'a str>,
    pub host: Option<&'a str>,
    pub bus: Option<u8>,
    pub address: Option<&'a str>,
    pub mode: Option<&'a str>,
    pub no_sudo: bool,
    pub interpreter: Option<&'a str>,
    pub script: Option<&'a str>,
    pub workdir: Option<&'a str>,
    pub archive_root: Option<&'a str>,
    pub strict: bool,
    pub sweep: bool,
}

/// Apply CLI flag overrides on top of a loaded config. A present flag
/// beats the file value; an absent one leaves it alone.
fn apply_overrides(config: &mut Config, cmd: &RunCommandConfig) -> Result<(), String> {
    if let Some(workdir) = cmd.workdir {
        config.run.workdir = PathBuf::from(workdir);
    }
    if let Some(host) = cmd.host {
        config.remote.host = host.to_string();
    }
    if let Some(bus) = cmd.bus {
        config.bus.bus = bus;
    }
    if let Some(address) = cmd.address {
        config.bus.address = super::parse_hex_or_decimal(address)?;
    }
    if let Some(mode) = cmd.mode {
        config.bus.mode = mode.to_string();
    }
    if cmd.no_sudo {
        config.remote.sudo = false;
    }
    if let Some(interpreter) = cmd.interpreter {
        config.decode.interpreter = interpreter.to_string();
    }
    if let Some(script) = cmd.script {
        config.decode.script = PathBuf::from(script);
    }
    if let Some(root) = cmd.archive_root {
        config.archive.root = PathBuf::from(root);
    }
    if cmd.strict {
        config.run.strict = true;
    }
    if cmd.sweep {
        config.archive.sweep = true;
    }
    Ok(())
}

/// Run the pipeline command.
pub fn run(cmd: RunCommandConfig) {
    // The --workdir flag (or cwd) decides where regsnap.toml is looked up.
    let workdir = PathBuf::from(cmd.workdir.unwrap_or("."));

    // Config file, then flag overrides on top.
    let loaded = match cmd.config_path {
        Some(path) => Config::load(std::path::Path::new(path)),
        None => Config::load_or_default(&workdir),
    };
    let mut config = match loaded {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = apply_overrides(&mut config, &cmd) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    if let Err(e) = config.validate() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let command = match config.dump_command() {
        Ok(dump) => dump.render(),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let opts = RunOptions::new(&config, command.clone());

    println!("regsnap run");
    println!("  Remote:   {}", config.remote.host);
    println!("  Command:  {command}");
    println!("  Decode:   {} {}", config.decode.interpreter, config.decode.script.display());
    println!("  Workdir:  {}", opts.workdir.display());
    println!("  Archive:  {}", opts.archive_root.display());
    println!(
        "  Policy:   {}{}",
        if config.run.strict { "strict" } else { "best-effort" },
        if config.archive.sweep { ", sweep" } else { "" }
    );
    println!();

    let shell = SshShell {
        program: config.remote.program.clone(),
        destination: config.remote.host.clone(),
        extra_args: config.remote.args.clone(),
    };
    let decoder = ScriptDecoder::new(&config.decode.interpreter, &config.decode.script);
    let pipeline = Pipeline::new(Box::new(shell), Box::new(decoder), Box::new(SystemClock));

    match pipeline.run(&opts) {
        Ok(report) => {
            if !report.errors.is_empty() {
                for err in &report.errors {
                    eprintln!("Warning: {} stage failed: {}", err.stage, err.message);
                }
                println!();
            }

            match &report.archive_dir {
                Some(dir) if report.archive_ok() => {
                    println!("Run archived to {}", dir.display());
                    for file in &report.archived {
                        println!("  {:<40} {:>8} bytes", file.name, file.size);
                    }
                    println!("  {:<40}          manifest", "run.json");
                }
                Some(dir) => {
                    println!("Run partially archived to {}", dir.display());
                    for file in &report.archived {
                        println!("  {:<40} {:>8} bytes", file.name, file.size);
                    }
                    println!("  Some files stayed in {}", opts.workdir.display());
                }
                None => {
                    println!("Run finished without an archive directory.");
                    println!("  Capture:     {}", report.capture_path.display());
                    println!("  Description: {}", report.description_path.display());
                }
            }

            // Exit code mirrors the final (archive) stage only.
            if !report.archive_ok() {
                std::process::exit(1);
            }
        }
        Err(e) => {
            // Strict mode: first stage failure aborts the run.
            debug_assert_eq!(opts.failure_mode, FailureMode::Strict);
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
