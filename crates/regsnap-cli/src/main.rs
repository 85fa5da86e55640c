//! CLI for regsnap — capture, decode, and archive remote I²C register dumps.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "regsnap")]
#[command(about = "regsnap — capture, decode, and archive remote I2C register dumps")]
#[command(version = regsnap_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: remote capture, decode, archive
    Run {
        /// Path to a config file (default: regsnap.toml in the workdir, if present)
        #[arg(long)]
        config: Option<String>,

        /// ssh destination, e.g. root@192.168.1.10
        #[arg(long)]
        host: Option<String>,

        /// I2C bus number
        #[arg(long)]
        bus: Option<u8>,

        /// 7-bit slave address (0xNN or decimal)
        #[arg(long)]
        address: Option<String>,

        /// Dump mode: w (16-bit words) or b (bytes)
        #[arg(long, value_parser = ["w", "b"])]
        mode: Option<String>,

        /// Run the remote dump without sudo
        #[arg(long)]
        no_sudo: bool,

        /// Decode interpreter (default: python3)
        #[arg(long)]
        interpreter: Option<String>,

        /// Decode script path (default: describe.py)
        #[arg(long)]
        script: Option<String>,

        /// Working directory for capture/description files
        #[arg(long)]
        workdir: Option<String>,

        /// Archive root directory (default: dumps)
        #[arg(long)]
        archive_root: Option<String>,

        /// Abort on the first stage failure instead of continuing
        #[arg(long)]
        strict: bool,

        /// Sweep every workdir *.txt into the archive (legacy behavior)
        #[arg(long)]
        sweep: bool,
    },

    /// Convert raw word-mode i2cdump output into a 0xNN: XXXX register listing
    Convert {
        /// Raw dump file
        raw: String,

        /// Write the listing here instead of stdout
        #[arg(long)]
        output: Option<String>,
    },

    /// Read one 16-bit register word out of a register listing
    Read {
        /// Register listing file (0xNN: XXXX lines)
        listing: String,

        /// Command code, 0xNN or decimal
        register: String,
    },

    /// List or inspect archived runs
    Runs {
        /// Path to a specific run directory to inspect
        run: Option<String>,

        /// Archive root containing run directories
        #[arg(long, default_value = "dumps")]
        dir: String,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            host,
            bus,
            address,
            mode,
            no_sudo,
            interpreter,
            script,
            workdir,
            archive_root,
            strict,
            sweep,
        } => commands::run::run(commands::run::RunCommandConfig {
            config_path: config.as_deref(),
            host: host.as_deref(),
            bus,
            address: address.as_deref(),
            mode: mode.as_deref(),
            no_sudo,
            interpreter: interpreter.as_deref(),
            script: script.as_deref(),
            workdir: workdir.as_deref(),
            archive_root: archive_root.as_deref(),
            strict,
            sweep,
        }),
        Commands::Convert { raw, output } => commands::convert::run(&raw, output.as_deref()),
        Commands::Read { listing, register } => commands::read::run(&listing, &register),
        Commands::Runs { run, dir } => commands::runs::run(run.as_deref(), &dir),
    }
}
