//! `regsnap convert` — reformat raw i2cdump output into a register listing.

use std::fs;

/// Run the convert command.
pub fn run(raw_path: &str, output: Option<&str>) {
    let raw = match fs::read_to_string(raw_path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error reading {raw_path}: {e}");
            std::process::exit(1);
        }
    };

    let listing = regsnap_core::convert(&raw);

    match output {
        Some(path) => {
            if let Err(e) = fs::write(path, &listing) {
                eprintln!("Error writing {path}: {e}");
                std::process::exit(1);
            }
            println!("Wrote {} registers to {path}", listing.lines().count());
        }
        None => print!("{listing}"),
    }
}
