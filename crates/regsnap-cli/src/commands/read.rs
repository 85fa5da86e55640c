//! `regsnap read` — look up one register word in a listing.

use std::fs;

use regsnap_core::RegisterMap;

/// Run the read command.
pub fn run(listing_path: &str, register: &str) {
    let code = match super::parse_hex_or_decimal(register) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let text = match fs::read_to_string(listing_path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error reading {listing_path}: {e}");
            std::process::exit(1);
        }
    };

    let map = match RegisterMap::parse(&text) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    match map.word(code) {
        Ok(word) => println!("0x{code:02X}: 0x{word:04X} ({word})"),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
