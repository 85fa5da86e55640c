pub mod convert;
pub mod read;
pub mod run;
pub mod runs;

/// Parse a command code or slave address: `0xNN` or decimal.
pub fn parse_hex_or_decimal(s: &str) -> Result<u8, String> {
    let t = s.trim();
    let parsed = if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16)
    } else {
        t.parse::<u8>()
    };
    parsed.map_err(|_| format!("invalid value '{s}' (expected 0xNN or decimal 0-255)"))
}

/// Truncate a string to at most `max` characters for table display.
/// Cuts on char boundaries, so multibyte endpoints and directory names
/// are safe.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut t: String = s.chars().take(max.saturating_sub(1)).collect();
        t.push('…');
        t
    }
}

/// Short `ok/ok/ok`-style stage summary for the runs table.
pub fn stage_summary(capture: &str, decode: &str, archive: &str) -> String {
    let short = |outcome: &str| if outcome == "ok" { "ok" } else { "FAIL" };
    format!("{}/{}/{}", short(capture), short(decode), short(archive))
}
