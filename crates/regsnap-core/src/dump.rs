//! Raw dump conversion and register word lookup.
//!
//! `i2cdump` word-mode output interleaves row addresses and column headers
//! with the register words. [`convert`] reduces it to a canonical listing —
//! one `0xNN: XXXX` line per register, command codes assigned sequentially
//! in reading order — and [`RegisterMap`] parses such a listing back for
//! by-code lookups.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::error::{Error, Result};

/// Convert raw word-mode `i2cdump` output into a register listing.
///
/// Every whitespace-separated token of exactly four characters is one
/// register word; everything else (row addresses like `00:`, column headers
/// like `0,8`) is skipped. Word tokens are uppercased, including the `XXXX`
/// placeholder `i2cdump` prints for unreadable registers.
pub fn convert(raw: &str) -> String {
    let mut out = String::new();
    let mut count = 0usize;
    for line in raw.lines() {
        for word in line.split_whitespace() {
            if word.len() == 4 {
                let _ = writeln!(out, "0x{:02X}: {}", count, word.to_uppercase());
                count += 1;
            }
        }
    }
    out
}

/// A parsed register listing: command code → word token.
///
/// Tokens are kept as text and only parsed to `u16` at lookup time, so a
/// listing containing `XXXX` placeholders loads fine and fails only when
/// that specific register is read.
#[derive(Debug, Clone, Default)]
pub struct RegisterMap {
    words: BTreeMap<u8, String>,
}

impl RegisterMap {
    /// Parse a `0xNN: XXXX`-style listing. Blank lines are tolerated;
    /// codes are case-insensitive; a later line for the same code wins.
    pub fn parse(listing: &str) -> Result<Self> {
        let mut words = BTreeMap::new();
        for (idx, raw_line) in listing.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (Some(code_token), Some(word_token)) = (parts.next(), parts.next()) else {
                return Err(Error::ListingParse {
                    line: idx + 1,
                    content: line.to_string(),
                });
            };

            let digits = code_token
                .trim_end_matches(':')
                .trim_start_matches("0x")
                .trim_start_matches("0X");
            let code = u8::from_str_radix(digits, 16).map_err(|_| Error::ListingParse {
                line: idx + 1,
                content: line.to_string(),
            })?;

            words.insert(code, word_token.to_string());
        }
        Ok(Self { words })
    }

    /// Read the 16-bit word at a command code.
    pub fn word(&self, command_code: u8) -> Result<u16> {
        let token = self
            .words
            .get(&command_code)
            .ok_or(Error::RegisterMissing { code: command_code })?;
        u16::from_str_radix(token, 16).map_err(|_| Error::RegisterUnreadable {
            code: command_code,
            token: token.clone(),
        })
    }

    /// Number of registers in the listing.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Command codes present, in ascending order.
    pub fn codes(&self) -> impl Iterator<Item = u8> + '_ {
        self.words.keys().copied()
    }
}
