//! Shared parsing utilities for batch scheduler interaction.
//!
//! This crate provides the command runner and text helpers used by both
//! drover-slurm and drover-lsf.

pub mod command;
pub mod memory;
pub mod time;

use std::collections::HashMap;

pub use command::{CommandError, CommandOutput, capture_command, run_command};
pub use memory::{format_memory_lsf, format_memory_slurm, parse_memory_mb};
pub use time::{format_duration, format_duration_lsf, format_duration_slurm, parse_duration};

/// Filter helper for optional string fields.
/// Returns None if the string is empty or a placeholder value.
pub fn non_empty_string(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty()
        || trimmed == "-"
        || trimmed == "N/A"
        || trimmed == "Unknown"
        || trimmed == "(null)"
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Split whitespace-delimited `key=value` records into a map.
///
/// Values keep everything after the first `=`, so `TRES=cpu=1,mem=4G`
/// yields `TRES -> cpu=1,mem=4G`. Tokens without `=` are skipped.
pub fn split_key_values(text: &str) -> HashMap<String, String> {
    text.split_whitespace()
        .filter_map(|token| token.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Split a pipe-delimited line into exactly `count` fields.
///
/// The last field keeps any further pipes, so a trailing free-text column
/// such as an LSF `done(1) || done(2)` expression stays whole.
pub fn split_delimited(line: &str, count: usize) -> Result<Vec<&str>, String> {
    let fields: Vec<&str> = line.splitn(count, '|').collect();
    if fields.len() < count {
        return Err(format!(
            "Expected {} fields, got {}: {}",
            count,
            fields.len(),
            line
        ));
    }
    Ok(fields)
}
