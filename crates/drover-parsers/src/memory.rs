//! Memory size parsing and formatting for resource requests.

/// Parse a human memory size to megabytes.
///
/// Accepts the spellings users put in configs and on command lines:
/// - "100GB", "100G", "100 GB", "100gb"
/// - "512MB", "512M", "512"
/// - "2T", "2TB"
/// - "4096K", "4096KB"
///
/// A bare number is taken as megabytes. Returns None for empty or
/// unparsable strings.
pub fn parse_memory_mb(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() || s == "-" {
        return None;
    }

    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    let value: f64 = number.parse().ok()?;

    let unit = unit.trim().to_uppercase();
    let unit = unit.strip_suffix('B').unwrap_or(&unit);

    let mb = match unit {
        "T" => value * 1024.0 * 1024.0,
        "G" => value * 1024.0,
        "M" | "" => value,
        "K" => value / 1024.0,
        _ => return None,
    };

    Some(mb as u64)
}

/// Format megabytes for a SLURM `--mem` directive (e.g. "102400M").
pub fn format_memory_slurm(mb: u64) -> String {
    format!("{}M", mb)
}

/// Format megabytes for an LSF `-M` directive (e.g. "102400MB").
pub fn format_memory_lsf(mb: u64) -> String {
    format!("{}MB", mb)
}
