//! Wall-time parsing and formatting for scheduler directives.

use std::time::Duration;

/// Parse a duration in various formats.
///
/// Supports:
/// - D-HH:MM:SS (SLURM time limit with days)
/// - HH:MM:SS
/// - MM:SS
/// - Seconds as integer
///
/// Returns None for "UNLIMITED" or empty strings.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() || s == "UNLIMITED" || s == "-" {
        return None;
    }

    // Check for day separator (D-HH:MM:SS)
    let parts: Vec<&str> = s.split('-').collect();
    let (days, time_part) = match parts.as_slice() {
        [days, time] => (days.parse::<u64>().ok()?, *time),
        [time] => (0, *time),
        _ => return None,
    };

    let time_parts = time_part
        .split(':')
        .map(|p| p.parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .ok()?;

    // Out-of-range fields are rejected rather than wrapped
    let seconds = match time_parts.as_slice() {
        [h, m, s] => h
            .checked_mul(3600)?
            .checked_add(m.checked_mul(60)?)?
            .checked_add(*s)?,
        [m, s] => m.checked_mul(60)?.checked_add(*s)?,
        [s] => *s,
        _ => return None,
    };

    Some(Duration::from_secs(
        days.checked_mul(86400)?.checked_add(seconds)?,
    ))
}

/// Format seconds as human-readable duration (e.g., "1d 02:30:00", "01:30:00", "05:30").
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 24 {
        let days = hours / 24;
        let hours = hours % 24;
        format!("{}d {:02}:{:02}:{:02}", days, hours, mins, secs)
    } else if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}", mins, secs)
    }
}

/// Format seconds as LSF duration format (H:MM for `-W`).
pub fn format_duration_lsf(seconds: u64) -> String {
    let hours = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    format!("{}:{:02}", hours, mins)
}

/// Format seconds as SLURM duration format (D-HH:MM:SS).
pub fn format_duration_slurm(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{}-{:02}:{:02}:{:02}", days, hours, mins, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, mins, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1:00:00"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("24:00:00"), Some(Duration::from_secs(86400)));
        assert_eq!(
            parse_duration("1-00:00:00"),
            Some(Duration::from_secs(86400))
        );
        assert_eq!(parse_duration("30:00"), Some(Duration::from_secs(1800)));
        assert_eq!(parse_duration("3600"), Some(Duration::from_secs(3600)));
        assert!(parse_duration("UNLIMITED").is_none());
        assert!(parse_duration("-").is_none());
        assert!(parse_duration("ten hours").is_none());
        assert!(parse_duration("1:2:3:4").is_none());
    }

    #[test]
    fn test_parse_duration_out_of_range() {
        assert!(parse_duration("9999999999999999:00:00").is_none());
        assert!(parse_duration("999999999999999999-00:00:00").is_none());
        assert!(parse_duration("99999999999999999999").is_none());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(90), "01:30");
        assert_eq!(format_duration(5400), "01:30:00");
        assert_eq!(format_duration(25 * 3600), "1d 01:00:00");
    }

    #[test]
    fn test_format_duration_lsf() {
        assert_eq!(format_duration_lsf(86400), "24:00");
        assert_eq!(format_duration_lsf(5400), "1:30");
    }

    #[test]
    fn test_format_duration_slurm() {
        assert_eq!(format_duration_slurm(86400), "1-00:00:00");
        assert_eq!(format_duration_slurm(5400), "01:30:00");
    }
}
