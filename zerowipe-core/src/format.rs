//! Human-readable formatting for byte counts and durations.
//!
//! Both functions are pure: the same input always yields the same string.

const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Formats a byte count using binary (1024) scaling with one decimal place.
///
/// Scaling stops at `PB`, so very large values are shown as a large number
/// of petabytes rather than overflowing the unit table.
///
/// ```
/// assert_eq!(zerowipe_core::format::format_bytes(1536), "1.5 KB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    let mut size = bytes as f64;
    let mut unit = 0;

    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    format!("{:.1} {}", size, UNITS[unit])
}

/// Formats a duration in whole seconds using a tiered layout:
/// `45s`, `3m 12s`, `1h 2m`, `2d 5h`.
pub fn format_time(seconds: u64) -> String {
    match seconds {
        s if s < 60 => format!("{s}s"),
        s if s < 3600 => format!("{}m {}s", s / 60, s % 60),
        s if s < 86_400 => format!("{}h {}m", s / 3600, (s % 3600) / 60),
        s => format!("{}d {}h", s / 86_400, (s % 86_400) / 3600),
    }
}
