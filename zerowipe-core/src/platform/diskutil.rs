//! Parsers for the text printed by macOS `diskutil` and `mount`.
use std::path::PathBuf;

/// Fields of `diskutil info <disk>` used for listing and safety checks.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct DiskInfo {
    pub size_bytes: Option<u64>,
    pub model: Option<String>,
    pub removable: bool,
    /// Any "System Disk" or boot line answered Yes/true.
    pub system: bool,
}

/// Whole-disk names (`disk0`, `disk4`) from `diskutil list`.
pub(crate) fn parse_disk_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.strip_prefix("/dev/"))
        .filter_map(|rest| rest.split_whitespace().next())
        .map(|name| name.trim_end_matches(':').to_string())
        .filter(|name| name.starts_with("disk"))
        .collect()
}

pub(crate) fn parse_info(output: &str) -> DiskInfo {
    let mut info = DiskInfo::default();

    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        let lower = key.to_ascii_lowercase();

        match key {
            "Disk Size" => info.size_bytes = parse_exact_bytes(value),
            "Device / Media Name" if !value.is_empty() => info.model = Some(value.to_string()),
            "Removable Media" => info.removable = value != "Fixed" && value != "No",
            _ => {}
        }

        if (lower.contains("system disk") || lower.contains("boot"))
            && (value.contains("Yes") || value.contains("true"))
        {
            info.system = true;
        }
    }

    info
}

/// `500.3 GB (500277790720 Bytes) (exactly ...)` -> 500277790720
fn parse_exact_bytes(value: &str) -> Option<u64> {
    let (_, rest) = value.split_once('(')?;
    let (number, _) = rest.split_once(" Bytes")?;
    number.trim().parse().ok()
}

/// `(source, mount point)` pairs from `mount` output such as
/// `/dev/disk3s1s1 on / (apfs, sealed, local, read-only, journaled)`.
pub(crate) fn parse_mounts(output: &str) -> Vec<(String, PathBuf)> {
    output
        .lines()
        .filter_map(|line| {
            let (source, rest) = line.split_once(" on ")?;
            let mount_point = rest.rsplit_once(" (").map_or(rest, |(mp, _)| mp);
            Some((source.to_string(), PathBuf::from(mount_point)))
        })
        .collect()
}

/// Whether a `/dev/diskNsM` source belongs to disk `name`.
pub(crate) fn source_belongs_to(source: &str, name: &str) -> bool {
    let source = source.strip_prefix("/dev/").unwrap_or(source);
    match source.strip_prefix(name) {
        Some("") => true,
        Some(rest) => rest.starts_with('s') && rest[1..].starts_with(|c: char| c.is_ascii_digit()),
        None => false,
    }
}
