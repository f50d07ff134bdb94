use crate::format::format_bytes;
use std::fmt;
use std::path::PathBuf;

/// A whole-disk block device discovered on the system.
///
/// Populated by a [`crate::platform::Platform`] implementation.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceInfo {
    /// The system path to the device (e.g., `/dev/sda`).
    pub path: PathBuf,
    /// The kernel-provided name of the device (e.g., "sda").
    pub name: String,
    /// The total size of the device in bytes.
    pub size_bytes: u64,
    /// The vendor model string, when the kernel exposes one.
    pub model: Option<String>,
    /// Whether the kernel flags the device as removable media.
    pub removable: bool,
    /// Mount points of the device and of any of its partitions.
    pub mount_points: Vec<PathBuf>,
}

impl DeviceInfo {
    pub fn is_mounted(&self) -> bool {
        !self.mount_points.is_empty()
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mount_info = if self.is_mounted() {
            let points: Vec<String> = self
                .mount_points
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            format!("[Mounted at {}]", points.join(", "))
        } else {
            "[Not mounted]".to_string()
        };

        write!(
            f,
            "{:<15} {:>10} {:<20} {}",
            self.path.display(),
            format_bytes(self.size_bytes),
            self.model.as_deref().unwrap_or("-"),
            mount_info
        )
    }
}
