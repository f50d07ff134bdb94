//! Provides platform-specific functionality.
//!
//! Everything the wipe needs from the operating system, other than the write
//! loop itself, sits behind the [`Platform`] trait: listing disks, refusing
//! the system disk, unmounting, opening the raw device and asking its size.
//! The engine in [`crate::wipe`] only ever sees the opened handle and the
//! size, never the discovery or unmount logic.
//!
//! [`NativePlatform`] resolves, via `#[cfg]`, to the implementation for the
//! target OS. Targets without one get a platform whose every query fails.
use crate::device::DeviceInfo;
use anyhow::{Result, bail};
use std::fs::File;
use std::path::{Path, PathBuf};

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use self::linux::LinuxPlatform as NativePlatform;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
pub use self::macos::MacosPlatform as NativePlatform;

#[cfg(any(target_os = "macos", test))]
mod diskutil;

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
mod unsupported;
#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub use self::unsupported::UnsupportedPlatform as NativePlatform;

/// OS capabilities used around a wipe.
pub trait Platform {
    /// Lists whole-disk block devices.
    fn list_devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Whether the device, or one of its partitions, holds the root filesystem.
    fn is_system_device(&self, path: &Path) -> Result<bool>;

    /// Unmounts every filesystem mounted from the device or its partitions.
    fn unmount(&self, path: &Path) -> Result<()>;

    /// Opens the device for synchronous, write-only access at offset 0.
    fn open_device(&self, path: &Path) -> Result<File>;

    /// Size in bytes of an opened device (or regular file).
    fn device_size(&self, file: &File) -> Result<u64>;

    /// Refuses paths that do not exist, are not devices, or hold the system.
    fn verify_device(&self, path: &Path) -> Result<()> {
        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(_) => bail!("Disk {} does not exist", path.display()),
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            let ft = metadata.file_type();
            if !ft.is_block_device() && !ft.is_char_device() {
                bail!("{} is not a disk device", path.display());
            }
        }
        #[cfg(not(unix))]
        let _ = metadata;

        if self.is_system_device(path)? {
            bail!("Cannot erase system disk {}", path.display());
        }

        Ok(())
    }
}

/// Expands a bare device name (`sda`, `disk2`, `rdisk2`) into its `/dev` path.
pub fn resolve_device_path(input: &str) -> PathBuf {
    let input = input.trim();
    if input.starts_with("/dev/") {
        PathBuf::from(input)
    } else {
        Path::new("/dev").join(input)
    }
}

/// The name a user types to confirm a wipe: the last path component, with
/// the `r` of a macOS raw node dropped (`/dev/rdisk2` -> `disk2`).
pub fn device_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
    match name.strip_prefix('r') {
        Some(rest) if rest.starts_with("disk") => rest.to_string(),
        _ => name,
    }
}

/// The unbuffered character node for a macOS disk (`/dev/disk2` ->
/// `/dev/rdisk2`). Paths that are not `diskN` nodes come back unchanged.
pub fn raw_device_path(path: &Path) -> PathBuf {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) if name.starts_with("disk") => path.with_file_name(format!("r{name}")),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_names_are_placed_under_dev() {
        assert_eq!(resolve_device_path("sda"), PathBuf::from("/dev/sda"));
        assert_eq!(resolve_device_path(" nvme0n1\n"), PathBuf::from("/dev/nvme0n1"));
        assert_eq!(resolve_device_path("/dev/sdb"), PathBuf::from("/dev/sdb"));
    }

    #[test]
    fn raw_disk_names_are_resolved_and_confirmed_without_prefix() {
        assert_eq!(resolve_device_path("rdisk2"), PathBuf::from("/dev/rdisk2"));
        assert_eq!(resolve_device_path("disk2"), PathBuf::from("/dev/disk2"));
        assert_eq!(device_name(Path::new("/dev/rdisk2")), "disk2");
        assert_eq!(device_name(Path::new("/dev/disk2")), "disk2");
        // Only the raw-node prefix is dropped.
        assert_eq!(device_name(Path::new("/dev/ram0")), "ram0");
    }

    #[test]
    fn raw_path_only_rewrites_disk_nodes() {
        assert_eq!(raw_device_path(Path::new("/dev/disk4")), PathBuf::from("/dev/rdisk4"));
        assert_eq!(raw_device_path(Path::new("/dev/rdisk4")), PathBuf::from("/dev/rdisk4"));
        assert_eq!(raw_device_path(Path::new("/dev/sda")), PathBuf::from("/dev/sda"));
    }

    #[test]
    fn device_name_is_last_component() {
        assert_eq!(device_name(Path::new("/dev/sdc")), "sdc");
        assert_eq!(device_name(Path::new("mmcblk0")), "mmcblk0");
    }

    struct NoSystemDisk;

    impl Platform for NoSystemDisk {
        fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
            Ok(vec![])
        }
        fn is_system_device(&self, _path: &Path) -> Result<bool> {
            Ok(false)
        }
        fn unmount(&self, _path: &Path) -> Result<()> {
            Ok(())
        }
        fn open_device(&self, path: &Path) -> Result<File> {
            Ok(File::open(path)?)
        }
        fn device_size(&self, file: &File) -> Result<u64> {
            Ok(file.metadata()?.len())
        }
    }

    #[test]
    fn verify_rejects_missing_paths() {
        let err = NoSystemDisk
            .verify_device(Path::new("/dev/definitely-not-a-disk"))
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[cfg(unix)]
    #[test]
    fn verify_rejects_regular_files() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = NoSystemDisk.verify_device(file.path()).unwrap_err();
        assert!(err.to_string().contains("is not a disk device"));
    }
}
