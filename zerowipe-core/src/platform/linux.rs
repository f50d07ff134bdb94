use super::Platform;
use crate::device::DeviceInfo;
use anyhow::{Context, Result, anyhow};
use log::{debug, warn};
use nix::ioctl_read;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

ioctl_read!(blkgetsize64, 0x12, 114, u64);

/// Kernel device-name prefixes that are never physical disks.
const VIRTUAL_PREFIXES: [&str; 3] = ["loop", "ram", "zram"];

/// Discovers disks through `/sys/block` and mount state through `sysinfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxPlatform;

/// Helper to read a specific file from the /sys/block filesystem.
fn read_sys_file(device_name: &str, file: &str) -> io::Result<String> {
    let path = PathBuf::from("/sys/block").join(device_name).join(file);
    fs::read_to_string(path).map(|s| s.trim().to_string())
}

/// The disk itself plus its partitions, as kernel names
/// (e.g. `sda`, `sda1`, `sda2` or `nvme0n1`, `nvme0n1p1`).
///
/// Partitions appear as subdirectories of `/sys/block/<disk>` whose names
/// extend the disk's name. A partition path given directly yields just itself.
fn member_names(device_name: &str) -> Vec<String> {
    let mut names = vec![device_name.to_string()];
    if let Ok(entries) = fs::read_dir(PathBuf::from("/sys/block").join(device_name)) {
        names.extend(
            entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .filter(|n| n.len() > device_name.len() && n.starts_with(device_name)),
        );
    }
    names
}

/// Mount points (from `sysinfo`) whose source device is one of `members`.
fn mount_points_of(disks: &sysinfo::Disks, members: &[String]) -> Vec<PathBuf> {
    disks
        .iter()
        .filter(|disk| {
            let source = Path::new(disk.name());
            source
                .file_name()
                .map(|n| members.iter().any(|m| m.as_str() == n.to_string_lossy()))
                .unwrap_or(false)
        })
        .map(|disk| disk.mount_point().to_path_buf())
        .collect()
}

fn kernel_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("{} does not name a device", path.display()))
}

impl Platform for LinuxPlatform {
    /// Filtering:
    /// 1.  Skip loop, ram and zram devices.
    /// 2.  Skip devices whose `/sys/block/<device>/size` is zero, which is
    ///     what empty card readers report.
    fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        let disks = sysinfo::Disks::new_with_refreshed_list();
        let mut devices = Vec::new();

        let block_dir = fs::read_dir("/sys/block").context("Failed to read /sys/block")?;
        for entry in block_dir.filter_map(Result::ok) {
            let name = entry.file_name().to_string_lossy().to_string();
            if VIRTUAL_PREFIXES.iter().any(|p| name.starts_with(p)) {
                continue;
            }

            let size_sectors = read_sys_file(&name, "size")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(0);
            if size_sectors == 0 {
                continue;
            }

            let removable = read_sys_file(&name, "removable")
                .map(|s| s == "1")
                .unwrap_or(false);
            let model = read_sys_file(&name, "device/model")
                .ok()
                .filter(|m| !m.is_empty());
            let mount_points = mount_points_of(&disks, &member_names(&name));

            devices.push(DeviceInfo {
                path: PathBuf::from("/dev").join(&name),
                name,
                // The sysfs size is always in 512-byte sectors.
                size_bytes: size_sectors * 512,
                model,
                removable,
                mount_points,
            });
        }

        devices.sort_by(|a, b| a.name.cmp(&b.name));
        debug!("found {} block devices", devices.len());
        Ok(devices)
    }

    fn is_system_device(&self, path: &Path) -> Result<bool> {
        let name = kernel_name(path)?;
        let disks = sysinfo::Disks::new_with_refreshed_list();
        let mounts = mount_points_of(&disks, &member_names(&name));
        Ok(mounts.iter().any(|m| m == Path::new("/")))
    }

    fn unmount(&self, path: &Path) -> Result<()> {
        let name = kernel_name(path)?;
        let disks = sysinfo::Disks::new_with_refreshed_list();
        let mounts = mount_points_of(&disks, &member_names(&name));

        let mut failed = Vec::new();
        for mount_point in &mounts {
            match nix::mount::umount(mount_point.as_path()) {
                Ok(()) => debug!("unmounted {}", mount_point.display()),
                Err(e) => {
                    warn!("failed to unmount {}: {}", mount_point.display(), e);
                    failed.push(mount_point.display().to_string());
                }
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("Failed to unmount {}", failed.join(", ")))
        }
    }

    fn open_device(&self, path: &Path) -> Result<File> {
        OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(path)
            .with_context(|| format!("Cannot open {} for writing", path.display()))
    }

    /// Block devices are asked via the `BLKGETSIZE64` ioctl; anything else
    /// reports its file length.
    fn device_size(&self, file: &File) -> Result<u64> {
        let metadata = file.metadata()?;
        if !metadata.file_type().is_block_device() {
            return Ok(metadata.len());
        }

        let mut size_bytes: u64 = 0;
        // SAFETY: the descriptor is open for the lifetime of `file` and
        // `size_bytes` is a valid u64 out-pointer.
        unsafe {
            blkgetsize64(file.as_raw_fd(), &mut size_bytes)
                .context("BLKGETSIZE64 ioctl failed")?;
        }
        Ok(size_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn regular_files_report_their_length() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[7u8; 4096]).unwrap();
        let size = LinuxPlatform.device_size(file.as_file()).unwrap();
        assert_eq!(size, 4096);
    }

    #[test]
    fn opened_handle_writes_without_truncating() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[1u8; 100]).unwrap();

        let opened = LinuxPlatform.open_device(file.path()).unwrap();
        assert_eq!(LinuxPlatform.device_size(&opened).unwrap(), 100);
    }

    #[test]
    fn unknown_device_has_no_members_beyond_itself() {
        assert_eq!(member_names("no-such-disk"), vec!["no-such-disk".to_string()]);
    }
}
