use super::diskutil::{self, DiskInfo};
use super::{Platform, device_name, raw_device_path};
use crate::device::DeviceInfo;
use anyhow::{Context, Result, anyhow, bail};
use log::{debug, warn};
use nix::ioctl_read;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::process::Command;

ioctl_read!(dkiocgetblocksize, b'd', 24, u32);
ioctl_read!(dkiocgetblockcount, b'd', 25, u64);

/// Discovers disks through `diskutil` and mount state through `mount`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacosPlatform;

/// Runs a system tool and returns its stdout.
fn run_tool(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("Failed to run {program}"))?;
    if !output.status.success() {
        bail!(
            "{} {} failed: {}",
            program,
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn disk_info(name: &str) -> Result<DiskInfo> {
    Ok(diskutil::parse_info(&run_tool("diskutil", &["info", name])?))
}

fn mount_points_of(mounts: &[(String, PathBuf)], name: &str) -> Vec<PathBuf> {
    mounts
        .iter()
        .filter(|(source, _)| diskutil::source_belongs_to(source, name))
        .map(|(_, mount_point)| mount_point.clone())
        .collect()
}

fn current_mounts() -> Result<Vec<(String, PathBuf)>> {
    Ok(diskutil::parse_mounts(&run_tool("mount", &[])?))
}

impl Platform for MacosPlatform {
    fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        let names = diskutil::parse_disk_list(&run_tool("diskutil", &["list"])?);
        let mounts = current_mounts()?;
        let mut devices = Vec::new();

        for name in names {
            let info = match disk_info(&name) {
                Ok(info) => info,
                Err(e) => {
                    warn!("skipping {name}: {e:#}");
                    continue;
                }
            };
            let size_bytes = info.size_bytes.unwrap_or(0);
            if size_bytes == 0 {
                continue;
            }

            devices.push(DeviceInfo {
                path: PathBuf::from("/dev").join(&name),
                mount_points: mount_points_of(&mounts, &name),
                name,
                size_bytes,
                model: info.model,
                removable: info.removable,
            });
        }

        debug!("found {} disks", devices.len());
        Ok(devices)
    }

    fn is_system_device(&self, path: &Path) -> Result<bool> {
        let name = device_name(path);
        if disk_info(&name)?.system {
            return Ok(true);
        }
        let mounts = current_mounts()?;
        Ok(mount_points_of(&mounts, &name)
            .iter()
            .any(|m| m == Path::new("/")))
    }

    fn unmount(&self, path: &Path) -> Result<()> {
        let node = PathBuf::from("/dev").join(device_name(path));
        let node = node.to_string_lossy();
        run_tool("diskutil", &["unmountDisk", node.as_ref()])?;
        debug!("unmounted all volumes of {node}");
        Ok(())
    }

    /// Opens the raw `/dev/rdiskN` node, which skips the buffer cache.
    fn open_device(&self, path: &Path) -> Result<File> {
        let raw = raw_device_path(path);
        debug!("opening raw device {}", raw.display());
        OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(&raw)
            .with_context(|| format!("Cannot open {} for writing", raw.display()))
    }

    /// Disks are asked for block size × block count; anything else reports
    /// its file length.
    fn device_size(&self, file: &File) -> Result<u64> {
        let metadata = file.metadata()?;
        let ft = metadata.file_type();
        if !ft.is_block_device() && !ft.is_char_device() {
            return Ok(metadata.len());
        }

        let fd = file.as_raw_fd();
        let mut block_size: u32 = 0;
        let mut block_count: u64 = 0;
        // SAFETY: the descriptor is open for the lifetime of `file` and both
        // out-pointers are valid for their ioctl's result type.
        unsafe {
            dkiocgetblocksize(fd, &mut block_size).context("DKIOCGETBLOCKSIZE ioctl failed")?;
            dkiocgetblockcount(fd, &mut block_count).context("DKIOCGETBLOCKCOUNT ioctl failed")?;
        }

        block_count
            .checked_mul(u64::from(block_size))
            .ok_or_else(|| anyhow!("Device size overflows: {block_count} x {block_size}"))
    }
}
