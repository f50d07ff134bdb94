use super::Platform;
use crate::device::DeviceInfo;
use anyhow::{Result, bail};
use std::fs::File;
use std::path::Path;

/// Stand-in for targets without disk discovery support.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedPlatform;

impl Platform for UnsupportedPlatform {
    fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        bail!("Unsupported operating system")
    }

    fn is_system_device(&self, _path: &Path) -> Result<bool> {
        bail!("Unsupported operating system")
    }

    fn unmount(&self, _path: &Path) -> Result<()> {
        bail!("Unsupported operating system")
    }

    fn open_device(&self, _path: &Path) -> Result<File> {
        bail!("Unsupported operating system")
    }

    fn device_size(&self, _file: &File) -> Result<u64> {
        bail!("Unsupported operating system")
    }
}
