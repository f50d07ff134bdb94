//! The core, UI-agnostic library for the `zerowipe` disk erasing utility.
//!
//! `zerowipe-core` can be driven by any front-end, whether a command-line
//! interface (like `zerowipe`) or something graphical. It zero-fills a raw
//! device, honours cancellation requests, and tracks throughput and ETA.
//!
//! The library is structured into several key modules:
//! - [`mod@wipe`]: The sequential write loop and its outcome type, [`wipe::WipeError`].
//! - [`progress`]: Byte accounting, speed/ETA estimation and the display frames
//!   and final summary handed back to the front-end.
//! - [`buffer`]: The aligned, zero-filled write buffer.
//! - [`format`]: Human-readable byte counts and durations.
//! - [`device`]: The [`device::DeviceInfo`] description of a disk.
//! - [`platform`]: Disk discovery, system-disk detection, unmounting and raw
//!   device access for the host OS.
//!
//! ## Example: Wiping a Device with Progress Reporting
//!
//! ```rust,no_run
//! use zerowipe_core::platform::{NativePlatform, Platform};
//! use zerowipe_core::progress::ProgressState;
//! use zerowipe_core::wipe;
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::sync::atomic::AtomicBool;
//!
//! fn main() -> anyhow::Result<()> {
//!     let platform = NativePlatform::default();
//!     let path = Path::new("/dev/sdz");
//!     platform.verify_device(path)?;
//!     platform.unmount(path)?;
//!
//!     let mut device = platform.open_device(path)?;
//!     let total_size = platform.device_size(&device)?;
//!
//!     // Set from a Ctrl+C handler to stop between writes.
//!     let cancelled = Arc::new(AtomicBool::new(false));
//!
//!     let mut progress = ProgressState::init(total_size);
//!     wipe::run(&mut device, total_size, &cancelled, &mut progress, |frame| {
//!         println!("{frame}");
//!     })?;
//!
//!     println!("{}", progress.finish());
//!     Ok(())
//! }
//! ```

pub mod buffer;
pub mod device;
pub mod format;
pub mod platform;
pub mod progress;
pub mod wipe;
