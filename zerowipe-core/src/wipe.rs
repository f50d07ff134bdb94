//! Contains the zero-fill write loop.
//!
//! The engine writes one aligned 1 MiB zero buffer after another to a device
//! handle that the caller has already opened at offset 0. Writes are strictly
//! sequential. Between writes the engine polls a shared cancellation flag, so
//! a cancellation is noticed after at most one buffer's worth of data.
//!
//! A run ends in exactly one of three ways:
//! - `Ok(())`: every byte was accepted *and* flushed to stable storage.
//! - [`WipeError::Interrupted`]: the flag was set; the device is partially
//!   overwritten.
//! - [`WipeError::IoFailure`]: a write or the final sync failed.
use crate::buffer::ZeroBuffer;
use crate::progress::{DisplayFrame, ProgressState};
use log::{debug, error, info, trace, warn};
use std::collections::TryReserveError;
use std::fs::File;
use std::io::{self, ErrorKind, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Why a wipe did not complete.
#[derive(Debug, Error)]
pub enum WipeError {
    /// A write or the durability barrier failed. The device is left in an
    /// unspecified, partially written state.
    #[error("I/O failure: {0}")]
    IoFailure(#[from] io::Error),
    /// Cancellation was requested before all bytes were written.
    #[error("operation interrupted by user")]
    Interrupted,
    /// The write buffer could not be allocated; nothing was written.
    #[error("failed to allocate write buffer: {0}")]
    Allocation(#[from] TryReserveError),
}

impl WipeError {
    /// Interruption is a distinct, non-error outcome for exit-status purposes.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, WipeError::Interrupted)
    }
}

/// A writable device that can force its buffered writes to stable storage.
pub trait WipeTarget: Write {
    /// Blocks until every previously accepted write is durable.
    fn sync(&mut self) -> io::Result<()>;
}

impl WipeTarget for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

impl<T: WipeTarget + ?Sized> WipeTarget for &mut T {
    fn sync(&mut self) -> io::Result<()> {
        (**self).sync()
    }
}

/// State owned by one invocation of [`run`].
struct WipeSession {
    total_size: u64,
    written: u64,
    buffer: ZeroBuffer,
}

impl WipeSession {
    fn new(total_size: u64) -> Result<Self, WipeError> {
        Ok(Self {
            total_size,
            written: 0,
            buffer: ZeroBuffer::standard()?,
        })
    }

    /// The next write: one full buffer, or the exact remainder.
    fn next_chunk(&self) -> &[u8] {
        let remaining = self.total_size.saturating_sub(self.written);
        let len = remaining.min(self.buffer.len() as u64) as usize;
        &self.buffer.as_slice()[..len]
    }
}

/// Overwrites the first `total_size` bytes of `device` with zeros.
///
/// # Arguments
///
/// * `device` - An open, writable handle positioned at offset 0.
/// * `total_size` - The exact number of bytes to write.
/// * `cancelled` - Set by an external signal handler to request a stop. It is
///   checked before every write; a write in flight is never split.
/// * `progress` - A tracker freshly initialized for `total_size`. It receives
///   every accepted byte count.
/// * `on_frame` - Called with each display frame the tracker produces, at
///   most once per second.
///
/// # Errors
///
/// - [`WipeError::Allocation`] if the write buffer cannot be allocated.
/// - [`WipeError::Interrupted`] if `cancelled` is observed set.
/// - [`WipeError::IoFailure`] on any non-transient write error, a write that
///   accepts zero bytes, or a failed sync after the last write.
///
/// Writes that fail with [`ErrorKind::Interrupted`] are retried without limit,
/// and short writes are continued from where they stopped.
pub fn run<D, F>(
    device: &mut D,
    total_size: u64,
    cancelled: &AtomicBool,
    progress: &mut ProgressState,
    mut on_frame: F,
) -> Result<(), WipeError>
where
    D: WipeTarget + ?Sized,
    F: FnMut(&DisplayFrame),
{
    let mut session = WipeSession::new(total_size)?;
    debug!(
        "wipe session started: total_size={}, buffer_size={}",
        total_size,
        session.buffer.len()
    );

    while session.written < session.total_size {
        if cancelled.load(Ordering::SeqCst) {
            warn!(
                "wipe interrupted: written={}, total_size={}",
                session.written, session.total_size
            );
            return Err(WipeError::Interrupted);
        }

        let chunk = session.next_chunk();
        let requested = chunk.len();
        match device.write(chunk) {
            Ok(0) => {
                error!("device accepted no bytes at offset {}", session.written);
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    format!("device accepted no bytes at offset {}", session.written),
                )
                .into());
            }
            Ok(n) => {
                // A device never gets credit for more than it was handed.
                let n = n.min(requested);
                if n < requested {
                    trace!("short write: requested={requested}, accepted={n}");
                }
                session.written += n as u64;
                if let Some(frame) = progress.update(n as u64) {
                    on_frame(&frame);
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {
                trace!("write interrupted at offset {}, retrying", session.written);
            }
            Err(e) => {
                error!("write failed at offset {}: {}", session.written, e);
                return Err(e.into());
            }
        }
    }

    info!("all {total_size} bytes accepted, syncing to stable storage");
    if let Err(e) = device.flush() {
        error!("flush failed after writing {total_size} bytes: {e}");
        return Err(e.into());
    }
    if let Err(e) = device.sync() {
        error!("sync failed after writing {total_size} bytes: {e}");
        return Err(e.into());
    }

    info!("wipe completed: written={}", session.written);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_are_full_buffers_then_the_exact_remainder() {
        let mut session = WipeSession::new(2 * 1024 * 1024 + 7).unwrap();
        assert_eq!(session.next_chunk().len(), 1024 * 1024);
        session.written = 2 * 1024 * 1024;
        assert_eq!(session.next_chunk().len(), 7);
    }

    #[test]
    fn only_interruption_reports_as_interrupted() {
        assert!(WipeError::Interrupted.is_interrupted());
        let io = WipeError::from(io::Error::other("boom"));
        assert!(!io.is_interrupted());
        assert_eq!(io.to_string(), "I/O failure: boom");
    }

    #[test]
    fn zero_length_target_only_syncs() {
        let mut sink: Vec<u8> = Vec::new();
        struct Synced<'a>(&'a mut Vec<u8>, bool);
        impl Write for Synced<'_> {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.write(buf)
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        impl WipeTarget for Synced<'_> {
            fn sync(&mut self) -> io::Result<()> {
                self.1 = true;
                Ok(())
            }
        }

        let mut dev = Synced(&mut sink, false);
        let mut progress = ProgressState::init(0);
        run(&mut dev, 0, &AtomicBool::new(false), &mut progress, |_| {}).unwrap();
        assert!(dev.1);
        assert!(sink.is_empty());
    }
}
