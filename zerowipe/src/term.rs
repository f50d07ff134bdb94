/// Disables `ECHOCTL` on the controlling terminal for the life of the value.
///
/// `ECHOCTL` makes the terminal print Ctrl+C as `^C`, which would land in the
/// middle of the progress display. The previous settings come back on drop.
pub struct TermRestorer {
    #[cfg(unix)]
    saved: Option<termios::Termios>,
}

#[cfg(unix)]
impl TermRestorer {
    pub fn new() -> Self {
        use std::io::{IsTerminal, stdout};
        use std::os::unix::io::AsRawFd;
        use termios::{TCSANOW, Termios, tcsetattr};

        let fd = stdout().as_raw_fd();
        if !stdout().is_terminal() {
            return Self { saved: None };
        }

        let Ok(original) = Termios::from_fd(fd) else {
            return Self { saved: None };
        };

        let mut quiet = original;
        quiet.c_lflag &= !libc::ECHOCTL;
        if tcsetattr(fd, TCSANOW, &quiet).is_ok() {
            Self {
                saved: Some(original),
            }
        } else {
            Self { saved: None }
        }
    }
}

#[cfg(not(unix))]
impl TermRestorer {
    pub fn new() -> Self {
        Self {}
    }
}

impl Drop for TermRestorer {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Some(saved) = &self.saved {
            use std::os::unix::io::AsRawFd;
            termios::tcsetattr(std::io::stdout().as_raw_fd(), termios::TCSANOW, saved).ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn nothing_is_saved_without_a_terminal() {
        use std::io::{IsTerminal, stdout};

        let restorer = TermRestorer::new();
        if !stdout().is_terminal() {
            assert!(restorer.saved.is_none());
        }
        drop(restorer);

        // Settings restored on drop can be captured again.
        drop(TermRestorer::new());
    }
}
