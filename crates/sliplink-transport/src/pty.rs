//! Pseudo-terminal serial line.
//!
//! Opens a raw-mode PTY pair. The master side is wrapped as a
//! [`StreamTransport`]; the slave device path is what the peer opens, exactly
//! as it would open a real serial port (`/dev/ttyUSB0` and friends).

use std::ffi::CStr;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::fd::{FromRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Result, TransportError};
use crate::stream::StreamTransport;

/// An open pseudo-terminal master plus the path of its slave device.
///
/// A slave handle is held for the lifetime of the transport, so reads on the
/// master block rather than fail with `EIO` while no peer has the device open.
pub struct Pty {
    master: File,
    slave: File,
    slave_path: PathBuf,
}

fn check(op: &'static str, rc: libc::c_int) -> Result<()> {
    if rc < 0 {
        return Err(TransportError::Pty {
            op,
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(())
}

impl Pty {
    /// Allocate a new PTY and put its line discipline into raw mode.
    pub fn open() -> Result<Self> {
        // SAFETY: posix_openpt has no pointer arguments.
        let fd: RawFd = unsafe { libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY) };
        check("posix_openpt", fd)?;
        // SAFETY: `fd` was just returned by posix_openpt and is owned here;
        // wrapping it first guarantees it is closed on every error path below.
        let master = unsafe { File::from_raw_fd(fd) };

        // SAFETY: `fd` is a valid PTY master descriptor.
        check("grantpt", unsafe { libc::grantpt(fd) })?;
        // SAFETY: as above.
        check("unlockpt", unsafe { libc::unlockpt(fd) })?;

        let mut name = [0 as libc::c_char; 128];
        // SAFETY: `name` is writable for `name.len()` bytes.
        let rc = unsafe { libc::ptsname_r(fd, name.as_mut_ptr(), name.len()) };
        if rc != 0 {
            return Err(TransportError::Pty {
                op: "ptsname_r",
                source: std::io::Error::from_raw_os_error(rc),
            });
        }
        // SAFETY: ptsname_r succeeded, so `name` holds a NUL-terminated string.
        let slave_path = unsafe { CStr::from_ptr(name.as_ptr()) }
            .to_string_lossy()
            .into_owned();

        make_raw(fd)?;

        let slave_path = PathBuf::from(slave_path);
        let slave = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&slave_path)
            .map_err(|source| TransportError::Pty {
                op: "open slave",
                source,
            })?;

        info!(slave = %slave_path.display(), "opened pseudo-terminal");
        Ok(Self {
            master,
            slave,
            slave_path,
        })
    }

    /// Device path the peer should open.
    pub fn slave_path(&self) -> &Path {
        &self.slave_path
    }

    /// Convert the master side into a transport.
    pub fn into_transport(self) -> Result<StreamTransport> {
        let reader = self.master.try_clone()?;
        let writer = PinnedMaster {
            master: self.master,
            _slave: self.slave,
        };
        Ok(StreamTransport::new(
            self.slave_path.display().to_string(),
            reader,
            writer,
        ))
    }
}

/// Write half of the master that keeps the slave handle alive with it.
struct PinnedMaster {
    master: File,
    _slave: File,
}

impl Write for PinnedMaster {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.master.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.master.flush()
    }
}

/// Disable echo, line buffering and byte translation so every byte passes untouched.
fn make_raw(fd: RawFd) -> Result<()> {
    // SAFETY: termios is plain old data; tcgetattr fully initialises it.
    let mut attrs: libc::termios = unsafe { std::mem::zeroed() };
    // SAFETY: `fd` is a valid terminal descriptor and `attrs` is writable.
    check("tcgetattr", unsafe { libc::tcgetattr(fd, &mut attrs) })?;
    // SAFETY: `attrs` is a valid termios struct.
    unsafe { libc::cfmakeraw(&mut attrs) };
    // SAFETY: `fd` is valid and `attrs` points to an initialised termios.
    check("tcsetattr", unsafe {
        libc::tcsetattr(fd, libc::TCSANOW, &attrs)
    })
}

impl std::fmt::Debug for Pty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pty")
            .field("slave_path", &self.slave_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;
    use crate::traits::Transport;

    #[test]
    fn slave_sees_master_bytes_unmodified() {
        let pty = Pty::open().expect("pty should open");
        let slave_path = pty.slave_path().to_path_buf();
        assert!(slave_path.starts_with("/dev/pts"));

        let mut slave = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&slave_path)
            .expect("slave should open");
        let master = pty.into_transport().unwrap();

        // 0x0D and 0x0A would be translated by a cooked terminal.
        let wire = [0xC0, 0x0D, 0x0A, 0xDB, 0xDC, 0xC0];
        master.send(&wire).unwrap();

        let mut buf = [0u8; 6];
        slave.read_exact(&mut buf).unwrap();
        assert_eq!(buf, wire);

        let (tx, rx) = mpsc::channel();
        master
            .register_receiver(Box::new(move |chunk| tx.send(chunk.to_vec()).unwrap()))
            .unwrap();
        slave.write_all(&[0xC0, 0x03, 0xC0]).unwrap();

        let mut received = Vec::new();
        while received.len() < 3 {
            received.extend(rx.recv_timeout(Duration::from_secs(2)).unwrap());
        }
        assert_eq!(received, vec![0xC0, 0x03, 0xC0]);
    }
}
