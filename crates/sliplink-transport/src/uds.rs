use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::StreamTransport;

/// Filesystem Unix domain socket standing in for a serial line.
///
/// Each accepted or connected stream becomes a [`StreamTransport`] carrying
/// raw bytes; framing is left to the link above it. The socket file is
/// removed on drop, but only if it is still the one this listener created.
pub struct UnixDomainSocket {
    listener: UnixListener,
    path: PathBuf,
    created_inode: (u64, u64),
}

impl UnixDomainSocket {
    /// Permission mode applied to created socket paths.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;

    /// `sockaddr_un.sun_path` capacity: 108 bytes on Linux, 104 elsewhere.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Bind and listen on `path`, replacing a stale socket file if present.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_mode(path, Self::DEFAULT_SOCKET_MODE)
    }

    /// Bind and listen on `path` with an explicit permission mode.
    pub fn bind_with_mode(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let bind_err = |source: std::io::Error| TransportError::Bind {
            path: path.clone(),
            source,
        };

        let len = path.as_os_str().len();
        if len >= Self::MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path,
                len,
                max: Self::MAX_PATH_LEN,
            });
        }

        // Only ever remove sockets; anything else at the path is an error.
        if path.exists() {
            let metadata = std::fs::symlink_metadata(&path).map_err(bind_err)?;
            if !metadata.file_type().is_socket() {
                return Err(bind_err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "existing path is not a unix socket",
                )));
            }
            debug!(?path, "removing stale socket");
            std::fs::remove_file(&path).map_err(bind_err)?;
        }

        let listener = UnixListener::bind(&path).map_err(bind_err)?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
            .map_err(bind_err)?;
        let metadata = std::fs::symlink_metadata(&path).map_err(bind_err)?;

        info!(?path, "listening on unix domain socket");

        Ok(Self {
            listener,
            created_inode: (metadata.dev(), metadata.ino()),
            path,
        })
    }

    /// Accept the next peer (blocking).
    pub fn accept(&self) -> Result<StreamTransport> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(path = ?self.path, "accepted connection");
        StreamTransport::from_unix_stream(self.path.display().to_string(), stream)
    }

    /// Connect to a listening socket (blocking).
    pub fn connect(path: impl AsRef<Path>) -> Result<StreamTransport> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|source| TransportError::Connect {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(?path, "connected to unix domain socket");
        StreamTransport::from_unix_stream(path.display().to_string(), stream)
    }

    /// The path this socket is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UnixDomainSocket {
    fn drop(&mut self) {
        let Ok(metadata) = std::fs::symlink_metadata(&self.path) else {
            return;
        };
        if metadata.file_type().is_socket() && (metadata.dev(), metadata.ino()) == self.created_inode
        {
            debug!(path = ?self.path, "cleaning up socket file");
            let _ = std::fs::remove_file(&self.path);
        } else {
            debug!(path = ?self.path, "socket path identity changed; skipping cleanup");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;
    use crate::traits::Transport;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "sliplink-uds-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn bind_accept_connect() {
        let dir = temp_dir("basic");
        let sock_path = dir.join("line.sock");
        let listener = UnixDomainSocket::bind(&sock_path).unwrap();
        assert!(sock_path.exists());

        let path_clone = sock_path.clone();
        let client = std::thread::spawn(move || {
            let client = UnixDomainSocket::connect(&path_clone).unwrap();
            client.send(&[0xC0, b'h', b'i', 0xC0]).unwrap();
            client
        });

        let server = listener.accept().unwrap();
        let (tx, rx) = mpsc::channel();
        server
            .register_receiver(Box::new(move |chunk| tx.send(chunk.to_vec()).unwrap()))
            .unwrap();

        let mut received = Vec::new();
        while received.len() < 4 {
            received.extend(rx.recv_timeout(Duration::from_secs(2)).unwrap());
        }
        assert_eq!(received, vec![0xC0, b'h', b'i', 0xC0]);

        let _client = client.join().unwrap();
        drop(listener);
        assert!(!sock_path.exists(), "socket file should be removed on drop");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn path_too_long() {
        let long_path = "/tmp/".to_string() + &"a".repeat(200) + ".sock";
        let result = UnixDomainSocket::bind(&long_path);
        assert!(matches!(result, Err(TransportError::PathTooLong { .. })));
    }

    #[test]
    fn default_permissions_are_owner_only() {
        let dir = temp_dir("perms");
        let sock_path = dir.join("perm.sock");

        let listener = UnixDomainSocket::bind(&sock_path).unwrap();
        let mode = std::fs::metadata(&sock_path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);

        drop(listener);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn rejects_existing_regular_file() {
        let dir = temp_dir("file");
        let sock_path = dir.join("not-a-socket.sock");
        std::fs::write(&sock_path, b"regular-file").unwrap();

        let result = UnixDomainSocket::bind(&sock_path);
        assert!(matches!(result, Err(TransportError::Bind { .. })));
        assert!(sock_path.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn drop_leaves_replaced_path_alone() {
        let dir = temp_dir("replaced");
        let sock_path = dir.join("drop.sock");

        let listener = UnixDomainSocket::bind(&sock_path).unwrap();
        std::fs::remove_file(&sock_path).unwrap();
        std::fs::write(&sock_path, b"replacement-file").unwrap();

        drop(listener);
        assert!(sock_path.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn connect_to_missing_socket_fails() {
        let dir = temp_dir("missing");
        let result = UnixDomainSocket::connect(dir.join("absent.sock"));
        assert!(matches!(result, Err(TransportError::Connect { .. })));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
