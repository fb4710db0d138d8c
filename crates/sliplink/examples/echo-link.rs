//! Echo link: accepts one peer on a Unix socket and sends every datagram back.
//!
//! Run with:
//!   cargo run --example echo-link
//!
//! In another terminal:
//!   cargo run --features cli -- send /tmp/sliplink-echo-<pid>/echo.sock \
//!     --data hello --wait --wait-timeout 3s

#[cfg(unix)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::fs;
    use std::sync::mpsc;

    use sliplink::frame::FrameConfig;
    use sliplink::link::Link;
    use sliplink::transport::UnixDomainSocket;

    let sock_dir = std::env::temp_dir().join(format!("sliplink-echo-{}", std::process::id()));
    fs::create_dir_all(&sock_dir)?;
    let sock_path = sock_dir.join("echo.sock");

    let listener = UnixDomainSocket::bind(&sock_path)?;
    eprintln!("Listening on {}", sock_path.display());

    let transport = listener.accept()?;
    eprintln!("Peer connected");

    let (tx, rx) = mpsc::channel();
    let link = Link::with_receiver(transport, FrameConfig::default(), move |datagram| {
        let _ = tx.send(datagram);
    })?;

    // The reader thread keeps the sender alive, so this runs until interrupted.
    for datagram in rx {
        eprintln!("Received {} bytes", datagram.len());
        link.send(&datagram)?;
    }

    let _ = fs::remove_dir_all(&sock_dir);
    Ok(())
}

#[cfg(not(unix))]
fn main() {
    eprintln!("echo-link needs Unix domain sockets");
}
