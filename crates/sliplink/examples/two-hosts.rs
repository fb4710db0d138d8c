//! Two hosts and a router, wired with in-memory links.
//!
//! Each host has a single neighbor (the router). The router has both hosts as
//! neighbors and forwards by the first payload byte, standing in for a
//! destination address.
//!
//! Run with:
//!   cargo run --example two-hosts

use std::sync::mpsc;

use sliplink::link::LinkLayer;
use sliplink::transport::MemoryTransport;

const HOST_A: &str = "10.0.0.1";
const HOST_B: &str = "10.0.0.2";
const ROUTER: &str = "10.0.0.254";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (a_end, router_a_end) = MemoryTransport::pair("a-eth0", "router-eth0");
    let (b_end, router_b_end) = MemoryTransport::pair("b-eth0", "router-eth1");

    let (to_router, router_inbox) = mpsc::channel();
    let router = LinkLayer::with_receiver(
        [(HOST_A, router_a_end), (HOST_B, router_b_end)],
        move |datagram| {
            let _ = to_router.send(datagram);
        },
    )?;

    let host_a = LinkLayer::new([(ROUTER, a_end)])?;
    let (to_b, b_inbox) = mpsc::channel();
    let _host_b = LinkLayer::with_receiver([(ROUTER, b_end)], move |datagram| {
        let _ = to_b.send(datagram);
    })?;

    // Destination octet 2, a payload containing both SLIP special bytes.
    host_a.send(&[2, b'h', b'i', 0xC0, 0xDB], ROUTER)?;
    // Nobody is at .9; the router will refuse to forward it.
    host_a.send(&[9, b'?'], ROUTER)?;

    while let Ok(datagram) = router_inbox.try_recv() {
        let Some(&dst) = datagram.first() else {
            continue;
        };
        let next_hop = format!("10.0.0.{dst}");
        match router.send(&datagram, &next_hop) {
            Ok(()) => eprintln!("[router] forwarded {} bytes to {next_hop}", datagram.len()),
            Err(err) => eprintln!("[router] dropped datagram: {err}"),
        }
    }

    for datagram in b_inbox.try_iter() {
        eprintln!("[host b] received {:02x?}", datagram.as_ref());
    }

    for (neighbor, stats) in router.stats() {
        eprintln!(
            "[router] {neighbor}: sent={} received={}",
            stats.frames_sent, stats.frames_received
        );
    }
    Ok(())
}
