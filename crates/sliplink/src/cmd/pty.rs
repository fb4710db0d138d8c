use std::sync::mpsc;

use sliplink_link::Link;
use sliplink_transport::Pty;

use crate::cmd::{pump, PtyArgs};
use crate::exit::{link_error, transport_error, CliResult};
use crate::output::{print_datagram, OutputFormat};

pub fn run(args: PtyArgs, format: OutputFormat) -> CliResult<i32> {
    let pty = Pty::open().map_err(|err| transport_error("pty open failed", err))?;
    let slave_path = pty.slave_path().display().to_string();
    eprintln!("{slave_path}");

    let transport = pty
        .into_transport()
        .map_err(|err| transport_error("pty open failed", err))?;
    let (tx, rx) = mpsc::channel();
    let link = Link::with_receiver(transport, args.frame.config(), move |datagram| {
        let _ = tx.send(datagram);
    })
    .map_err(|err| link_error("link setup failed", err))?;

    pump(rx, args.count, |datagram| {
        print_datagram(&datagram, &slave_path, format);
        if args.echo {
            link.send(&datagram)
                .map_err(|err| link_error("echo failed", err))?;
        }
        Ok(())
    })
}
