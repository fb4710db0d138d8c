use std::sync::mpsc;

use sliplink_link::Link;
use sliplink_transport::UnixDomainSocket;
use tracing::info;

use crate::cmd::{pump, ListenArgs};
use crate::exit::{link_error, transport_error, CliResult};
use crate::output::{print_datagram, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let listener =
        UnixDomainSocket::bind(&args.path).map_err(|err| transport_error("bind failed", err))?;
    info!(path = %args.path.display(), "waiting for peer");

    let transport = listener
        .accept()
        .map_err(|err| transport_error("accept failed", err))?;
    let (tx, rx) = mpsc::channel();
    let link = Link::with_receiver(transport, args.frame.config(), move |datagram| {
        let _ = tx.send(datagram);
    })
    .map_err(|err| link_error("link setup failed", err))?;
    let source = link.transport_label().to_string();

    let code = pump(rx, args.count, |datagram| {
        print_datagram(&datagram, &source, format);
        if args.echo {
            link.send(&datagram)
                .map_err(|err| link_error("echo failed", err))?;
        }
        Ok(())
    })?;

    info!(stats = ?link.stats(), "listener stopped");
    Ok(code)
}
