use std::io::Read;

use sliplink_frame::encode;

use crate::cmd::EncodeArgs;
use crate::exit::{io_error, CliResult, SUCCESS};
use crate::output::{print_raw, to_hex};

pub fn run(args: EncodeArgs) -> CliResult<i32> {
    let mut payload = Vec::new();
    std::io::stdin()
        .lock()
        .read_to_end(&mut payload)
        .map_err(|err| io_error("failed reading stdin", err))?;

    let frame = encode(&payload);
    if args.hex {
        println!("{}", to_hex(&frame));
    } else {
        print_raw(&frame);
    }

    Ok(SUCCESS)
}
