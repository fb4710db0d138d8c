use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("sliplink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: sliplink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("SLIPLINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "build_profile: {}",
        option_env!("SLIPLINK_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("features: async={}, cli=true", cfg!(feature = "async"));
    println!("pty: {}", cfg!(target_os = "linux"));

    Ok(SUCCESS)
}
