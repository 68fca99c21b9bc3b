use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("diagmux {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: diagmux");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("DIAGMUX_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "features: payload={}, async={}, cli=true",
        cfg!(feature = "payload"),
        cfg!(feature = "async")
    );
    println!(
        "wire: sentinel={:?} length=u32-le header_bytes={}",
        String::from_utf8_lossy(diagmux_frame::SENTINEL),
        diagmux_frame::HEADER_SIZE
    );

    Ok(SUCCESS)
}
