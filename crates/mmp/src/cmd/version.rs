use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("mmp {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: mmp");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("MMP_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "build_profile: {}",
        option_env!("MMP_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!(
        "features: serial={}, async={}, cli=true",
        cfg!(feature = "serial"),
        cfg!(feature = "async")
    );
    println!("default_port: /dev/ttyUSB0 @ 38400 baud");
    println!(
        "known_device_profiles: {}",
        mmp_boot::profiles()
            .map(|profile| profile.name)
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(SUCCESS)
}
