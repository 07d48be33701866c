use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use configdrive_init::config::Config;
use configdrive_init::constants::{DIR_ROOT, FILE_LOCK, FILE_LOG};
use configdrive_init::init;
use configdrive_init::logger::init_logger;
use log::{Level, error};

#[derive(Parser, Debug)]
#[command(name = "configdrive-init")]
#[command(version)]
#[command(about = "Write network configuration from a config drive", long_about = None)]
#[allow(clippy::struct_excessive_bools)]
struct Args {
    #[arg(short = 'n', long, help = "Do not write files")]
    noop: bool,
    #[arg(long, value_name = "DISTRO", help = "Override detected distro")]
    distro: Option<String>,
    #[arg(
        long,
        value_name = "PATH",
        default_value = DIR_ROOT,
        help = "Mounted root for config drive info"
    )]
    root: PathBuf,
    #[arg(
        long,
        value_name = "PATH",
        default_value = DIR_ROOT,
        help = "Root that configuration files are written under"
    )]
    target_root: PathBuf,
    #[arg(short = 'i', long, value_name = "NAME", help = "Interface to process")]
    interface: Option<String>,
    #[arg(long, help = "Write ssh keys")]
    ssh: bool,
    #[arg(long, help = "Set the hostname if name is available in config drive")]
    hostname: bool,
    #[arg(long = "skip-network", help = "Do not write network info")]
    skip_network: bool,
    #[arg(long, value_name = "PATH", default_value = FILE_LOCK)]
    lock_file: PathBuf,
    #[arg(long, value_name = "PATH", default_value = FILE_LOG)]
    log_file: PathBuf,
    #[arg(long, help = "Log at debug level")]
    debug: bool,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            dry_run: args.noop,
            distro: args.distro,
            root: args.root,
            target_root: args.target_root,
            interface: args.interface,
            ssh: args.ssh,
            hostname: args.hostname,
            skip_network: args.skip_network,
            lock_file: args.lock_file,
            log_file: Some(args.log_file),
            log_level: if args.debug { Level::Debug } else { Level::Info },
        }
    }
}

fn main() -> ExitCode {
    let config = Config::from(Args::parse());
    if let Err(e) = init_logger(config.log_level, config.log_file.as_deref()) {
        // Use eprintln! here in case logger does not initialize.
        eprintln!("{}", e);
    }
    match init::initialize(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Failed to configure from config drive: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
