use std::path::PathBuf;

use log::Level;

use crate::constants::{DIR_ROOT, FILE_LOCK, FILE_LOG, IFACE_LOOPBACK};

/// Options for one run, normally built from the command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Print files instead of writing them and leave links alone.
    pub dry_run: bool,
    pub distro: Option<String>,
    /// Where the config drive and `/sys` are looked up.
    pub root: PathBuf,
    /// Where rendered files are written and existing ones detected.
    pub target_root: PathBuf,
    pub interface: Option<String>,
    pub ssh: bool,
    pub hostname: bool,
    pub skip_network: bool,
    pub lock_file: PathBuf,
    pub log_file: Option<PathBuf>,
    pub log_level: Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dry_run: false,
            distro: None,
            root: PathBuf::from(DIR_ROOT),
            target_root: PathBuf::from(DIR_ROOT),
            interface: None,
            ssh: false,
            hostname: false,
            skip_network: false,
            lock_file: PathBuf::from(FILE_LOCK),
            log_file: Some(PathBuf::from(FILE_LOG)),
            log_level: Level::Info,
        }
    }
}

impl Config {
    pub fn wants_network(&self) -> bool {
        !self.skip_network && self.interface.as_deref() != Some(IFACE_LOOPBACK)
    }
}
