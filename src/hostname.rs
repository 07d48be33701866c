use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Result, anyhow};
use log::{debug, info};
use rustix::system::sethostname;

use crate::constants::{FILE_ETC_HOSTNAME, FILE_ETC_HOSTS};
use crate::fs::JoinRelative;
use crate::metadata::ConfigDrive;

const LOCAL_HOST_ADDRESS: &str = "127.0.1.1";

/// Short host name, everything before the first dot.
pub fn short_hostname(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

fn has_hosts_entry(hosts: &str, hostname: &str) -> bool {
    hosts.lines().any(|line| {
        let mut fields = line.split_whitespace();
        fields.next() == Some(LOCAL_HOST_ADDRESS) && fields.any(|f| f == hostname)
    })
}

/// Persist `hostname` into `/etc/hostname` and make sure `/etc/hosts` maps it
/// to the local host address.
pub fn write_hostname_files(root: &Path, hostname: &str) -> Result<()> {
    let hostname_path = root.join_relative(FILE_ETC_HOSTNAME);
    fs::write(&hostname_path, format!("{}\n", hostname))
        .map_err(|e| anyhow!("unable to write {:?}: {}", hostname_path, e))?;

    let hosts_path = root.join_relative(FILE_ETC_HOSTS);
    let hosts = match fs::read_to_string(&hosts_path) {
        Ok(s) => s,
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(e) => return Err(anyhow!("unable to read {:?}: {}", hosts_path, e)),
    };
    if has_hosts_entry(&hosts, hostname) {
        debug!("{:?} already has an entry for {}", hosts_path, hostname);
        return Ok(());
    }
    let mut updated = hosts;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(&format!("{} {}\n", LOCAL_HOST_ADDRESS, hostname));
    fs::write(&hosts_path, updated).map_err(|e| anyhow!("unable to write {:?}: {}", hosts_path, e))
}

/// Set the host name from the config drive's meta data. Does nothing in
/// dry-run mode or when no name is present.
pub fn set_hostname(drive: &ConfigDrive, root: &Path, dry_run: bool) -> Result<()> {
    if dry_run {
        return Ok(());
    }
    let Some(name) = drive.meta_data()?.and_then(|md| md.name) else {
        debug!("No name in meta data, not setting hostname");
        return Ok(());
    };
    let hostname = short_hostname(&name);
    info!("Setting hostname to {}", hostname);
    sethostname(hostname.as_bytes()).map_err(|e| anyhow!("failed to set hostname: {}", e))?;
    write_hostname_files(root, hostname)
}
