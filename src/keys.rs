use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use log::{debug, info};
use rustix::fs::Mode;

use crate::constants::{DIR_ROOT_SSH, FILE_AUTHORIZED_KEYS};
use crate::fs::{JoinRelative, mkdir_p};
use crate::metadata::ConfigDrive;
use crate::render::FileSet;
use crate::writer::Writer;

/// `authorized_keys` content, one comment line and one key line per named key.
pub fn render_authorized_keys(public_keys: &BTreeMap<String, String>) -> FileSet {
    let lines: Vec<String> = public_keys
        .iter()
        .flat_map(|(name, key)| {
            [
                format!("# Injected key {} by keypair extension", name),
                key.clone(),
            ]
        })
        .collect();
    FileSet::from([(
        FILE_AUTHORIZED_KEYS.to_string(),
        format!("{}\n", lines.join("\n")),
    )])
}

/// Install the root user's keys from the config drive's meta data, if any.
pub fn write_ssh_keys(
    drive: &ConfigDrive,
    root: &Path,
    writer: &Writer,
    dry_run: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let Some(meta_data) = drive.meta_data()? else {
        debug!("No meta data, not writing ssh keys");
        return Ok(());
    };
    let Some(public_keys) = meta_data.public_keys else {
        debug!("No public keys in meta data");
        return Ok(());
    };
    if !dry_run {
        mkdir_p(root.join_relative(DIR_ROOT_SSH), Mode::from(0o700))?;
    }
    info!("Writing {} ssh key(s)", public_keys.len());
    writer.finish(&render_authorized_keys(&public_keys), out)
}
