//! Rendering of interface records into native distribution config files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::debug;

use crate::constants::FILE_ETC_RESOLV_CONF;
use crate::fs::JoinRelative;
use crate::interfaces::{InterfaceMap, InterfaceRecord};
use crate::probe::DeviceMap;

pub mod debian;
pub mod redhat;

pub use debian::DebianRenderer;
pub use redhat::RedHatRenderer;

/// Absolute target path to file content. Ordered, so iteration is sorted.
pub type FileSet = BTreeMap<String, String>;

pub trait Renderer {
    fn render(&self, interfaces: &InterfaceMap, devices: &DeviceMap) -> FileSet;
}

/// The filesystem tree that rendered files will land in, used to detect
/// interfaces that are already configured.
#[derive(Clone, Debug)]
pub struct Target {
    root: PathBuf,
}

impl Target {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    // Existence only, content is never inspected.
    fn has_file(&self, path: &str) -> bool {
        self.root.join_relative(path).exists()
    }
}

/// A metadata record joined with the device it applies to.
struct Matched<'a> {
    record: &'a InterfaceRecord,
    /// Name of the physical device.
    device: &'a str,
    /// Name to configure, `device.vlan_id` for VLANs.
    name: String,
}

impl Matched<'_> {
    fn raw_device(&self) -> Option<&str> {
        self.record.vlan_id.as_ref().map(|_| self.device)
    }
}

// Records in ascending id order that have a live device, minus those whose
// device or VLAN sub-interface already has a config file.
fn matched<'a>(
    interfaces: &'a InterfaceMap,
    devices: &'a DeviceMap,
    exists: impl Fn(&str) -> bool,
) -> Vec<Matched<'a>> {
    let mut records: Vec<&InterfaceRecord> = interfaces.values().collect();
    records.sort_by(|a, b| a.id.cmp(&b.id));
    records
        .into_iter()
        .filter_map(|record| {
            let device = devices.get(&record.hardware_address)?;
            let name = match &record.vlan_id {
                Some(vlan_id) => format!("{}.{}", device, vlan_id),
                None => device.clone(),
            };
            if let Some(found) = [device.as_str(), name.as_str()]
                .into_iter()
                .find(|n| exists(*n))
            {
                debug!("{} already has a config file, skipping {}", found, name);
                return None;
            }
            Some(Matched {
                record,
                device,
                name,
            })
        })
        .collect()
}

// Devices with neither metadata nor an existing config file, ascending by
// name, as (hardware address, name).
fn unmatched<'a>(
    interfaces: &InterfaceMap,
    devices: &'a DeviceMap,
    exists: impl Fn(&str) -> bool,
) -> Vec<(&'a str, &'a str)> {
    let mut rest: Vec<(&str, &str)> = devices
        .iter()
        .filter(|(mac, _)| !interfaces.contains_key(*mac))
        .map(|(mac, name)| (mac.as_str(), name.as_str()))
        .filter(|(_, name)| {
            let found = exists(*name);
            if found {
                debug!("{} already has a config file, skipping", name);
            }
            !found
        })
        .collect();
    rest.sort_by(|a, b| a.1.cmp(b.1));
    rest
}

/// `/etc/resolv.conf` with one nameserver per DNS service. No servers
/// renders empty content, which is never written.
pub fn render_resolv_conf(dns_servers: &[String]) -> FileSet {
    let content: String = dns_servers
        .iter()
        .map(|server| format!("nameserver {}\n", server))
        .collect();
    FileSet::from([(FILE_ETC_RESOLV_CONF.to_string(), content)])
}
