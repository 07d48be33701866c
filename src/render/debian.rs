//! `/etc/network/interfaces` style configuration.

use std::path::Path;

use log::debug;

use super::{FileSet, Matched, Renderer, Target, matched, unmatched};
use crate::constants::{DIR_ETC_NETWORK_INTERFACES_D, FILE_ETC_NETWORK_INTERFACES};
use crate::interfaces::{InterfaceKind, InterfaceMap};
use crate::probe::DeviceMap;

pub struct DebianRenderer {
    target: Target,
}

impl DebianRenderer {
    pub fn new<P: AsRef<Path>>(target_root: P) -> Self {
        Self {
            target: Target::new(target_root),
        }
    }

    // Only an exact `interfaces.d/<name>` counts as existing config.
    fn is_configured(&self, name: &str) -> bool {
        self.target
            .has_file(&format!("{}/{}", DIR_ETC_NETWORK_INTERFACES_D, name))
    }
}

fn cfg_path(name: &str) -> String {
    format!("{}/{}.cfg", DIR_ETC_NETWORK_INTERFACES_D, name)
}

fn base_interfaces() -> String {
    format!(
        "auto lo\niface lo inet loopback\nsource {}/*.cfg\n",
        DIR_ETC_NETWORK_INTERFACES_D
    )
}

fn dhcp_stanza(name: &str, raw_device: Option<&str>) -> String {
    let mut result = format!("auto {}\niface {} inet dhcp\n", name, name);
    if let Some(raw) = raw_device {
        result.push_str(&format!("    vlan-raw-device {}\n", raw));
    }
    result
}

fn static_stanza(m: &Matched, family: &str) -> Option<String> {
    let Some(address) = &m.record.address else {
        debug!("{} has no static address, skipping", m.name);
        return None;
    };
    let mut result = format!("auto {}\niface {} {} static\n", m.name, m.name, family);
    if let Some(raw) = m.raw_device() {
        result.push_str(&format!("    vlan-raw-device {}\n", raw));
    }
    result.push_str(&format!("    address {}\n", address.ip_address));
    result.push_str(&format!("    netmask {}\n", address.netmask));
    if let Some(default) = m.record.default_route() {
        result.push_str(&format!("    gateway {}\n", default.gateway));
    }
    // No native syntax for extra routes, so add and remove them by hand.
    for route in m.record.extra_routes() {
        result.push_str(&format!(
            "    post-up route add -net {} netmask {} gw {} || true\n",
            route.network, route.netmask, route.gateway
        ));
        result.push_str(&format!(
            "    pre-down route del -net {} netmask {} gw {} || true\n",
            route.network, route.netmask, route.gateway
        ));
    }
    Some(result)
}

impl Renderer for DebianRenderer {
    fn render(&self, interfaces: &InterfaceMap, devices: &DeviceMap) -> FileSet {
        debug!(
            "Rendering debian interfaces: {:?} {:?}",
            interfaces, devices
        );
        let mut files = FileSet::new();
        files.insert(FILE_ETC_NETWORK_INTERFACES.to_string(), base_interfaces());

        for m in matched(interfaces, devices, |name| self.is_configured(name)) {
            let content = match m.record.kind {
                InterfaceKind::Ipv4Dhcp => Some(dhcp_stanza(&m.name, m.raw_device())),
                InterfaceKind::Ipv4 => static_stanza(&m, "inet"),
                InterfaceKind::Ipv6 => static_stanza(&m, "inet6"),
                InterfaceKind::Ipv6Dhcp => None,
            };
            if let Some(content) = content {
                files.insert(cfg_path(&m.name), content);
            }
        }

        for (_, name) in unmatched(interfaces, devices, |name| self.is_configured(name)) {
            files.insert(cfg_path(name), dhcp_stanza(name, None));
        }
        files
    }
}
