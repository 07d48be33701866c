//! `ifcfg-*` and `route-*` network-scripts configuration.

use std::path::Path;

use log::debug;

use super::{FileSet, Matched, Renderer, Target, matched, unmatched};
use crate::constants::DIR_ETC_NETWORK_SCRIPTS;
use crate::interfaces::{InterfaceKind, InterfaceMap};
use crate::probe::DeviceMap;

const HEADER: &str = "# Automatically generated, do not edit\n";

pub struct RedHatRenderer {
    target: Target,
}

impl RedHatRenderer {
    pub fn new<P: AsRef<Path>>(target_root: P) -> Self {
        Self {
            target: Target::new(target_root),
        }
    }

    fn is_configured(&self, name: &str) -> bool {
        self.target.has_file(&ifcfg_path(name))
    }
}

fn ifcfg_path(name: &str) -> String {
    format!("{}/ifcfg-{}", DIR_ETC_NETWORK_SCRIPTS, name)
}

fn route_path(name: &str) -> String {
    format!("{}/route-{}", DIR_ETC_NETWORK_SCRIPTS, name)
}

fn dhcp_ifcfg(name: &str, hwaddr: &str, vlan: bool) -> String {
    let mut result = format!(
        "{}DEVICE={}\nBOOTPROTO=dhcp\nHWADDR={}\nONBOOT=yes\nNM_CONTROLLED=no\nTYPE=Ethernet\n",
        HEADER, name, hwaddr
    );
    if vlan {
        result.push_str("VLAN=yes\n");
    }
    result
}

fn static_files(m: &Matched, files: &mut FileSet) {
    let Some(address) = &m.record.address else {
        debug!("{} has no static address, skipping", m.name);
        return;
    };
    let mut ifcfg = format!(
        "{}DEVICE={}\nBOOTPROTO=static\nHWADDR={}\nIPADDR={}\nNETMASK={}\nONBOOT=yes\nNM_CONTROLLED=no\n",
        HEADER, m.name, m.record.hardware_address, address.ip_address, address.netmask
    );
    if m.record.vlan_id.is_some() {
        ifcfg.push_str("VLAN=yes\n");
    }
    if let Some(default) = m.record.default_route() {
        ifcfg.push_str(&format!("DEFROUTE=yes\nGATEWAY={}\n", default.gateway));
    }

    let routes: String = m
        .record
        .extra_routes()
        .enumerate()
        .map(|(n, route)| {
            format!(
                "ADDRESS{n}={}\nNETMASK{n}={}\nGATEWAY{n}={}\n",
                route.network, route.netmask, route.gateway
            )
        })
        .collect();
    if !routes.is_empty() {
        files.insert(route_path(&m.name), routes);
    }
    files.insert(ifcfg_path(&m.name), ifcfg);
}

impl Renderer for RedHatRenderer {
    fn render(&self, interfaces: &InterfaceMap, devices: &DeviceMap) -> FileSet {
        debug!(
            "Rendering redhat interfaces: {:?} {:?}",
            interfaces, devices
        );
        let mut files = FileSet::new();

        for m in matched(interfaces, devices, |name| self.is_configured(name)) {
            match m.record.kind {
                InterfaceKind::Ipv4 => static_files(&m, &mut files),
                InterfaceKind::Ipv4Dhcp => {
                    files.insert(
                        ifcfg_path(&m.name),
                        dhcp_ifcfg(
                            &m.name,
                            &m.record.hardware_address,
                            m.record.vlan_id.is_some(),
                        ),
                    );
                }
                InterfaceKind::Ipv6 | InterfaceKind::Ipv6Dhcp => {
                    debug!("IPv6 is not supported for {}, skipping", m.name);
                }
            }
        }

        for (mac, name) in unmatched(interfaces, devices, |name| self.is_configured(name)) {
            files.insert(ifcfg_path(name), dhcp_ifcfg(name, mac, false));
        }
        files
    }
}
