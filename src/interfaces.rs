//! Normalization of config drive links and networks into one record per
//! hardware address.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::{debug, warn};

use crate::metadata::{Link, Network, NetworkInfo, Route};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterfaceKind {
    Ipv4,
    Ipv4Dhcp,
    Ipv6,
    Ipv6Dhcp,
}

impl InterfaceKind {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "ipv4" => Some(Self::Ipv4),
            "ipv4_dhcp" => Some(Self::Ipv4Dhcp),
            "ipv6" => Some(Self::Ipv6),
            "ipv6_dhcp" => Some(Self::Ipv6Dhcp),
            _ => None,
        }
    }

    pub fn is_static(self) -> bool {
        matches!(self, Self::Ipv4 | Self::Ipv6)
    }
}

impl fmt::Display for InterfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Ipv4 => "ipv4",
            Self::Ipv4Dhcp => "ipv4_dhcp",
            Self::Ipv6 => "ipv6",
            Self::Ipv6Dhcp => "ipv6_dhcp",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticAddress {
    pub ip_address: String,
    pub netmask: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceRecord {
    pub id: String,
    pub hardware_address: String,
    pub kind: InterfaceKind,
    /// Present exactly when `kind` is static.
    pub address: Option<StaticAddress>,
    pub vlan_id: Option<String>,
    pub routes: Vec<Route>,
}

impl InterfaceRecord {
    pub fn default_route(&self) -> Option<&Route> {
        self.routes.iter().find(|r| r.is_default())
    }

    pub fn extra_routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().filter(|r| !r.is_default())
    }
}

/// Interface records keyed by lower-cased hardware address.
pub type InterfaceMap = BTreeMap<String, InterfaceRecord>;

/// A link after VLAN merging, with a single resolved hardware address.
#[derive(Clone, Debug, PartialEq, Eq)]
struct ResolvedLink {
    hardware_address: String,
    vlan_id: Option<String>,
}

impl Link {
    fn is_vlan(&self) -> bool {
        self.link_type.as_deref() == Some("vlan")
    }

    // Fields set on self win over those of the parent.
    fn overlay_on(&self, parent: &Link) -> Link {
        Link {
            id: self.id.clone(),
            link_type: self.link_type.clone().or_else(|| parent.link_type.clone()),
            ethernet_mac_address: self
                .ethernet_mac_address
                .clone()
                .or_else(|| parent.ethernet_mac_address.clone()),
            vlan_mac_address: self
                .vlan_mac_address
                .clone()
                .or_else(|| parent.vlan_mac_address.clone()),
            vlan_link: self.vlan_link.clone().or_else(|| parent.vlan_link.clone()),
            vlan_id: self.vlan_id.clone().or_else(|| parent.vlan_id.clone()),
            mtu: self.mtu.or(parent.mtu),
        }
    }

    fn mac_address(&self) -> Option<String> {
        self.ethernet_mac_address
            .as_ref()
            .or(self.vlan_mac_address.as_ref())
            .map(|m| m.to_lowercase())
    }
}

// First pass: overlay every VLAN link on its parent. Second pass: drop the
// parents, they are only reachable through their VLAN children.
fn resolve_links(links: &[Link]) -> BTreeMap<String, ResolvedLink> {
    let by_id: BTreeMap<&str, &Link> = links.iter().map(|l| (l.id.as_str(), l)).collect();

    let mut parents = BTreeSet::new();
    let mut merged = Vec::with_capacity(links.len());
    for link in links {
        if link.is_vlan() {
            let parent = match link.vlan_link.as_deref() {
                Some(parent_id) => {
                    parents.insert(parent_id.to_string());
                    by_id.get(parent_id).copied()
                }
                None => None,
            };
            match parent {
                Some(p) => merged.push(link.overlay_on(p)),
                None => {
                    warn!("VLAN link {} has no parent link, using it as is", link.id);
                    merged.push(link.clone());
                }
            }
        } else {
            merged.push(link.clone());
        }
    }

    merged
        .into_iter()
        .filter(|l| !parents.contains(&l.id))
        .filter_map(|l| match l.mac_address() {
            Some(hardware_address) => Some((
                l.id,
                ResolvedLink {
                    hardware_address,
                    vlan_id: l.vlan_id,
                },
            )),
            None => {
                warn!("Link {} has no hardware address, skipping", l.id);
                None
            }
        })
        .collect()
}

fn record_for(network: &Network, link: &ResolvedLink) -> Option<InterfaceRecord> {
    let Some(kind) = InterfaceKind::parse(&network.network_type) else {
        warn!(
            "Network {} has unknown type {}, skipping",
            network.id, network.network_type
        );
        return None;
    };
    let address = if kind.is_static() {
        match (&network.ip_address, &network.netmask) {
            (Some(ip_address), Some(netmask)) => Some(StaticAddress {
                ip_address: ip_address.clone(),
                netmask: netmask.clone(),
            }),
            _ => {
                warn!(
                    "Static network {} is missing an address or netmask, skipping",
                    network.id
                );
                return None;
            }
        }
    } else {
        None
    };
    Some(InterfaceRecord {
        id: network.id.clone(),
        hardware_address: link.hardware_address.clone(),
        kind,
        address,
        vlan_id: link.vlan_id.clone(),
        routes: network.routes.clone(),
    })
}

/// Build the interface map from a network info document. A document without
/// `networks` or `links` yields an empty map.
pub fn interfaces_from(info: &NetworkInfo) -> InterfaceMap {
    let (Some(networks), Some(links)) = (&info.networks, &info.links) else {
        debug!("Skipping interfaces, networks or links not present");
        return InterfaceMap::new();
    };

    let resolved = resolve_links(links);
    let mut interfaces = InterfaceMap::new();
    for network in networks {
        let Some(link) = resolved.get(&network.link) else {
            debug!(
                "Network {} references link {} which is not configurable, skipping",
                network.id, network.link
            );
            continue;
        };
        if let Some(record) = record_for(network, link)
            && let Some(previous) = interfaces.insert(record.hardware_address.clone(), record)
        {
            debug!(
                "Network {} for {} replaced by a later network",
                previous.id, previous.hardware_address
            );
        }
    }
    debug!("Final interfaces are: {:?}", interfaces);
    interfaces
}
