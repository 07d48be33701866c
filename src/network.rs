use anyhow::{Context, Result, anyhow};
use futures::StreamExt;
use log::debug;
use netlink_packet_route::link::{LinkAttribute, LinkMessage};
use rtnetlink::{Handle as NlHandle, LinkUnspec, new_connection};
use tokio::runtime::{Builder, Handle as RtHandle, Runtime};

use crate::probe::LinkControl;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InterfaceInfo {
    name: String,
    mac: Option<[u8; 6]>,
    ifindex: u32,
}

pub(crate) struct NetlinkConnection {
    handle: NlHandle,
}

impl NetlinkConnection {
    pub(crate) fn new() -> Result<Self> {
        let rt = RtHandle::try_current().map_err(|_| anyhow!("tokio is not running"))?;
        let (connection, handle, _) =
            new_connection().map_err(|e| anyhow!("unable to create netlink socket: {}", e))?;
        rt.spawn(connection);
        Ok(Self { handle })
    }

    pub(crate) async fn get_interfaces(&self) -> Result<Vec<InterfaceInfo>> {
        let mut interfaces = Vec::new();
        let mut links = self.handle.link().get().execute();
        while let Some(link_res) = links.next().await {
            let link = link_res?;
            interfaces.push(extract_interface(link));
        }
        Ok(interfaces)
    }

    pub(crate) async fn link_set(&self, message: LinkMessage) -> Result<()> {
        let err = format!("failed to set link attributes: {:?}", &message);
        self.handle.link().set(message).execute().await.context(err)
    }

    pub(crate) async fn link_up(&self, ifindex: u32) -> Result<()> {
        self.link_set(LinkUnspec::new_with_index(ifindex).up().build())
            .await
            .context("failed to set link up")
    }

    pub(crate) async fn link_up_by_name(&self, name: &str) -> Result<()> {
        let interfaces = self.get_interfaces().await?;
        let interface = interfaces
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| anyhow!("no link named {}", name))?;
        debug!(
            "Setting {} (index {}, mac {}) up",
            interface.name,
            interface.ifindex,
            interface.mac.map(mac_to_string).unwrap_or_default()
        );
        self.link_up(interface.ifindex).await
    }
}

/// `LinkControl` over rtnetlink. The runtime is owned here so callers can
/// stay synchronous. The netlink connection task only runs while `set_up`
/// blocks on it.
pub struct NetlinkLinks {
    rt: Runtime,
    nl: NetlinkConnection,
}

impl NetlinkLinks {
    pub fn new() -> Result<Self> {
        let rt = Builder::new_current_thread()
            .enable_io()
            .build()
            .context("unable to start tokio runtime")?;
        let nl = {
            let _guard = rt.enter();
            NetlinkConnection::new().context("failed to create netlink connection")?
        };
        Ok(Self { rt, nl })
    }
}

impl LinkControl for NetlinkLinks {
    fn set_up(&self, name: &str) -> Result<()> {
        self.rt
            .block_on(self.nl.link_up_by_name(name))
            .with_context(|| format!("unable to bring up {}", name))
    }
}

fn extract_interface(link: LinkMessage) -> InterfaceInfo {
    let mut name: String = "".into();
    let mut mac = None;
    let ifindex = link.header.index;

    for nla in &link.attributes {
        match nla {
            LinkAttribute::IfName(n) => name = n.clone(),
            LinkAttribute::Address(addr) if addr.len() == 6 => {
                let mut mac_arr = [0u8; 6];
                mac_arr.copy_from_slice(&addr[..6]);
                mac = Some(mac_arr);
            }
            _ => {}
        }
    }

    InterfaceInfo { name, mac, ifindex }
}

fn mac_to_string(mac: [u8; 6]) -> String {
    format!(
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    )
}
