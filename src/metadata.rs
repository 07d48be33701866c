//! Provider documents read from the config drive.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use log::debug;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::constants::{
    DIR_CONFIG_DRIVE, DIR_CONFIG_DRIVE_LATEST, FILE_META_DATA, FILE_NETWORK_INFO,
    FILE_VENDOR_DATA,
};
use crate::fs::JoinRelative;

/// The `network_info.json` document. Every section is optional, a missing
/// section is treated the same as an empty one.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct NetworkInfo {
    pub links: Option<Vec<Link>>,
    pub networks: Option<Vec<Network>>,
    pub services: Option<Vec<Service>>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Link {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub link_type: Option<String>,
    #[serde(default)]
    pub ethernet_mac_address: Option<String>,
    #[serde(default)]
    pub vlan_mac_address: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub vlan_link: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub vlan_id: Option<String>,
    #[serde(default)]
    pub mtu: Option<u32>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Network {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub link: String,
    #[serde(rename = "type")]
    pub network_type: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub netmask: Option<String>,
    #[serde(default)]
    pub routes: Vec<Route>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Route {
    pub network: String,
    pub netmask: String,
    pub gateway: String,
}

impl Route {
    pub fn is_default(&self) -> bool {
        self.network == "0.0.0.0" && self.netmask == "0.0.0.0"
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Service {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct VendorData {
    network_info: Option<NetworkInfo>,
}

/// The `meta_data.json` document, only the fields this tool consumes.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct MetaData {
    pub name: Option<String>,
    pub public_keys: Option<BTreeMap<String, String>>,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// A config drive mounted at `<root>/mnt/config`.
#[derive(Clone, Debug)]
pub struct ConfigDrive {
    dir: PathBuf,
}

impl ConfigDrive {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            dir: root
                .as_ref()
                .join_relative(DIR_CONFIG_DRIVE)
                .join(DIR_CONFIG_DRIVE_LATEST),
        }
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Load network topology. `network_info.json` takes precedence, then the
    /// `network_info` key of `vendor_data.json`. No document at all yields an
    /// empty `NetworkInfo`.
    pub fn network_info(&self) -> Result<NetworkInfo> {
        if let Some(info) = self.read_json::<NetworkInfo>(FILE_NETWORK_INFO)? {
            return Ok(info);
        }
        if let Some(vendor) = self.read_json::<VendorData>(FILE_VENDOR_DATA)? {
            if let Some(info) = vendor.network_info {
                return Ok(info);
            }
            debug!("No network_info in {}", FILE_VENDOR_DATA);
        }
        Ok(NetworkInfo::default())
    }

    pub fn meta_data(&self) -> Result<Option<MetaData>> {
        self.read_json(FILE_META_DATA)
    }

    fn read_json<T: DeserializeOwned>(&self, file: &str) -> Result<Option<T>> {
        let path = self.path(file);
        let data = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{:?} not present", path);
                return Ok(None);
            }
            Err(e) => return Err(anyhow!("unable to read {:?}: {}", path, e)),
        };
        serde_json::from_str(&data)
            .map(Some)
            .map_err(|e| anyhow!("unable to parse {:?}: {}", path, e))
    }
}

/// Addresses of all `dns` services, in document order.
pub fn dns_servers(info: &NetworkInfo) -> Vec<String> {
    let Some(services) = &info.services else {
        debug!("Skipping DNS, no services in network info");
        return Vec::new();
    };
    services
        .iter()
        .filter(|s| s.service_type == "dns")
        .filter_map(|s| s.address.clone())
        .collect()
}
