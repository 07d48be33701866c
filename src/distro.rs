use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Result, anyhow};
use log::debug;

use crate::constants::FILE_ETC_OS_RELEASE;
use crate::fs::JoinRelative;
use crate::render::{DebianRenderer, RedHatRenderer, Renderer};

/// Network configuration dialect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Distro {
    Debian,
    RedHat,
}

impl Distro {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "debian" | "ubuntu" => Some(Self::Debian),
            "redhat" | "centos" | "fedora" | "suse" | "opensuse" => Some(Self::RedHat),
            _ => None,
        }
    }

    /// Use `override_name` when given, otherwise look at `ID` then each
    /// entry of `ID_LIKE` in the target's os-release.
    pub fn detect<P: AsRef<Path>>(target_root: P, override_name: Option<&str>) -> Result<Option<Self>> {
        if let Some(name) = override_name {
            return Ok(Self::from_name(name));
        }
        let path = target_root.as_ref().join_relative(FILE_ETC_OS_RELEASE);
        let content = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{:?} not present", path);
                return Ok(None);
            }
            Err(e) => return Err(anyhow!("unable to read {:?}: {}", path, e)),
        };
        Ok(from_os_release(&content))
    }

    pub fn renderer<P: AsRef<Path>>(self, target_root: P) -> Box<dyn Renderer> {
        match self {
            Self::Debian => Box::new(DebianRenderer::new(target_root)),
            Self::RedHat => Box::new(RedHatRenderer::new(target_root)),
        }
    }
}

fn os_release_value<'a>(content: &'a str, key: &str) -> Option<&'a str> {
    content.lines().find_map(|line| {
        let (k, v) = line.split_once('=')?;
        (k.trim() == key).then(|| v.trim().trim_matches(|c| c == '"' || c == '\''))
    })
}

fn from_os_release(content: &str) -> Option<Distro> {
    let id = os_release_value(content, "ID").into_iter();
    let id_like = os_release_value(content, "ID_LIKE")
        .into_iter()
        .flat_map(str::split_whitespace);
    id.chain(id_like).find_map(Distro::from_name)
}
