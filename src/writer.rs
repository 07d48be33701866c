use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use log::{debug, info};
use rustix::fs::Mode;

use crate::fs::{JoinRelative, atomic_write, mkdir_p};
use crate::render::FileSet;

/// Applies rendered files under a target root, or dumps them when dry-run is
/// set.
pub struct Writer {
    root: PathBuf,
    dry_run: bool,
}

impl Writer {
    pub fn new<P: AsRef<Path>>(root: P, dry_run: bool) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            dry_run,
        }
    }

    /// Write every non-empty file in lexical path order. In dry-run mode the
    /// files go to `out` instead and the filesystem is not touched.
    pub fn finish(&self, files: &FileSet, out: &mut dyn Write) -> Result<()> {
        debug!("Writing files: {:?}", files.keys().collect::<Vec<_>>());
        // FileSet is ordered, iteration is already sorted by path.
        for (path, content) in files {
            if content.is_empty() {
                debug!("Not writing empty {}", path);
                continue;
            }
            if self.dry_run {
                write!(out, "### Write {}\n{}", path, content)
                    .map_err(|e| anyhow!("unable to print {}: {}", path, e))?;
                continue;
            }
            let dest = self.root.join_relative(path);
            info!("Writing {:?}", dest);
            if let Some(parent) = dest.parent() {
                mkdir_p(parent, Mode::from(0o755))?;
            }
            atomic_write(&dest, |mut f| {
                f.write_all(content.as_bytes())
                    .map_err(|e| anyhow!("unable to write {:?}: {}", dest, e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn files() -> FileSet {
        FileSet::from([
            ("/etc/resolv.conf".to_string(), "".to_string()),
            (
                "/etc/network/interfaces.d/eth0.cfg".to_string(),
                "auto eth0\niface eth0 inet dhcp\n".to_string(),
            ),
            (
                "/etc/network/interfaces".to_string(),
                "auto lo\n".to_string(),
            ),
        ])
    }

    #[test]
    fn test_dry_run_dumps_sorted_and_skips_empty() {
        let tmp = TempDir::new().unwrap();
        let mut out = Vec::new();
        Writer::new(tmp.path(), true)
            .finish(&files(), &mut out)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "### Write /etc/network/interfaces\nauto lo\n\
             ### Write /etc/network/interfaces.d/eth0.cfg\nauto eth0\niface eth0 inet dhcp\n"
        );
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_writes_under_root() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("etc/network/interfaces.d")).unwrap();
        fs::write(tmp.path().join("etc/resolv.conf"), "nameserver 1.1.1.1\n").unwrap();
        let mut out = Vec::new();
        Writer::new(tmp.path(), false)
            .finish(&files(), &mut out)
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(
            fs::read_to_string(tmp.path().join("etc/network/interfaces")).unwrap(),
            "auto lo\n"
        );
        assert_eq!(
            fs::read_to_string(tmp.path().join("etc/network/interfaces.d/eth0.cfg")).unwrap(),
            "auto eth0\niface eth0 inet dhcp\n"
        );
        // Empty content leaves the existing file alone.
        assert_eq!(
            fs::read_to_string(tmp.path().join("etc/resolv.conf")).unwrap(),
            "nameserver 1.1.1.1\n"
        );
    }

    #[test]
    fn test_creates_missing_directories() {
        let tmp = TempDir::new().unwrap();
        let mut out = Vec::new();
        let files = FileSet::from([(
            "/etc/sysconfig/network-scripts/ifcfg-eth0".to_string(),
            "DEVICE=eth0\n".to_string(),
        )]);
        Writer::new(tmp.path(), false)
            .finish(&files, &mut out)
            .unwrap();
        assert_eq!(
            fs::read_to_string(tmp.path().join("etc/sysconfig/network-scripts/ifcfg-eth0"))
                .unwrap(),
            "DEVICE=eth0\n"
        );
    }
}
