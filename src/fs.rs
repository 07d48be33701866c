use std::{
    fs::{File, create_dir, rename},
    io::ErrorKind,
    path::{MAIN_SEPARATOR_STR, Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use log::debug;
use rustix::fs::{Mode, chmod};

/// Create `path` and any missing parents. Only directories created here get
/// `mode` applied, existing ones are left alone.
pub fn mkdir_p<P: AsRef<Path>>(path: P, mode: Mode) -> Result<()> {
    let path_str = path.as_ref().to_string_lossy();
    for dir in descending_dirs(&path_str) {
        match create_dir(&dir) {
            Err(e) if e.kind() == ErrorKind::AlreadyExists => (),
            Err(e) => return Err(anyhow!("unable to create directory {}: {}", dir, e)),
            Ok(_) => {
                debug!("Created directory {}", &dir);
                chmod(&dir, mode)
                    .map_err(|e| anyhow!("unable to change mode of {}: {}", dir, e))?;
            }
        }
    }
    Ok(())
}

// Given a path, return a list of it and its parents in descending order.
// For example, "/a/b/c", returns the Vector ["/a", "/a/b", "/a/b/c"].
fn descending_dirs(path: &str) -> Vec<String> {
    let dirs = path.split('/').collect::<Vec<&str>>();
    (1..=dirs.len())
        .map(|i| dirs[..i].join("/"))
        .filter(|s| !s.is_empty())
        .collect()
}

// The behavior of Path::join is surprising, as it does not actually join paths
// when the path argument is absolute, rather it returns the absolute one. This
// version joins the paths as expected.
pub trait JoinRelative {
    fn join_relative<P: AsRef<Path>>(&self, path: P) -> PathBuf;
}

impl JoinRelative for Path {
    fn join_relative<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        let p = path.as_ref();
        match p.strip_prefix(MAIN_SEPARATOR_STR) {
            Ok(relative) => Path::join(self, relative),
            Err(_) => Path::join(self, p),
        }
    }
}

pub fn atomic_write<P: AsRef<Path>>(
    path: P,
    write: impl FnOnce(&File) -> Result<()>,
) -> Result<()> {
    let p = path.as_ref();
    let p_str = p.to_string_lossy();

    let dir_name = match p.parent() {
        Some(d) if d.as_os_str().is_empty() => Path::new("."),
        Some(d) => d,
        None => return Err(anyhow!("invalid path {}", p_str)),
    };
    let file_name = p
        .file_name()
        .ok_or_else(|| anyhow!("invalid path {}", p_str))?;
    let file_name_tmp = dir_name.join(format!(".{}.tmp", file_name.to_string_lossy()));

    {
        let f = File::create(&file_name_tmp)
            .with_context(|| format!("unable to create {}", file_name_tmp.to_string_lossy()))?;
        write(&f).context(format!("unable to write {}", p_str))?;
        f.sync_all().context(format!("unable to sync {}", p_str))?;
    }

    rename(&file_name_tmp, p).context(format!(
        "unable to rename {} to {}",
        file_name_tmp.to_string_lossy(),
        p_str
    ))?;
    let dir_name_str = dir_name.to_string_lossy();
    let dir = File::open(dir_name).context(format!("unable to open directory {}", dir_name_str))?;
    dir.sync_all()
        .context(format!("unable to sync directory {}", dir_name_str))
}
