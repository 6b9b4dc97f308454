use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};

/// Layout of the application directory: tracked documents in `sessions`, text buffers in `texts`
/// and rotated logs in `logs`.
#[derive(Debug, Clone)]
pub struct AppDirs {
    root: PathBuf,
}

impl AppDirs {
    /// Uses `root` when given and the platform state directory otherwise. The root is created if
    /// missing, the subdirectories are left to whoever writes into them.
    pub fn resolve(root: Option<PathBuf>) -> Result<Self> {
        let root = match root {
            Some(root) => root,
            None => default_root()?,
        };
        std::fs::create_dir_all(&root)
            .map_err(|e| anyhow!("Can't create application directory {root:?}: {e}"))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sessions(&self) -> PathBuf {
        self.root.join("sessions")
    }

    pub fn texts(&self) -> PathBuf {
        self.root.join("texts")
    }

    pub fn logs(&self) -> PathBuf {
        self.root.join("logs")
    }
}

#[cfg(windows)]
fn default_root() -> Result<PathBuf> {
    let appdata =
        env::var_os("APPDATA").ok_or_else(|| anyhow!("APPDATA should be present on Windows"))?;
    Ok(PathBuf::from(appdata).join("timeme"))
}

#[cfg(not(windows))]
fn default_root() -> Result<PathBuf> {
    let state = env::var_os("XDG_STATE_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".local/state")))
        .ok_or_else(|| anyhow!("Couldn't find neither XDG_STATE_HOME nor HOME"))?;
    Ok(state.join("timeme"))
}
