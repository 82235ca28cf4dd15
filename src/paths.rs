//! Application directory structure for qemu-launch.
//!
//! Resolves the config, data, VM and log directories once at startup:
//!
//! - Config: `~/.config/qemu-launch/`  (human-editable, XDG-style)
//! - Data:   `~/Library/Application Support/qemu-launch/` on macOS,
//!           `~/.local/share/qemu-launch/` elsewhere
//! - VMs:    `<data>/vms/`  (default disk image location)
//! - Logs:   `~/Library/Logs/qemu-launch/` on macOS, `<data>/logs/` elsewhere

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

const APP_NAME: &str = "qemu-launch";

/// Name of the config file looked up inside [`LauncherPaths::config`].
pub const CONFIG_FILE: &str = "config.toml";

/// Name of the default disk image inside [`LauncherPaths::vms`].
pub const DEFAULT_DISK_FILE: &str = "disk.qcow2";

/// All resolved application directory paths.
#[derive(Debug, Clone)]
pub struct LauncherPaths {
    /// Human-editable config: `~/.config/qemu-launch/`
    pub config: PathBuf,
    /// Machine-managed application data root
    pub data: PathBuf,
    /// VM disk images
    pub vms: PathBuf,
    /// Application logs
    pub logs: PathBuf,
}

impl LauncherPaths {
    /// Resolve all paths from the user's home directory.
    /// Does not create any directories.
    pub fn resolve() -> Option<Self> {
        let home = home_dir()?;
        let paths = Self::from_home(&home);
        debug!(?paths, "resolved application paths");
        Some(paths)
    }

    /// Resolve all paths relative to an explicit home directory, honouring
    /// `XDG_CONFIG_HOME` and `XDG_DATA_HOME` from the process environment.
    pub fn from_home(home: &Path) -> Self {
        Self::from_home_with(home, |name| std::env::var_os(name))
    }

    /// Like [`from_home`](Self::from_home), reading XDG variables through
    /// `lookup`.
    pub fn from_home_with<F>(home: &Path, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let data = resolve_data_dir(home, &lookup);
        Self {
            config: resolve_config_dir(home, &lookup),
            vms: data.join("vms"),
            logs: resolve_log_dir(home, &data),
            data,
        }
    }

    /// Default location of the TOML config file.
    pub fn config_file(&self) -> PathBuf {
        self.config.join(CONFIG_FILE)
    }

    /// Default location of the VM disk image.
    pub fn default_disk(&self) -> PathBuf {
        self.vms.join(DEFAULT_DISK_FILE)
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}

// ---------------------------------------------------------------------------
// Platform-specific path resolution
// ---------------------------------------------------------------------------

fn xdg_dir(lookup: &dyn Fn(&str) -> Option<OsString>, name: &str) -> Option<PathBuf> {
    lookup(name)
        .filter(|dir| !dir.is_empty())
        .map(|dir| PathBuf::from(dir).join(APP_NAME))
}

fn resolve_config_dir(home: &Path, lookup: &dyn Fn(&str) -> Option<OsString>) -> PathBuf {
    xdg_dir(lookup, "XDG_CONFIG_HOME").unwrap_or_else(|| home.join(".config").join(APP_NAME))
}

#[cfg(target_os = "macos")]
fn resolve_data_dir(home: &Path, _lookup: &dyn Fn(&str) -> Option<OsString>) -> PathBuf {
    home.join("Library")
        .join("Application Support")
        .join(APP_NAME)
}

#[cfg(not(target_os = "macos"))]
fn resolve_data_dir(home: &Path, lookup: &dyn Fn(&str) -> Option<OsString>) -> PathBuf {
    xdg_dir(lookup, "XDG_DATA_HOME")
        .unwrap_or_else(|| home.join(".local").join("share").join(APP_NAME))
}

#[cfg(target_os = "macos")]
fn resolve_log_dir(home: &Path, _data: &Path) -> PathBuf {
    home.join("Library").join("Logs").join(APP_NAME)
}

#[cfg(not(target_os = "macos"))]
fn resolve_log_dir(_home: &Path, data: &Path) -> PathBuf {
    data.join("logs")
}
