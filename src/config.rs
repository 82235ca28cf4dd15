//! Launcher configuration.
//!
//! The effective [`LaunchConfig`] is assembled from layers, later layers
//! winning field by field:
//!
//! ```text
//! built-in defaults  <  config.toml  <  QEMU_LAUNCH_* env  <  CLI flags
//! ```
//!
//! Every layer is a [`ConfigLayer`] of optional fields, so the TOML file may
//! set any subset of keys. Unknown keys are rejected to catch typos.
//!
//! Validation happens once, after merging, against the requested action and
//! the host's resources (see [`LaunchConfig::validate`]).

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::{debug, info};

use crate::host::HostResources;
use crate::paths::LauncherPaths;
use crate::vm::Action;

/// Smallest disk image the launcher will ask `qemu-img` for.
pub const MIN_DISK_SIZE_GB: u32 = 1;

pub const DEFAULT_MEMORY_MB: u32 = 4096;
pub const DEFAULT_CPUS: u32 = 2;
pub const DEFAULT_DISK_SIZE_GB: u32 = 30;
pub const DEFAULT_EMULATOR: &str = "qemu-system-x86_64";
pub const DEFAULT_IMAGE_TOOL: &str = "qemu-img";
pub const DEFAULT_NIC_MODEL: &str = "e1000";

/// Prefix shared by all environment overrides.
pub const ENV_PREFIX: &str = "QEMU_LAUNCH_";

// ---------------------------------------------------------------------------
// Effective configuration
// ---------------------------------------------------------------------------

/// Fully resolved configuration. Immutable for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Guest memory in megabytes (`-m`).
    pub memory_mb: u32,
    /// Guest CPU cores (`-smp`).
    pub cpus: u32,
    /// qcow2 disk image attached to the guest.
    pub disk_path: PathBuf,
    /// Size used when the disk image is created.
    pub disk_size_gb: u32,
    /// Installation ISO, attached on first boot only.
    pub install_media: Option<PathBuf>,
    /// Emulator program name or path.
    pub emulator: String,
    /// Disk image tool program name or path.
    pub image_tool: String,
    /// QEMU accelerator (`kvm`, `hvf`, `whpx`, `tcg`).
    pub accel: String,
    /// QEMU display backend.
    pub display: String,
    /// Emulated NIC model for the user-mode network.
    pub nic_model: String,
}

impl LaunchConfig {
    /// Built-in defaults. The disk image lives in the launcher's VM directory.
    pub fn defaults(paths: &LauncherPaths) -> Self {
        Self::defaults_with_disk(paths.default_disk())
    }

    pub fn defaults_with_disk(disk_path: PathBuf) -> Self {
        Self {
            memory_mb: DEFAULT_MEMORY_MB,
            cpus: DEFAULT_CPUS,
            disk_path,
            disk_size_gb: DEFAULT_DISK_SIZE_GB,
            install_media: None,
            emulator: DEFAULT_EMULATOR.to_string(),
            image_tool: DEFAULT_IMAGE_TOOL.to_string(),
            accel: default_accel().to_string(),
            display: default_display().to_string(),
            nic_model: DEFAULT_NIC_MODEL.to_string(),
        }
    }

    /// Apply a layer on top of this configuration.
    pub fn apply(&mut self, layer: ConfigLayer) {
        let ConfigLayer {
            memory_mb,
            cpus,
            disk_path,
            disk_size_gb,
            install_media,
            emulator,
            image_tool,
            accel,
            display,
            nic_model,
        } = layer;

        if let Some(v) = memory_mb {
            self.memory_mb = v;
        }
        if let Some(v) = cpus {
            self.cpus = v;
        }
        if let Some(v) = disk_path {
            self.disk_path = v;
        }
        if let Some(v) = disk_size_gb {
            self.disk_size_gb = v;
        }
        if let Some(v) = install_media {
            self.install_media = Some(v);
        }
        if let Some(v) = emulator {
            self.emulator = v;
        }
        if let Some(v) = image_tool {
            self.image_tool = v;
        }
        if let Some(v) = accel {
            self.accel = v;
        }
        if let Some(v) = display {
            self.display = v;
        }
        if let Some(v) = nic_model {
            self.nic_model = v;
        }
    }

    /// Check the configuration for `action` against the host's limits.
    ///
    /// Bounds the host could not report are skipped. The installation media
    /// is only required when the VM will boot from it, i.e. for `Create`.
    pub fn validate(&self, action: Action, host: &HostResources) -> Result<()> {
        if self.memory_mb == 0 {
            bail!("memory_mb must be positive");
        }
        if let Some(host_mb) = host.memory_mb {
            if u64::from(self.memory_mb) > host_mb {
                bail!(
                    "memory_mb {} exceeds host memory of {} MB",
                    self.memory_mb,
                    host_mb
                );
            }
        }

        if self.cpus == 0 {
            bail!("cpus must be positive");
        }
        if let Some(threads) = host.threads {
            if self.cpus > threads {
                bail!("cpus {} exceeds the host's {} hardware threads", self.cpus, threads);
            }
        }

        if self.disk_size_gb < MIN_DISK_SIZE_GB {
            bail!(
                "disk_size_gb must be at least {MIN_DISK_SIZE_GB}, got {}",
                self.disk_size_gb
            );
        }

        if self.disk_path.as_os_str().is_empty() {
            bail!("disk_path must not be empty");
        }
        if self.disk_path.is_dir() {
            bail!("disk_path {} is a directory", self.disk_path.display());
        }

        for (name, value) in [
            ("emulator", &self.emulator),
            ("image_tool", &self.image_tool),
            ("accel", &self.accel),
            ("display", &self.display),
            ("nic_model", &self.nic_model),
        ] {
            if value.trim().is_empty() {
                bail!("{name} must not be empty");
            }
        }

        if action == Action::Create {
            let Some(media) = &self.install_media else {
                bail!("install_media is required to create a VM (first boot installs from it)");
            };
            if !media.is_file() {
                bail!("install_media {} is not an existing file", media.display());
            }
        }

        Ok(())
    }
}

#[cfg(target_os = "linux")]
fn default_accel() -> &'static str {
    "kvm"
}

#[cfg(target_os = "macos")]
fn default_accel() -> &'static str {
    "hvf"
}

#[cfg(target_os = "windows")]
fn default_accel() -> &'static str {
    "whpx"
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn default_accel() -> &'static str {
    "tcg"
}

#[cfg(target_os = "linux")]
fn default_display() -> &'static str {
    "gtk"
}

#[cfg(target_os = "macos")]
fn default_display() -> &'static str {
    "cocoa"
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn default_display() -> &'static str {
    "sdl"
}

// ---------------------------------------------------------------------------
// Layers
// ---------------------------------------------------------------------------

/// A partial configuration: the TOML file, the environment, or CLI flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    pub memory_mb: Option<u32>,
    pub cpus: Option<u32>,
    pub disk_path: Option<PathBuf>,
    pub disk_size_gb: Option<u32>,
    pub install_media: Option<PathBuf>,
    pub emulator: Option<String>,
    pub image_tool: Option<String>,
    pub accel: Option<String>,
    pub display: Option<String>,
    pub nic_model: Option<String>,
}

impl ConfigLayer {
    /// Parse a layer from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("parse launcher config")
    }

    /// Read a layer from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Build a layer from `QEMU_LAUNCH_*` variables returned by `lookup`.
    ///
    /// Empty values are treated as unset. A numeric variable that does not
    /// parse is an error rather than being silently ignored.
    pub fn from_env<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.trim().is_empty())
        };

        Ok(Self {
            memory_mb: parse_env(&var, "MEMORY_MB")?,
            cpus: parse_env(&var, "CPUS")?,
            disk_path: var("DISK_PATH").map(PathBuf::from),
            disk_size_gb: parse_env(&var, "DISK_SIZE_GB")?,
            install_media: var("INSTALL_MEDIA").map(PathBuf::from),
            emulator: var("EMULATOR"),
            image_tool: var("IMAGE_TOOL"),
            accel: var("ACCEL"),
            display: var("DISPLAY"),
            nic_model: var("NIC_MODEL"),
        })
    }
}

fn parse_env<T, F>(var: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    var(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("invalid {ENV_PREFIX}{name}={raw:?}"))
        })
        .transpose()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Assemble the effective configuration.
///
/// `config_file` is an explicit `--config` path and must exist. Without it
/// the default `config.toml` is read if present.
pub fn load<F>(
    paths: &LauncherPaths,
    config_file: Option<&Path>,
    env: F,
    cli: ConfigLayer,
) -> Result<LaunchConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = LaunchConfig::defaults(paths);

    match config_file {
        Some(path) => {
            info!(path = %path.display(), "loading config file");
            config.apply(ConfigLayer::from_file(path)?);
        }
        None => {
            let path = paths.config_file();
            if path.is_file() {
                info!(path = %path.display(), "loading config file");
                config.apply(ConfigLayer::from_file(&path)?);
            } else {
                debug!(path = %path.display(), "no config file, using defaults");
            }
        }
    }

    config.apply(ConfigLayer::from_env(env)?);
    config.apply(cli);

    debug!(?config, "effective configuration");
    Ok(config)
}
