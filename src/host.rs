//! Host capability and resource queries.
//!
//! [`check_virtualization_support`] answers whether the host can accelerate
//! the guest with hardware virtualization. The answer is advisory: the
//! launcher warns on anything but [`Capability::Available`] and carries on.
//!
//! [`HostResources`] reports total RAM and hardware threads so the
//! configuration can be bounded before the emulator is started.

use std::fmt;

use tracing::{debug, warn};

/// Result of probing the host for hardware virtualization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    /// Hardware virtualization is enabled and usable by this user.
    Available,
    /// The host reports the feature as missing or disabled.
    Unavailable(String),
    /// The query itself failed, so the state is not known.
    Unknown(String),
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Available => f.write_str("available"),
            Capability::Unavailable(reason) => write!(f, "unavailable ({reason})"),
            Capability::Unknown(reason) => write!(f, "unknown ({reason})"),
        }
    }
}

/// Source of the virtualization capability answer.
///
/// The launcher only depends on this trait so a fixed answer can be injected.
pub trait CapabilityProbe {
    fn probe(&self) -> Capability;
}

/// Queries the real host.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostProbe;

impl CapabilityProbe for HostProbe {
    fn probe(&self) -> Capability {
        check_virtualization_support()
    }
}

/// Probe the host for hardware virtualization support.
pub fn check_virtualization_support() -> Capability {
    let capability = imp::probe();
    debug!(%capability, "virtualization capability probed");
    capability
}

/// Log the advisory message for a non-available capability.
///
/// Returns `true` when a warning was emitted.
pub fn report_capability(capability: &Capability) -> bool {
    match capability {
        Capability::Available => false,
        Capability::Unavailable(reason) => {
            warn!(
                reason = %reason,
                "hardware virtualization is not enabled; the VM will run slowly or fail to accelerate"
            );
            true
        }
        Capability::Unknown(reason) => {
            warn!(
                reason = %reason,
                "could not determine whether hardware virtualization is enabled; continuing anyway"
            );
            true
        }
    }
}

// ---------------------------------------------------------------------------
// Platform probes
// ---------------------------------------------------------------------------

#[cfg(target_os = "linux")]
mod imp {
    use std::io::ErrorKind;

    use super::Capability;

    const KVM_DEVICE: &str = "/dev/kvm";

    pub fn probe() -> Capability {
        let result = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(KVM_DEVICE);
        classify_open(result.map(drop))
    }

    pub(super) fn classify_open(result: std::io::Result<()>) -> Capability {
        match result {
            Ok(()) => Capability::Available,
            Err(e) if e.kind() == ErrorKind::NotFound => Capability::Unavailable(format!(
                "{KVM_DEVICE} does not exist; is the kvm module loaded and virtualization enabled in firmware?"
            )),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => Capability::Unavailable(format!(
                "no read/write access to {KVM_DEVICE}; add the user to the kvm group"
            )),
            Err(e) => Capability::Unknown(format!("open {KVM_DEVICE}: {e}")),
        }
    }
}

#[cfg(target_os = "macos")]
mod imp {
    use std::process::Command;

    use super::Capability;

    pub fn probe() -> Capability {
        match Command::new("sysctl").args(["-n", "kern.hv_support"]).output() {
            Ok(output) if output.status.success() => {
                classify_sysctl(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => Capability::Unknown(format!("sysctl exited with {}", output.status)),
            Err(e) => Capability::Unknown(format!("spawn `sysctl`: {e}")),
        }
    }

    pub(super) fn classify_sysctl(stdout: &str) -> Capability {
        match stdout.trim() {
            "1" => Capability::Available,
            "0" => Capability::Unavailable("kern.hv_support is 0".to_string()),
            other => Capability::Unknown(format!("unexpected kern.hv_support value {other:?}")),
        }
    }
}

#[cfg(target_os = "windows")]
mod imp {
    use std::process::Command;

    use super::Capability;

    const QUERY: &str =
        "(Get-WindowsOptionalFeature -Online -FeatureName HypervisorPlatform).State";

    pub fn probe() -> Capability {
        match Command::new("powershell")
            .args(["-NoProfile", "-NonInteractive", "-Command", QUERY])
            .output()
        {
            Ok(output) if output.status.success() => {
                classify_feature_state(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Capability::Unknown(format!(
                    "feature query exited with {}: {}",
                    output.status,
                    stderr.trim()
                ))
            }
            Err(e) => Capability::Unknown(format!("spawn `powershell`: {e}")),
        }
    }

    pub(super) fn classify_feature_state(stdout: &str) -> Capability {
        match stdout.trim() {
            "Enabled" => Capability::Available,
            "" => Capability::Unknown("feature query returned nothing".to_string()),
            state => Capability::Unavailable(format!("HypervisorPlatform feature is {state}")),
        }
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
mod imp {
    use super::Capability;

    pub fn probe() -> Capability {
        Capability::Unknown(format!(
            "no virtualization probe for {}",
            std::env::consts::OS
        ))
    }
}

// ---------------------------------------------------------------------------
// Host resources
// ---------------------------------------------------------------------------

/// Upper bounds the configuration is validated against.
///
/// `None` means the bound could not be determined and is not enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostResources {
    pub memory_mb: Option<u64>,
    pub threads: Option<u32>,
}

impl HostResources {
    /// Query the running host.
    pub fn detect() -> Self {
        let threads = std::thread::available_parallelism()
            .ok()
            .and_then(|n| u32::try_from(n.get()).ok());
        let resources = Self {
            memory_mb: total_memory_mb(),
            threads,
        };
        debug!(?resources, "host resources detected");
        resources
    }
}

#[cfg(target_os = "linux")]
fn total_memory_mb() -> Option<u64> {
    let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
    parse_meminfo_total_mb(&meminfo)
}

#[cfg(target_os = "macos")]
fn total_memory_mb() -> Option<u64> {
    let output = std::process::Command::new("sysctl")
        .args(["-n", "hw.memsize"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let bytes: u64 = String::from_utf8_lossy(&output.stdout).trim().parse().ok()?;
    Some(bytes / (1024 * 1024))
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn total_memory_mb() -> Option<u64> {
    None
}

/// Extract `MemTotal` from `/proc/meminfo` content, in megabytes.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_meminfo_total_mb(meminfo: &str) -> Option<u64> {
    let line = meminfo.lines().find(|l| l.starts_with("MemTotal:"))?;
    let mut fields = line.split_whitespace().skip(1);
    let value: u64 = fields.next()?.parse().ok()?;
    match fields.next() {
        Some("kB") | None => Some(value / 1024),
        Some(_) => None,
    }
}
