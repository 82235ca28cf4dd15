//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;

use crate::config::ConfigLayer;
use crate::vm::Action;

/// Create or start a QEMU virtual machine
#[derive(Parser, Debug)]
#[command(name = "qemu-launch", version, about = "Create or start a QEMU virtual machine")]
pub struct Args {
    /// Create the disk image and boot the installer, or start the existing VM
    #[arg(short, long, value_enum, ignore_case = true)]
    pub action: Action,

    /// Config file (default: ~/.config/qemu-launch/config.toml if present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the commands that would run instead of running them
    #[arg(long)]
    pub dry_run: bool,

    /// Guest memory in megabytes
    #[arg(long, value_name = "MB")]
    pub memory_mb: Option<u32>,

    /// Guest CPU cores
    #[arg(long, value_name = "N")]
    pub cpus: Option<u32>,

    /// qcow2 disk image path
    #[arg(long, value_name = "PATH")]
    pub disk_path: Option<PathBuf>,

    /// Size of the disk image created by `create`, in gigabytes
    #[arg(long, value_name = "GB")]
    pub disk_size_gb: Option<u32>,

    /// Installation ISO attached on first boot
    #[arg(long, value_name = "PATH")]
    pub install_media: Option<PathBuf>,
}

impl Args {
    /// The flag overrides as the top configuration layer.
    pub fn overrides(&self) -> ConfigLayer {
        ConfigLayer {
            memory_mb: self.memory_mb,
            cpus: self.cpus,
            disk_path: self.disk_path.clone(),
            disk_size_gb: self.disk_size_gb,
            install_media: self.install_media.clone(),
            ..ConfigLayer::default()
        }
    }
}
