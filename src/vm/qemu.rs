//! QEMU command-line construction.
//!
//! Both builders are pure: they turn a [`LaunchConfig`] into a
//! [`ToolCommand`] without touching the filesystem, so the exact argument
//! list can be asserted in tests and printed by `--dry-run`.

use crate::config::LaunchConfig;
use crate::vm::{BootMode, ToolCommand};

/// Disk image format used for every image the launcher creates or attaches.
pub const DISK_FORMAT: &str = "qcow2";

/// Id tying the emulated NIC to its user-mode backend.
const NETDEV_ID: &str = "net0";

/// `qemu-img create -f qcow2 <disk_path> <size>G`
pub fn disk_image_command(config: &LaunchConfig) -> ToolCommand {
    ToolCommand::new(&config.image_tool)
        .arg("create")
        .opt("-f", DISK_FORMAT)
        .arg(config.disk_path.display().to_string())
        .arg(format!("{}G", config.disk_size_gb))
}

/// Emulator invocation for `mode`.
///
/// The argument order is fixed; first boot additionally attaches the
/// installation media and lets it boot ahead of the disk.
pub fn launch_command(config: &LaunchConfig, mode: BootMode) -> ToolCommand {
    let mut cmd = ToolCommand::new(&config.emulator)
        .opt("-accel", &config.accel)
        .opt(
            "-drive",
            format!(
                "file={},format={DISK_FORMAT},media=disk",
                escape_opt_value(&config.disk_path.display().to_string())
            ),
        )
        .opt("-m", config.memory_mb.to_string())
        .opt("-smp", config.cpus.to_string())
        .opt(
            "-device",
            format!("{},netdev={NETDEV_ID}", escape_opt_value(&config.nic_model)),
        )
        .opt("-netdev", format!("user,id={NETDEV_ID}"));

    if mode == BootMode::FirstBoot {
        if let Some(media) = &config.install_media {
            cmd = cmd.opt("-cdrom", media.display().to_string());
        }
    }

    cmd.opt("-display", &config.display)
        .opt("-boot", boot_order(mode))
}

/// Escape a value placed inside a QEMU `key=value,...` option list.
///
/// QEMU splits option lists on `,` and reads `,,` as a literal comma.
pub fn escape_opt_value(value: &str) -> String {
    value.replace(',', ",,")
}

fn boot_order(mode: BootMode) -> &'static str {
    match mode {
        BootMode::FirstBoot => "order=dc,strict=on",
        BootMode::Subsequent => "order=c,strict=on",
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn config() -> LaunchConfig {
        let mut config = LaunchConfig::defaults_with_disk(PathBuf::from("/vms/win.qcow2"));
        config.memory_mb = 8192;
        config.cpus = 4;
        config.install_media = Some(PathBuf::from("/isos/installer.iso"));
        config.accel = "kvm".to_string();
        config.display = "sdl".to_string();
        config
    }

    #[test]
    fn disk_image_command_matches_qemu_img_syntax() {
        let cmd = disk_image_command(&config());
        assert_eq!(cmd.program, "qemu-img");
        assert_eq!(
            cmd.args,
            vec!["create", "-f", "qcow2", "/vms/win.qcow2", "30G"]
        );
    }

    #[test]
    fn first_boot_attaches_media_and_boots_it_first() {
        let cmd = launch_command(&config(), BootMode::FirstBoot);
        assert_eq!(cmd.program, "qemu-system-x86_64");
        assert_eq!(
            cmd.args,
            vec![
                "-accel",
                "kvm",
                "-drive",
                "file=/vms/win.qcow2,format=qcow2,media=disk",
                "-m",
                "8192",
                "-smp",
                "4",
                "-device",
                "e1000,netdev=net0",
                "-netdev",
                "user,id=net0",
                "-cdrom",
                "/isos/installer.iso",
                "-display",
                "sdl",
                "-boot",
                "order=dc,strict=on",
            ]
        );
    }

    #[test]
    fn subsequent_boot_never_attaches_media() {
        let cmd = launch_command(&config(), BootMode::Subsequent);
        assert_eq!(cmd.value_of("-cdrom"), None);
        assert_eq!(cmd.value_of("-boot"), Some("order=c,strict=on"));
        assert_eq!(cmd.value_of("-m"), Some("8192"));
    }

    #[test]
    fn first_boot_without_media_still_builds() {
        let mut config = config();
        config.install_media = None;
        let cmd = launch_command(&config, BootMode::FirstBoot);
        assert_eq!(cmd.value_of("-cdrom"), None);
    }

    #[test]
    fn commas_in_option_values_are_doubled() {
        let mut config = config();
        config.disk_path = PathBuf::from("/vms/a,b/disk.qcow2");
        config.nic_model = "e1000,x".to_string();

        let cmd = launch_command(&config, BootMode::Subsequent);
        assert_eq!(
            cmd.value_of("-drive"),
            Some("file=/vms/a,,b/disk.qcow2,format=qcow2,media=disk")
        );
        assert_eq!(cmd.value_of("-device"), Some("e1000,,x,netdev=net0"));

        // qemu-img takes the path as a plain argument
        assert_eq!(disk_image_command(&config).args[3], "/vms/a,b/disk.qcow2");
    }

    #[test]
    fn escape_leaves_plain_values_alone() {
        assert_eq!(escape_opt_value("/vms/win.qcow2"), "/vms/win.qcow2");
        assert_eq!(escape_opt_value("a,,b"), "a,,,,b");
    }

    #[test]
    fn custom_programs_are_honoured() {
        let mut config = config();
        config.emulator = "/opt/qemu/bin/qemu-system-aarch64".to_string();
        config.image_tool = "/opt/qemu/bin/qemu-img".to_string();
        assert_eq!(disk_image_command(&config).program, "/opt/qemu/bin/qemu-img");
        assert_eq!(
            launch_command(&config, BootMode::Subsequent).program,
            "/opt/qemu/bin/qemu-system-aarch64"
        );
    }
}
