//! Tests of the `qemu-launch` binary's argument handling and exit codes.
//!
//! Only paths that fail before any external program is started are exercised
//! here, so the tests need neither QEMU nor a home directory with state.

use std::process::Command;

fn launcher() -> Command {
    let tmp_home = std::env::temp_dir().join("qemu-launch-cli-tests");
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_qemu-launch"));
    cmd.env("HOME", &tmp_home)
        .env("XDG_CONFIG_HOME", tmp_home.join("config"))
        .env("XDG_DATA_HOME", tmp_home.join("data"))
        .env("RUST_LOG", "error");
    for (name, _) in std::env::vars_os() {
        if name.to_string_lossy().starts_with("QEMU_LAUNCH_") {
            cmd.env_remove(name);
        }
    }
    cmd
}

#[test]
fn unknown_action_exits_with_one() {
    let output = launcher().args(["--action", "Destroy"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Destroy"));
}

#[test]
fn missing_action_exits_with_one() {
    let output = launcher().output().unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn help_exits_with_zero() {
    let output = launcher().arg("--help").output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("--action"));
}

#[test]
fn create_without_install_media_is_rejected_before_running_anything() {
    let tmp = tempfile::tempdir().unwrap();
    let output = launcher()
        .args(["--action", "Create", "--dry-run", "--cpus", "1", "--memory-mb", "256"])
        .arg("--disk-path")
        .arg(tmp.path().join("disk.qcow2"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("install_media"));
    assert!(output.stdout.is_empty(), "no command may be printed");
}

#[test]
fn dry_run_start_prints_the_emulator_command() {
    let tmp = tempfile::tempdir().unwrap();
    let disk = tmp.path().join("disk.qcow2");
    let output = launcher()
        .args(["--action", "start", "--dry-run", "--cpus", "1", "--memory-mb", "256"])
        .arg("--disk-path")
        .arg(&disk)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("qemu-system-x86_64 "), "{stdout}");
    assert!(stdout.contains("-m 256"));
    assert!(!stdout.contains("-cdrom"));
}

#[test]
fn invalid_env_override_is_rejected() {
    let output = launcher()
        .args(["--action", "start", "--dry-run"])
        .env("QEMU_LAUNCH_CPUS", "many")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("QEMU_LAUNCH_CPUS"));
}
