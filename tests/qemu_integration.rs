//! Integration tests against a real QEMU installation.
//!
//! These need `qemu-img` and `qemu-system-x86_64` on `PATH`, so they are
//! gated with the `qemu-integration-tests` feature flag.
//!
//! # Running
//!
//! ```bash
//! cargo test --features qemu-integration-tests --test qemu_integration
//! ```

#![cfg(feature = "qemu-integration-tests")]

use std::path::Path;
use std::process::Command;

use qemu_launch::config::LaunchConfig;
use qemu_launch::host::{Capability, CapabilityProbe};
use qemu_launch::vm::lifecycle::create_disk_image;
use qemu_launch::vm::{Action, ToolOutcome, TokioRunner, run_action};

struct Advisory;

impl CapabilityProbe for Advisory {
    fn probe(&self) -> Capability {
        Capability::Unknown("integration test".to_string())
    }
}

/// Software emulation and no window, so the tests run on headless CI.
fn headless_config(dir: &Path) -> LaunchConfig {
    let mut config = LaunchConfig::defaults_with_disk(dir.join("images").join("disk.qcow2"));
    config.disk_size_gb = 1;
    config.memory_mb = 128;
    config.cpus = 1;
    config.accel = "tcg".to_string();
    config.display = "none".to_string();
    config
}

#[tokio::test]
async fn qemu_img_creates_a_qcow2_image() {
    let tmp = tempfile::tempdir().unwrap();
    let config = headless_config(tmp.path());

    let outcome = create_disk_image(&config, &TokioRunner).await;
    assert_eq!(outcome, ToolOutcome::Success);
    assert!(config.disk_path.is_file());

    let info = Command::new("qemu-img")
        .arg("info")
        .arg(&config.disk_path)
        .output()
        .unwrap();
    let info = String::from_utf8_lossy(&info.stdout);
    assert!(info.contains("file format: qcow2"), "{info}");
}

#[tokio::test]
async fn start_without_a_disk_image_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let config = headless_config(tmp.path());

    let err = run_action(Action::Start, &config, &TokioRunner, &Advisory)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("exited with code"), "{err}");
}
