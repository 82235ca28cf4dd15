//! The create/start flow.
//!
//! ## Architecture
//!
//! ```text
//! run_action(action, config, runner, probe)
//!     ├─► probe.probe()             advisory only, never blocks
//!     └─► LaunchMachine
//!             ├─► CreatingImage   →  create_disk_image()  →  qemu-img create
//!             ├─► Booting{mode}   →  launch_vm(mode)      →  qemu-system-*
//!             └─► Exited{code}    →  Ok(()) | Err(failure)
//! ```

use anyhow::{Result, anyhow, bail};
use statig::prelude::*;
use tracing::{info, warn};

use crate::config::LaunchConfig;
use crate::host::{CapabilityProbe, report_capability};
use crate::state_machine::launch_sm::{EXIT_SUCCESS, LaunchEvent, LaunchMachine, Step};
use crate::vm::qemu::{disk_image_command, launch_command};
use crate::vm::runner::{ProcessRunner, ToolOutcome};
use crate::vm::{Action, BootMode};

/// Run `action` to completion.
///
/// The capability check only warns. External calls happen strictly one after
/// another; the first failure ends the run and is returned as the error.
pub async fn run_action<R, P>(
    action: Action,
    config: &LaunchConfig,
    runner: &R,
    probe: &P,
) -> Result<()>
where
    R: ProcessRunner,
    P: CapabilityProbe,
{
    let capability = probe.probe();
    report_capability(&capability);
    info!(%action, %capability, "dispatching");

    let mut sm = LaunchMachine.state_machine();
    sm.handle(&LaunchEvent::Requested(action));

    let (code, failure) = loop {
        let event = match LaunchMachine::next_step(sm.state()) {
            Step::CreateImage => {
                LaunchEvent::ImageFinished(create_disk_image(config, runner).await)
            }
            Step::Boot(mode) => LaunchEvent::VmExited(launch_vm(config, mode, runner).await),
            Step::Finish { code, failure } => break (code, failure),
            Step::AwaitRequest => bail!("launcher did not leave the idle state for {action}"),
        };
        sm.handle(&event);
    };

    if code == EXIT_SUCCESS {
        Ok(())
    } else {
        Err(anyhow!(
            failure.unwrap_or_else(|| format!("{action} failed with code {code}"))
        ))
    }
}

/// Create the qcow2 disk image described by `config`.
///
/// The parent directory is created first. An existing image is left for
/// `qemu-img` to deal with.
pub async fn create_disk_image<R: ProcessRunner>(
    config: &LaunchConfig,
    runner: &R,
) -> ToolOutcome {
    let path = &config.disk_path;

    if !runner.is_dry_run() {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return ToolOutcome::SpawnFailed(format!(
                    "create parent directory {}: {e}",
                    parent.display()
                ));
            }
        }
        if path.exists() {
            warn!(path = %path.display(), "disk image already exists and will be recreated");
        }
    }

    info!(
        path = %path.display(),
        size_gb = config.disk_size_gb,
        "creating disk image"
    );
    runner.run(&disk_image_command(config)).await
}

/// Boot the VM in `mode` and wait for the emulator to exit.
pub async fn launch_vm<R: ProcessRunner>(
    config: &LaunchConfig,
    mode: BootMode,
    runner: &R,
) -> ToolOutcome {
    info!(
        ?mode,
        disk = %config.disk_path.display(),
        memory_mb = config.memory_mb,
        cpus = config.cpus,
        "launching VM"
    );
    runner.run(&launch_command(config, mode)).await
}
