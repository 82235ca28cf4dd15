//! qemu-launch: create or start a QEMU virtual machine.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use qemu_launch::cli::Args;
use qemu_launch::config;
use qemu_launch::host::{HostProbe, HostResources};
use qemu_launch::logging;
use qemu_launch::paths::LauncherPaths;
use qemu_launch::state_machine::launch_sm::EXIT_FAILURE;
use qemu_launch::vm::{DryRunRunner, TokioRunner, run_action};

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            // --help and --version are not failures
            return if e.use_stderr() {
                failure()
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let paths = LauncherPaths::resolve();
    let _log_guard = logging::init(paths.as_ref());

    match run(args, paths) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            failure()
        }
    }
}

fn run(args: Args, paths: Option<LauncherPaths>) -> Result<()> {
    let paths = paths.context("could not determine the home directory; set HOME")?;

    let config = config::load(
        &paths,
        args.config.as_deref(),
        |name| std::env::var(name).ok(),
        args.overrides(),
    )?;
    config
        .validate(args.action, &HostResources::detect())
        .context("invalid configuration")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("create tokio runtime")?;

    if args.dry_run {
        runtime.block_on(run_action(args.action, &config, &DryRunRunner, &HostProbe))
    } else {
        runtime.block_on(run_action(args.action, &config, &TokioRunner, &HostProbe))
    }
}

fn failure() -> ExitCode {
    ExitCode::from(EXIT_FAILURE as u8)
}
