//! Launch dispatch state machine.
//!
//! ```text
//! Idle ──Requested(Create)──► CreatingImage ──ImageFinished(ok)──► Booting { FirstBoot }
//!   │                              │                                     │
//!   └──Requested(Start)──► Booting { Subsequent }                       │
//!                                  │                                     │
//!                  ImageFinished(err) / VmExited(_) ──────────────► Exited { code }
//! ```
//!
//! The machine performs no I/O. The driver in [`crate::vm::lifecycle`] runs
//! whatever the current state asks for and feeds the outcome back as an
//! event.

use statig::prelude::*;
use tracing::{debug, info};

use crate::vm::{Action, BootMode, ToolOutcome};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Events dispatched to the launch state machine.
#[derive(Debug, Clone)]
pub enum LaunchEvent {
    /// The CLI selected an action.
    Requested(Action),
    /// `qemu-img create` finished.
    ImageFinished(ToolOutcome),
    /// The emulator process exited.
    VmExited(ToolOutcome),
}

// ---------------------------------------------------------------------------
// Shared storage
// ---------------------------------------------------------------------------

/// The machine carries no shared data; each state holds what it needs.
#[derive(Debug, Default)]
pub struct LaunchMachine;

/// Work the driver must do to leave the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// No action dispatched yet.
    AwaitRequest,
    /// Run `qemu-img create`, then send `ImageFinished`.
    CreateImage,
    /// Run the emulator, then send `VmExited`.
    Boot(BootMode),
    /// Terminal: exit with `code`.
    Finish { code: i32, failure: Option<String> },
}

impl LaunchMachine {
    pub fn next_step(state: &State) -> Step {
        match state {
            State::Idle {} => Step::AwaitRequest,
            State::CreatingImage {} => Step::CreateImage,
            State::Booting { mode } => Step::Boot(*mode),
            State::Exited { code, failure } => Step::Finish {
                code: *code,
                failure: failure.clone(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// State machine implementation
// ---------------------------------------------------------------------------

#[state_machine(
    initial = "State::idle()",
    state(derive(Debug, Clone, PartialEq, Eq))
)]
impl LaunchMachine {
    /// Nothing dispatched yet.
    #[state]
    fn idle(&mut self, event: &LaunchEvent) -> Outcome<State> {
        match event {
            LaunchEvent::Requested(Action::Create) => {
                info!(target: "launch", "creating disk image before first boot");
                Transition(State::creating_image())
            }
            LaunchEvent::Requested(Action::Start) => {
                info!(target: "launch", "starting VM from existing disk image");
                Transition(State::booting(BootMode::Subsequent))
            }
            _ => Handled,
        }
    }

    /// Waiting for `qemu-img create`. A failure here never reaches the
    /// emulator.
    #[state]
    fn creating_image(&mut self, event: &LaunchEvent) -> Outcome<State> {
        match event {
            LaunchEvent::ImageFinished(ToolOutcome::Success) => {
                Transition(State::booting(BootMode::FirstBoot))
            }
            LaunchEvent::ImageFinished(outcome) => {
                debug!(target: "launch", %outcome, "disk image creation failed, not launching VM");
                Transition(State::exited(
                    EXIT_FAILURE,
                    Some(format!("disk image creation {outcome}")),
                ))
            }
            _ => Handled,
        }
    }

    /// The emulator is running in `mode`.
    #[state]
    fn booting(&mut self, event: &LaunchEvent, mode: &BootMode) -> Outcome<State> {
        match event {
            LaunchEvent::VmExited(ToolOutcome::Success) => {
                info!(target: "launch", ?mode, "VM exited cleanly");
                Transition(State::exited(EXIT_SUCCESS, None))
            }
            LaunchEvent::VmExited(outcome) => {
                debug!(target: "launch", ?mode, %outcome, "VM launch failed");
                Transition(State::exited(
                    EXIT_FAILURE,
                    Some(format!("emulator {outcome}")),
                ))
            }
            _ => Handled,
        }
    }

    /// Terminal. `failure` describes why `code` is non-zero.
    #[state]
    fn exited(
        &mut self,
        event: &LaunchEvent,
        code: &i32,
        failure: &Option<String>,
    ) -> Outcome<State> {
        let _ = (event, code, failure);
        Handled
    }
}
