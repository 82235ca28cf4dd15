//! qemu-launch: create or start a single QEMU virtual machine.
//!
//! `create` allocates a qcow2 disk with `qemu-img` and boots the guest from
//! its installation media; `start` boots the existing disk. A hardware
//! virtualization probe runs first and only ever warns.

pub mod cli;
pub mod config;
pub mod host;
pub mod logging;
pub mod paths;
pub mod state_machine;
pub mod vm;
