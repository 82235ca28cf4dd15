//! VM management for qemu-launch.
//!
//! Builds the `qemu-img` and `qemu-system-*` command lines, runs them as
//! child processes, and drives the create/start flow.

use std::fmt;

pub mod lifecycle;
pub mod qemu;
pub mod runner;

// ---------------------------------------------------------------------------
// Shared types used across submodules
// ---------------------------------------------------------------------------

/// What the user asked the launcher to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Action {
    /// Create the disk image, then boot from the installation media.
    Create,
    /// Boot an existing disk image.
    Start,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Create => f.write_str("create"),
            Action::Start => f.write_str("start"),
        }
    }
}

/// Which devices the guest boots from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootMode {
    /// Installation media attached and tried before the disk.
    FirstBoot,
    /// Disk image only.
    Subsequent,
}

/// A fully built external command: program plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a flag and its value.
    pub fn opt(self, flag: &str, value: impl Into<String>) -> Self {
        self.arg(flag).arg(value)
    }

    /// Value following the first occurrence of `flag`, if any.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        let pos = self.args.iter().position(|a| a == flag)?;
        self.args.get(pos + 1).map(String::as_str)
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

/// Quote an argument for display when it contains whitespace or quotes.
fn quote(s: &str) -> String {
    if s.is_empty() || s.chars().any(|c| c.is_whitespace() || c == '\'' || c == '"') {
        format!("'{}'", s.replace('\'', "'\\''"))
    } else {
        s.to_string()
    }
}

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use lifecycle::run_action;
pub use runner::{DryRunRunner, ProcessRunner, TokioRunner, ToolOutcome};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_only_when_needed() {
        let cmd = ToolCommand::new("qemu-img")
            .arg("create")
            .opt("-f", "qcow2")
            .arg("/home/me/My VMs/disk.qcow2")
            .arg("30G");
        assert_eq!(
            cmd.to_string(),
            "qemu-img create -f qcow2 '/home/me/My VMs/disk.qcow2' 30G"
        );
    }

    #[test]
    fn value_lookup_finds_flag_values() {
        let cmd = ToolCommand::new("qemu-system-x86_64")
            .opt("-device", "e1000,netdev=net0")
            .opt("-m", "4096")
            .opt("-device", "virtio-rng");

        assert_eq!(cmd.value_of("-m"), Some("4096"));
        assert_eq!(cmd.value_of("-cdrom"), None);
        assert_eq!(cmd.value_of("-device"), Some("e1000,netdev=net0"));
    }

    #[test]
    fn action_display_is_lowercase() {
        assert_eq!(Action::Create.to_string(), "create");
        assert_eq!(Action::Start.to_string(), "start");
    }
}
