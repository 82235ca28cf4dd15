//! State machines driving the launcher.

pub mod launch_sm;
