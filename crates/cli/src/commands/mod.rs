//! CLI subcommands

pub mod alerts;
pub mod diagnostics;
pub mod health;
