//! Subcommand implementations

pub mod actions;
pub mod admin;
pub mod containers;
