//! CLI subcommands

pub mod classify;
pub mod nodes;
pub mod profiles;
