//! CLI subcommands

pub mod check;
pub mod estimate;
pub mod status;
