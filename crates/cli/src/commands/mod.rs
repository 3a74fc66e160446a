//! CLI subcommands.

pub mod admin;
