//! CLI module for the coracle tool.
//!
//! This module provides the command-line interface for managing droplets
//! and their supporting resources.

mod commands;
mod output;

pub use commands::{
    Cli, Commands, DropletCommands, EventCommands, ImageCommands, OutputFormat, RegionCommands,
    SizeCommands, SnapshotCommands, SshKeyCommands,
};
pub use output::OutputFormatter;
