//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Coracle - command-line droplet management.
#[derive(Parser, Debug)]
#[command(name = "coracle")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "CORACLE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Answer from canned fixtures instead of the live API.
    #[arg(long, global = true, env = "CORACLE_MOCK", hide = true)]
    pub mock: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage droplets.
    Droplet {
        /// Droplet subcommand.
        #[command(subcommand)]
        command: DropletCommands,
    },

    /// Browse available images.
    Image {
        /// Image subcommand.
        #[command(subcommand)]
        command: ImageCommands,
    },

    /// Manage droplet snapshots.
    Snapshot {
        /// Snapshot subcommand.
        #[command(subcommand)]
        command: SnapshotCommands,
    },

    /// Browse available regions.
    Region {
        /// Region subcommand.
        #[command(subcommand)]
        command: RegionCommands,
    },

    /// Browse available sizes.
    Size {
        /// Size subcommand.
        #[command(subcommand)]
        command: SizeCommands,
    },

    /// Manage registered SSH keys.
    Sshkey {
        /// SSH key subcommand.
        #[command(subcommand)]
        command: SshKeyCommands,
    },

    /// Inspect provider events.
    Event {
        /// Event subcommand.
        #[command(subcommand)]
        command: EventCommands,
    },
}

/// Droplet subcommands.
#[derive(Subcommand, Debug)]
pub enum DropletCommands {
    /// List droplets.
    List {
        /// Show full droplet info.
        #[arg(long)]
        detail: bool,
    },

    /// Create a droplet.
    Create {
        /// Hostname for the new droplet.
        name: String,

        /// Droplet RAM allocation (configured default if omitted).
        #[arg(long)]
        size: Option<String>,

        /// Droplet image name (configured default if omitted).
        #[arg(long)]
        image: Option<String>,

        /// Droplet region (configured default if omitted).
        #[arg(long)]
        region: Option<String>,

        /// Registered key names to add to the droplet.
        #[arg(long)]
        keys: Vec<String>,

        /// Assign a private address where available.
        #[arg(long)]
        private_networking: bool,

        /// Disable VirtIO (not recommended).
        #[arg(long)]
        disable_virtio: bool,

        /// Return immediately instead of waiting for completion.
        #[arg(long)]
        no_wait: bool,
    },

    /// Show droplet details.
    Show {
        /// Droplet hostname.
        name: String,
    },

    /// Show droplet status.
    Status {
        /// Droplet hostname.
        name: String,
    },

    /// Boot a droplet.
    Start {
        /// Droplet hostname.
        name: String,

        /// Return immediately instead of waiting for completion.
        #[arg(long)]
        no_wait: bool,
    },

    /// Send an ACPI shutdown signal.
    Shutdown {
        /// Droplet hostname.
        name: String,

        /// Return immediately instead of waiting for completion.
        #[arg(long)]
        no_wait: bool,
    },

    /// Reboot a droplet.
    Reboot {
        /// Droplet hostname.
        name: String,

        /// Return immediately instead of waiting for completion.
        #[arg(long)]
        no_wait: bool,
    },

    /// Power cycle a droplet.
    Powercycle {
        /// Droplet hostname.
        name: String,

        /// Return immediately instead of waiting for completion.
        #[arg(long)]
        no_wait: bool,
    },

    /// Power a droplet down hard.
    Poweroff {
        /// Droplet hostname.
        name: String,

        /// Return immediately instead of waiting for completion.
        #[arg(long)]
        no_wait: bool,
    },

    /// Snapshot a droplet (shut it down first).
    Snapshot {
        /// Droplet hostname.
        name: String,

        /// Name for the new snapshot.
        snapshot_name: String,

        /// Return immediately instead of waiting for completion.
        #[arg(long)]
        no_wait: bool,
    },

    /// Restore a droplet from a snapshot.
    Restore {
        /// Droplet hostname.
        name: String,

        /// Snapshot to restore from.
        snapshot_name: String,

        /// Return immediately instead of waiting for completion.
        #[arg(long)]
        no_wait: bool,
    },

    /// Rebuild a droplet from a stock image.
    Rebuild {
        /// Droplet hostname.
        name: String,

        /// Image to rebuild from.
        image: String,

        /// Return immediately instead of waiting for completion.
        #[arg(long)]
        no_wait: bool,
    },

    /// Rename a droplet.
    Rename {
        /// Current hostname.
        from: String,

        /// New hostname.
        to: String,

        /// Return immediately instead of waiting for completion.
        #[arg(long)]
        no_wait: bool,
    },

    /// Resize a droplet (shut it down first).
    Resize {
        /// Droplet hostname.
        name: String,

        /// New size name.
        size: String,

        /// Return immediately instead of waiting for completion.
        #[arg(long)]
        no_wait: bool,
    },

    /// Destroy a droplet.
    Destroy {
        /// Droplet hostname.
        name: String,

        /// Skip the secure erase of the underlying drive.
        #[arg(long)]
        no_scrub: bool,
    },

    /// Toggle automatic backups.
    #[command(group = clap::ArgGroup::new("toggle").required(true))]
    Backups {
        /// Droplet hostname.
        name: String,

        /// Turn backups on.
        #[arg(long, group = "toggle")]
        enable: bool,

        /// Turn backups off.
        #[arg(long, group = "toggle")]
        disable: bool,
    },

    /// Reset the root password (sends an email).
    Passwordreset {
        /// Droplet hostname.
        name: String,
    },
}

/// Image subcommands.
#[derive(Subcommand, Debug)]
pub enum ImageCommands {
    /// List available images.
    List,

    /// Show image details.
    Show {
        /// Image name.
        name: String,
    },

    /// List distinct operating systems across images.
    Oses,
}

/// Snapshot subcommands.
#[derive(Subcommand, Debug)]
pub enum SnapshotCommands {
    /// List your snapshots.
    List,

    /// Show snapshot details.
    Show {
        /// Snapshot name.
        name: String,
    },

    /// Transfer a snapshot to another region.
    Transfer {
        /// Snapshot name.
        name: String,

        /// Destination region.
        region: String,

        /// Return immediately instead of waiting for completion.
        #[arg(long)]
        no_wait: bool,
    },

    /// Destroy a snapshot.
    Destroy {
        /// Snapshot name.
        name: String,
    },
}

/// Region subcommands.
#[derive(Subcommand, Debug)]
pub enum RegionCommands {
    /// List available regions.
    List,
}

/// Size subcommands.
#[derive(Subcommand, Debug)]
pub enum SizeCommands {
    /// List available sizes.
    List,
}

/// SSH key subcommands.
#[derive(Subcommand, Debug)]
pub enum SshKeyCommands {
    /// List registered keys.
    List,

    /// Show a key, including its public portion.
    Show {
        /// Key name.
        name: String,
    },

    /// Register a public key.
    Add {
        /// Name to register the key under.
        name: String,

        /// Path to the public key file.
        public_key_path: PathBuf,
    },

    /// Replace the public portion of a registered key.
    Replace {
        /// Key name.
        name: String,

        /// Path to the new public key file.
        public_key_path: PathBuf,
    },

    /// Deregister a key.
    Destroy {
        /// Key name.
        name: String,
    },
}

/// Event subcommands.
#[derive(Subcommand, Debug)]
pub enum EventCommands {
    /// Show event details.
    Show {
        /// Event id.
        id: u64,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_a_droplet_create_invocation() {
        let cli = Cli::try_parse_from([
            "coracle",
            "droplet",
            "create",
            "web-1",
            "--size",
            "1GB",
            "--keys",
            "laptop",
            "--keys",
            "workstation",
            "--no-wait",
        ])
        .unwrap();

        match cli.command {
            Commands::Droplet {
                command:
                    DropletCommands::Create {
                        name,
                        size,
                        keys,
                        no_wait,
                        ..
                    },
            } => {
                assert_eq!(name, "web-1");
                assert_eq!(size.as_deref(), Some("1GB"));
                assert_eq!(keys, ["laptop", "workstation"]);
                assert!(no_wait);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn backups_flags_conflict() {
        let result = Cli::try_parse_from([
            "coracle", "droplet", "backups", "web-1", "--enable", "--disable",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn backups_requires_a_direction() {
        let result = Cli::try_parse_from(["coracle", "droplet", "backups", "web-1"]);
        assert!(result.is_err());

        let cli =
            Cli::try_parse_from(["coracle", "droplet", "backups", "web-1", "--disable"]).unwrap();
        match cli.command {
            Commands::Droplet {
                command: DropletCommands::Backups {
                    enable, disable, ..
                },
            } => {
                assert!(!enable);
                assert!(disable);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }
}
