//! Coracle CLI entrypoint.
//!
//! This is the main entrypoint for the coracle command-line tool.

use std::io::Write;
use std::process::ExitCode;

use coracle::api::ApiClient;
use coracle::cli::{
    Cli, Commands, DropletCommands, EventCommands, ImageCommands, OutputFormatter, RegionCommands,
    SizeCommands, SnapshotCommands, SshKeyCommands,
};
use coracle::config::{self, Config};
use coracle::error::{RenderError, Result};
use coracle::resources::{
    BackupsAction, CreateDroplet, Droplets, Events, Images, Regions, Sizes, Snapshots, SshKeys,
};
use coracle::waiter::Waiter;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = runtime.block_on(async {
        tokio::select! {
            result = run(cli) => result,
            _ = tokio::signal::ctrl_c() => {
                eprintln!("Interrupted.");
                Ok(())
            }
        }
    });

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    config::load_dotenv()?;
    let config = Config::load(cli.config.as_deref())?;
    let client = build_client(&config, cli.mock)?;

    match cli.command {
        Commands::Droplet { command } => cmd_droplet(&client, &config, command, &formatter).await,
        Commands::Image { command } => cmd_image(&client, command, &formatter).await,
        Commands::Snapshot { command } => cmd_snapshot(&client, command, &formatter).await,
        Commands::Region { command } => cmd_region(&client, command, &formatter).await,
        Commands::Size { command } => cmd_size(&client, command, &formatter).await,
        Commands::Sshkey { command } => cmd_sshkey(&client, command, &formatter).await,
        Commands::Event { command } => cmd_event(&client, command, &formatter).await,
    }
}

/// Creates an API client, canned or live.
fn build_client(config: &Config, mock: bool) -> Result<ApiClient> {
    if mock {
        debug!("using canned responses");
        return Ok(ApiClient::mocked());
    }
    let credentials = config.credentials()?;
    Ok(ApiClient::over_http(credentials).map_err(RenderError::Transport)?)
}

/// Droplet commands.
async fn cmd_droplet(
    client: &ApiClient,
    config: &Config,
    command: DropletCommands,
    formatter: &OutputFormatter,
) -> Result<()> {
    let droplets = Droplets::new(client.clone());

    match command {
        DropletCommands::List { detail } => {
            let records = droplets.list().await?;
            warn_on_duplicate_hostnames(&records, formatter);
            if detail {
                for record in &records {
                    println!("{}", formatter.format_record(record));
                }
            } else {
                println!(
                    "{}",
                    formatter.format_listing(
                        &["id", "name", "size_id", "region_id", "status", "ip_address"],
                        &records,
                    )
                );
            }
        }
        DropletCommands::Create {
            name,
            size,
            image,
            region,
            keys,
            private_networking,
            disable_virtio,
            no_wait,
        } => {
            let mut request = CreateDroplet::new()
                .name(name)
                .size(size.unwrap_or_else(|| config.size.clone()))
                .image(image.unwrap_or_else(|| config.image.clone()))
                .region(region.unwrap_or_else(|| config.region.clone()))
                .keys(if keys.is_empty() {
                    config.keys.clone()
                } else {
                    keys
                });
            request.private_networking = private_networking;
            request.disable_virtio = disable_virtio;

            let record = droplets.create(&request).await?;
            let id = record.id().map_err(RenderError::Shape)?;

            if no_wait {
                println!("{}", formatter.success(&format!("Droplet {id} creating")));
            } else {
                eprint!("Waiting for droplet to become active");
                let result = Waiter::new().wait_for_droplet(&droplets, id, "active").await;
                eprintln!();
                result?;
                println!("{}", formatter.success(&format!("Droplet {id} active")));
            }
        }
        DropletCommands::Show { name } => {
            let record = droplets.show(&name).await?;
            println!("{}", formatter.format_record(&record));
        }
        DropletCommands::Status { name } => {
            println!("{}", droplets.status(&name).await?);
        }
        DropletCommands::Start { name, no_wait } => {
            let event_id = droplets.start(&name).await?;
            finish(client, event_id, no_wait, formatter).await?;
        }
        DropletCommands::Shutdown { name, no_wait } => {
            let event_id = droplets.shutdown(&name).await?;
            finish(client, event_id, no_wait, formatter).await?;
        }
        DropletCommands::Reboot { name, no_wait } => {
            let event_id = droplets.reboot(&name).await?;
            finish(client, event_id, no_wait, formatter).await?;
        }
        DropletCommands::Powercycle { name, no_wait } => {
            let event_id = droplets.power_cycle(&name).await?;
            finish(client, event_id, no_wait, formatter).await?;
        }
        DropletCommands::Poweroff { name, no_wait } => {
            let event_id = droplets.power_off(&name).await?;
            finish(client, event_id, no_wait, formatter).await?;
        }
        DropletCommands::Snapshot {
            name,
            snapshot_name,
            no_wait,
        } => {
            let event_id = droplets.snapshot(&name, &snapshot_name).await?;
            finish(client, event_id, no_wait, formatter).await?;
        }
        DropletCommands::Restore {
            name,
            snapshot_name,
            no_wait,
        } => {
            let event_id = droplets.restore(&name, &snapshot_name).await?;
            finish(client, event_id, no_wait, formatter).await?;
        }
        DropletCommands::Rebuild {
            name,
            image,
            no_wait,
        } => {
            let event_id = droplets.rebuild(&name, &image).await?;
            finish(client, event_id, no_wait, formatter).await?;
        }
        DropletCommands::Rename { from, to, no_wait } => {
            let event_id = droplets.rename(&from, &to).await?;
            finish(client, event_id, no_wait, formatter).await?;
        }
        DropletCommands::Resize {
            name,
            size,
            no_wait,
        } => {
            let event_id = droplets.resize(&name, &size).await?;
            finish(client, event_id, no_wait, formatter).await?;
        }
        DropletCommands::Destroy { name, no_scrub } => {
            let scrub = config.scrub_data && !no_scrub;
            let event_id = droplets.destroy(&name, scrub).await?;
            println!(
                "{}",
                formatter.success(&format!("Destroying '{name}' (event {event_id})"))
            );
        }
        DropletCommands::Backups {
            name,
            enable,
            disable: _,
        } => {
            // the parser requires exactly one of --enable/--disable
            let action = if enable {
                BackupsAction::Enable
            } else {
                BackupsAction::Disable
            };
            let event_id = droplets.backups(action, &name).await?;
            finish(client, event_id, false, formatter).await?;
        }
        DropletCommands::Passwordreset { name } => {
            let event_id = droplets.password_reset(&name).await?;
            println!(
                "{}",
                formatter.success(&format!(
                    "Password reset for '{name}' submitted (event {event_id}), check your email"
                ))
            );
        }
    }

    Ok(())
}

/// Image commands.
async fn cmd_image(
    client: &ApiClient,
    command: ImageCommands,
    formatter: &OutputFormatter,
) -> Result<()> {
    let images = Images::new(client.clone());

    match command {
        ImageCommands::List => {
            let records = images.list().await?;
            println!(
                "{}",
                formatter.format_listing(&["id", "name", "distribution"], &records)
            );
        }
        ImageCommands::Show { name } => {
            let record = images.show(&name).await?;
            println!("{}", formatter.format_record(&record));
        }
        ImageCommands::Oses => {
            let flavours = images.oses().await?;
            println!("{}", formatter.format_names(&flavours));
        }
    }

    Ok(())
}

/// Snapshot commands.
async fn cmd_snapshot(
    client: &ApiClient,
    command: SnapshotCommands,
    formatter: &OutputFormatter,
) -> Result<()> {
    let snapshots = Snapshots::new(client.clone());

    match command {
        SnapshotCommands::List => {
            let records = snapshots.list().await?;
            println!(
                "{}",
                formatter.format_listing(&["id", "name", "distribution"], &records)
            );
        }
        SnapshotCommands::Show { name } => {
            let record = snapshots.show(&name).await?;
            println!("{}", formatter.format_record(&record));
        }
        SnapshotCommands::Transfer {
            name,
            region,
            no_wait,
        } => {
            let event_id = snapshots.transfer(&name, &region).await?;
            finish(client, event_id, no_wait, formatter).await?;
        }
        SnapshotCommands::Destroy { name } => {
            snapshots.destroy(&name).await?;
            println!("{}", formatter.success(&format!("Snapshot '{name}' destroyed")));
        }
    }

    Ok(())
}

/// Region commands.
async fn cmd_region(
    client: &ApiClient,
    command: RegionCommands,
    formatter: &OutputFormatter,
) -> Result<()> {
    match command {
        RegionCommands::List => {
            let regions = Regions::new(client.clone());
            let records = regions.list().await?;
            println!("{}", formatter.format_listing(&["id", "name"], &records));
        }
    }

    Ok(())
}

/// Size commands.
async fn cmd_size(
    client: &ApiClient,
    command: SizeCommands,
    formatter: &OutputFormatter,
) -> Result<()> {
    match command {
        SizeCommands::List => {
            let sizes = Sizes::new(client.clone());
            let records = sizes.list().await?;
            println!("{}", formatter.format_listing(&["id", "name"], &records));
        }
    }

    Ok(())
}

/// SSH key commands.
async fn cmd_sshkey(
    client: &ApiClient,
    command: SshKeyCommands,
    formatter: &OutputFormatter,
) -> Result<()> {
    let keys = SshKeys::new(client.clone());

    match command {
        SshKeyCommands::List => {
            let records = keys.list().await?;
            println!("{}", formatter.format_listing(&["id", "name"], &records));
        }
        SshKeyCommands::Show { name } => {
            let record = keys.show(&name).await?;
            println!("{}", formatter.format_record(&record));
        }
        SshKeyCommands::Add {
            name,
            public_key_path,
        } => {
            let public_key = std::fs::read_to_string(&public_key_path)?;
            let record = keys.add(&name, public_key.trim()).await?;
            let id = record.id().map_err(RenderError::Shape)?;
            println!(
                "{}",
                formatter.success(&format!("Key '{name}' registered (id {id})"))
            );
        }
        SshKeyCommands::Replace {
            name,
            public_key_path,
        } => {
            let public_key = std::fs::read_to_string(&public_key_path)?;
            keys.replace(&name, public_key.trim()).await?;
            println!("{}", formatter.success(&format!("Key '{name}' replaced")));
        }
        SshKeyCommands::Destroy { name } => {
            let status = keys.destroy(&name).await?;
            println!(
                "{}",
                formatter.success(&format!("Key '{name}' destroyed: {status}"))
            );
        }
    }

    Ok(())
}

/// Event commands.
async fn cmd_event(
    client: &ApiClient,
    command: EventCommands,
    formatter: &OutputFormatter,
) -> Result<()> {
    match command {
        EventCommands::Show { id } => {
            let events = Events::new(client.clone());
            let record = events.describe(id).await?;
            println!("{}", formatter.format_record(&record));
        }
    }

    Ok(())
}

/// Flags hostname collisions in a droplet listing. Actions on a
/// duplicated hostname will fail until it is resolved in the web UI.
fn warn_on_duplicate_hostnames(records: &[coracle::api::Record], formatter: &OutputFormatter) {
    let mut seen = std::collections::BTreeSet::new();
    for record in records {
        if let Ok(name) = record.name() {
            if !seen.insert(name.to_lowercase()) {
                eprintln!(
                    "{}",
                    formatter.warning(&format!(
                        "multiple droplets named '{name}'; actions on them will fail \
                         until this is resolved"
                    ))
                );
            }
        }
    }
}

/// Waits for an event to complete, printing a tick per poll, unless the
/// caller asked not to wait.
async fn finish(
    client: &ApiClient,
    event_id: u64,
    no_wait: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    if no_wait {
        println!("{}", formatter.success(&format!("Event {event_id} started")));
        return Ok(());
    }

    let events = Events::new(client.clone());
    eprint!("Waiting");
    let result = Waiter::new()
        .wait_for_event_with(&events, event_id, |_| {
            eprint!(".");
            let _ = std::io::stderr().flush();
        })
        .await;
    eprintln!();
    result?;

    println!("{}", formatter.success("done"));
    Ok(())
}
