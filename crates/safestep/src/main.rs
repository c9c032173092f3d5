//! `safestep` - CLI for the trip lifecycle service
//!
//! Data commands open the local database and go through the same request
//! boundary the daemon serves. `daemon start` serves that boundary on a Unix
//! socket; `send` talks to it.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{info, warn};

use safestep::cli::{Cli, Command, ConfigCommand, DaemonCommand, StatusCommand};
use safestep::seed::seed_sample_data;
use safestep::{init_logging, ipc, ApiRequest, ApiResponse, Config, Dispatcher, StorageHandle};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Trip(cmd) => handle_request(&config, cmd.to_request()?),
        Command::Destination(cmd) => handle_request(&config, cmd.to_request()?),
        Command::Contact(cmd) => handle_request(&config, cmd.to_request()?),
        Command::Prefs(cmd) => handle_request(&config, cmd.to_request()?),
        Command::Status(cmd) => handle_status(&config, &cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
        Command::Daemon(cmd) => handle_daemon(&config, &cmd),
        Command::Send(cmd) => {
            let request = cmd.to_request()?;
            let response = ipc::send(&config.socket_path(), &request)?;
            print_response(&response)
        }
    }
}

/// Open storage, seeding sample data when configured to.
fn open_storage(config: &Config) -> anyhow::Result<StorageHandle> {
    let storage = StorageHandle::open(config).with_context(|| {
        format!("opening database at {}", config.database_path().display())
    })?;
    if config.storage.seed_sample_data {
        seed_sample_data(&storage)?;
    }
    Ok(storage)
}

fn handle_request(config: &Config, request: ApiRequest) -> anyhow::Result<()> {
    let dispatcher = Dispatcher::new(open_storage(config)?, &config.trips);
    let response = dispatcher.handle(&request);
    print_response(&response)
}

fn print_response(response: &ApiResponse) -> anyhow::Result<()> {
    if response.is_success() {
        println!("{}", serde_json::to_string_pretty(&response.body)?);
        Ok(())
    } else {
        bail!(
            "{} (status {})",
            response.error_message().unwrap_or("request failed"),
            response.status
        )
    }
}

fn handle_status(config: &Config, cmd: &StatusCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let dispatcher = Dispatcher::new(storage, &config.trips);
    let report = dispatcher.services().queries.status()?;
    let daemon_running = std::os::unix::net::UnixStream::connect(config.socket_path()).is_ok();

    if cmd.json {
        let mut value = serde_json::to_value(&report)?;
        value["daemonRunning"] = serde_json::Value::Bool(daemon_running);
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("safestep status");
    println!("---------------");
    println!("Database:      {}", report.database);
    println!(
        "Daemon:        {}",
        if daemon_running { "Running" } else { "Not running" }
    );
    println!();
    println!("Trips:         {}", report.stats.total_trips);
    println!("  Completed:   {}", report.stats.completed_trips);
    println!("  Cancelled:   {}", report.stats.cancelled_trips);
    println!("Destinations:  {}", report.stats.destinations);
    println!("Contacts:      {}", report.stats.family_contacts);
    println!();
    match report.active_trip {
        Some(trip) => println!(
            "Active trip:   {} to {} (step {}/{}, {}%)",
            trip.id, trip.destination, trip.current_step, trip.total_steps, trip.progress
        ),
        None => println!("Active trip:   none"),
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  In memory:          {}", config.storage.in_memory);
                println!("  Seed sample data:   {}", config.storage.seed_sample_data);
                println!();
                println!("[Trips]");
                println!("  Default steps:      {}", config.trips.default_total_steps);
                println!("  Max steps:          {}", config.trips.max_total_steps);
                println!("  History limit:      {}", config.trips.history_limit);
                println!(
                    "  Recent destinations: {}",
                    config.trips.recent_destinations_limit
                );
                println!();
                println!("[Daemon]");
                println!("  Socket path:        {}", config.socket_path().display());
                println!("  Max request bytes:  {}", config.daemon.max_request_bytes);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn handle_daemon(config: &Config, cmd: &DaemonCommand) -> anyhow::Result<()> {
    match cmd {
        DaemonCommand::Start => {
            let storage = open_storage(config)?;
            let dispatcher = Dispatcher::new(storage, &config.trips);
            let socket_path = config.socket_path();
            let max_request_bytes = config.daemon.max_request_bytes;

            let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
            runtime.block_on(async {
                let listener = ipc::bind(&socket_path).await?;
                ipc::serve(listener, dispatcher, max_request_bytes, async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!("Failed to listen for shutdown signal: {}", e);
                        std::future::pending::<()>().await;
                    }
                })
                .await
            })?;

            if let Err(e) = std::fs::remove_file(&socket_path) {
                warn!("Failed to remove socket {}: {}", socket_path.display(), e);
            }
            info!("Daemon stopped");
        }
    }
    Ok(())
}
