mod cli;

use clap::Parser;
use cli::{Commands, ServerCommands};
use dotenv::dotenv;
use healthcheck::config::CONFIG;
use healthcheck::server::Server;
use healthcheck::{checks, client, Context, Registry};
use log::{debug, error, info};
use std::process::exit;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    debug!("Config: {:?}", *CONFIG);

    // Parse the CLI arguments.
    let args = cli::Cli::parse();
    debug!("Parsed args: {:?}", args);

    match args.command {
        Some(Commands::Server { command }) => match command {
            Some(ServerCommands::Start) => serve().await,
            Some(ServerCommands::Status) => {
                if client::is_running(&CONFIG.server).await {
                    println!("running");
                } else {
                    println!("not running");
                }
            }
            None => {}
        },
        Some(Commands::Check) => check().await,
        Some(Commands::Status) => status().await,
        None => {}
    }
}

/// Runs the server with the configured checks until a Ctrl+C signal is received.
async fn serve() {
    let registry = Arc::new(Registry::new());
    checks::register_configured(&registry, &CONFIG.checks);

    let ctx = Context::background();
    if let Err(e) = registry.start(&ctx).await {
        error!("Failed to start the background checks: {}", e);
        exit(1);
    }

    let mut server = Server::new(Arc::clone(&registry));
    if server.start(&CONFIG.server).await.is_err() {
        registry.stop().await;
        exit(1);
    }

    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    }
    info!("Received Ctrl+C, shutting down.");
    server.stop().await;
    registry.stop().await;
}

/// Runs every configured check once, including the background ones.
async fn check() {
    let registry = Registry::new();
    checks::register_configured(&registry, &CONFIG.checks);

    let ctx = Context::background();
    if let Err(e) = registry.start(&ctx).await {
        error!("Failed to run the background checks: {}", e);
        exit(1);
    }
    let status = registry.status(&ctx).await;
    registry.stop().await;

    debug!("{}", status);
    if status.healthy {
        println!("ok");
        return;
    }
    for (name, message) in status.failures() {
        println!("error: {}: {}", name, message);
    }
    exit(1);
}

/// Prints the detailed status reported by the running server.
async fn status() {
    match client::get_status(&CONFIG.server).await {
        Ok(status) => {
            for (name, detail) in &status.details {
                println!("{}: {}", name, detail);
            }
            if !status.healthy {
                exit(1);
            }
        }
        Err(e) => {
            error!("Failed to get status: {}", e);
            exit(1);
        }
    }
}
