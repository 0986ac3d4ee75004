use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::backend::{CatalogPolicy, SchedulingBackend};
use crate::configuration::Configuration;
use crate::configuration_handler::ConfigurationHandler;
use crate::database_interface::DatabaseInterface;
use crate::http::start_server;
use crate::local_store::LocalStore;

mod availability;
mod backend;
mod configuration;
mod configuration_handler;
mod database_interface;
mod error;
mod http;
mod local_store;
mod schema;
#[cfg(test)]
mod testutils;
mod types;
mod workflow;

#[derive(Clone)]
struct AppState<T: SchedulingBackend> {
    scheduler: T,
    admin_password: String,
}

#[derive(Debug, Parser)]
#[command(about = "Repair-appointment scheduling and status-workflow service")]
struct Args {
    /// Listen address, overrides BIND_ADDRESS.
    #[arg(long)]
    bind: Option<String>,
    /// PostgreSQL connection string, overrides DATABASE_URL.
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("repair_scheduler=info")),
        )
        .init();

    let args = Args::parse();
    let config = ConfigurationHandler::from_env();
    let policy = CatalogPolicy {
        reject_overlapping_windows: config.reject_overlapping_windows(),
    };

    let bind = args.bind.unwrap_or_else(|| config.bind_address());
    let listener = TcpListener::bind(&bind).await.unwrap();
    info!(%bind, "repair scheduler listening");

    match args.database_url.or_else(|| config.database_url()) {
        Some(database_url) => {
            let scheduler = match DatabaseInterface::new(&database_url, policy) {
                Ok(scheduler) => scheduler,
                Err(err) => {
                    error!(%err, "failed to connect to PostgreSQL");
                    std::process::exit(1);
                }
            };
            let state = AppState {
                scheduler,
                admin_password: config.admin_password(),
            };
            start_server(state, listener).await;
        }
        None => {
            info!("no DATABASE_URL configured, using the in-memory store");
            let scheduler = LocalStore::new(policy);
            scheduler.insert_example_catalog();
            let state = AppState {
                scheduler,
                admin_password: config.admin_password(),
            };
            start_server(state, listener).await;
        }
    }
}
