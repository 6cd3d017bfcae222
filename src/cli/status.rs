//! Status command handler
//!
//! Shows configured backends, probes storage, and checks the server.

use crate::config::Config;
use crate::error::Result;
use crate::storage::open_store;
use clap::Args;

/// Status command arguments
#[derive(Args)]
pub struct StatusArgs {
    /// Skip the storage round trip
    #[arg(long)]
    pub offline: bool,

    /// Check if server is running (tries to connect)
    #[arg(long)]
    pub server: bool,
}

/// Run the status command
pub async fn run(args: StatusArgs) -> Result<()> {
    let config = Config::load()?;

    // Check server status if requested
    if args.server {
        check_server_status(&config).await;
    }

    println!("spotfinder v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("Storage: {}", config.storage.backend);
    if !config.storage.url.is_empty() {
        println!("  URL: {}", config.storage.url);
    }
    println!("Places:  {}", config.places.backend);
    println!(
        "Search:  radius {}m, up to {} results, IP fallback {}",
        config.search.radius_meters,
        config.search.max_results,
        if config.search.fallback_to_ip { "on" } else { "off" }
    );
    println!();

    if args.offline {
        return Ok(());
    }

    // One cheap query tells us whether the backend answers at all
    println!("Storage check:");
    match open_store(&config.storage) {
        Ok(store) => match store.fetch_active_amenities().await {
            Ok(amenities) => println!("  OK ({} amenities)", amenities.len()),
            Err(e) => println!("  FAIL: {}", e),
        },
        Err(e) => println!("  FAIL: {}", e),
    }

    Ok(())
}

/// Check if the server is running
async fn check_server_status(config: &Config) {
    let url = format!("http://{}/api/status", config.server_addr());

    match reqwest::get(&url).await {
        Ok(response) => {
            if response.status().is_success() {
                println!("Server: RUNNING on {}", config.server_addr());
                if let Ok(status) = response.json::<serde_json::Value>().await {
                    for key in ["version", "storage", "places"] {
                        if let Some(value) = status.get(key).and_then(|v| v.as_str()) {
                            println!("  {}: {}", key, value);
                        }
                    }
                }
            } else {
                println!("Server: ERROR (status {})", response.status());
            }
        }
        Err(_) => {
            println!("Server: NOT RUNNING on {}", config.server_addr());
        }
    }
    println!();
}
