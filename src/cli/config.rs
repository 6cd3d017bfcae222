//! Config command handler
//!
//! View and modify configuration settings.

use crate::config::Config;
use crate::error::{Error, Result};
use clap::Args;

/// Config command arguments
#[derive(Args)]
pub struct ConfigArgs {
    /// Configuration key (e.g., "search.radius_meters")
    pub key: Option<String>,

    /// Value to set (if not provided, shows current value)
    #[arg(requires = "key")]
    pub value: Option<String>,

    /// Show config file path
    #[arg(long)]
    pub path: bool,

    /// Reset config to defaults
    #[arg(long)]
    pub reset: bool,
}

/// Run the config command
pub fn run(args: ConfigArgs) -> Result<()> {
    if args.path {
        println!("{}", Config::config_path()?.display());
        return Ok(());
    }

    if args.reset {
        Config::default().save()?;
        println!("Configuration reset to defaults");
        return Ok(());
    }

    let mut config = Config::load()?;

    match (args.key.as_deref(), args.value.as_deref()) {
        (None, _) => show_all_config(&config),
        (Some(key), None) => match config.get(key) {
            Some(value) => println!("{}", value),
            None => {
                return Err(Error::Config(format!(
                    "Unknown config key: {} (available: {})",
                    key,
                    Config::available_keys().join(", ")
                )))
            }
        },
        (Some(key), Some(value)) => {
            config.set(key, value)?;
            config.save()?;
            println!("{} = {}", key, value);
        }
    }

    Ok(())
}

/// Display all configuration values
fn show_all_config(config: &Config) {
    println!("[search]");
    println!("radius_meters = {}", config.search.radius_meters);
    println!("max_results = {}", config.search.max_results);
    println!("browse_limit = {}", config.search.browse_limit);
    println!("fallback_to_ip = {}", config.search.fallback_to_ip);
    println!(
        "geolocation_timeout_secs = {}",
        config.search.geolocation_timeout_secs
    );
    println!("suggest_debounce_ms = {}", config.search.suggest_debounce_ms);
    println!(
        "amenity_cache_ttl_secs = {}",
        config.search.amenity_cache_ttl_secs
    );
    println!();

    println!("[server]");
    println!("host = \"{}\"", config.server.host);
    println!("port = {}", config.server.port);
    println!();

    println!("[storage]");
    println!("backend = \"{}\"", config.storage.backend);
    println!("url = \"{}\"", config.storage.url);
    println!("api_key = {}", masked(&config.storage.api_key));
    if let Some(path) = &config.storage.listings_file {
        println!("listings_file = \"{}\"", path.display());
    }
    println!();

    println!("[places]");
    println!("backend = \"{}\"", config.places.backend);
    println!("api_key = {}", masked(&config.places.api_key));
}

fn masked(secret: &str) -> &'static str {
    if secret.is_empty() {
        "\"\" # not configured"
    } else {
        "\"***\" # configured"
    }
}
