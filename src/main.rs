//! spotfinder CLI entry point
//!
//! Parking proximity search - CLI + web API

use spotfinder::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
