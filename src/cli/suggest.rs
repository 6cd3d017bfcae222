//! Suggest command handler
//!
//! Prints address suggestions for partial input, as a type-ahead box would.

use crate::config::Config;
use crate::error::Result;
use crate::geo::places::{get_place_backend, AddressResolver};
use clap::Args;

/// Suggest command arguments
#[derive(Args)]
pub struct SuggestArgs {
    /// Partial address text
    pub text: String,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the suggest command
pub async fn run(args: SuggestArgs) -> Result<()> {
    let config = Config::load()?;
    let places = get_place_backend(&config.places)?;
    let resolver = AddressResolver::new(places, config.search.suggest_debounce())?;

    let session = resolver.session_token();
    let suggestions = if args.text.trim().is_empty() {
        Vec::new()
    } else {
        resolver.lookup_suggestions(&args.text, &session).await?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&suggestions)?);
        return Ok(());
    }

    if suggestions.is_empty() {
        println!("No suggestions for '{}'", args.text);
        return Ok(());
    }

    println!("Suggestions ({}):", resolver.backend_name());
    for s in &suggestions {
        println!("  {:<24} {}", s.place_ref, s.label);
    }
    println!();
    println!("Use `spotfinder nearest --address \"...\"` to search near one of these.");

    Ok(())
}
