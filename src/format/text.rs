//! Human-readable text output formatter

use crate::error::Result;
use crate::format::{format_distance, OutputFormatter};
use crate::search::{SearchState, SearchStatus};

/// Text formatter - outputs a numbered listing summary
pub struct TextFormatter;

impl OutputFormatter for TextFormatter {
    fn name(&self) -> &str {
        "text"
    }

    fn description(&self) -> &str {
        "Human-readable text"
    }

    fn format(&self, state: &SearchState) -> Result<String> {
        let mut output = String::new();

        match &state.coordinate {
            Some(fix) => {
                output.push_str(&format!("Parking near {}", fix.coordinate));
                if let Some(label) = &fix.label {
                    output.push_str(&format!(" ({})", label));
                }
                if fix.is_approximate {
                    output.push_str(" [approximate]");
                }
                output.push('\n');
                output.push_str(&format!("Radius: {}m\n", state.radius_meters));
            }
            None => output.push_str("Newest parking spots\n"),
        }

        if let (SearchStatus::Error, Some(err)) = (state.status, &state.error) {
            output.push_str(&format!("Error: {} ({})\n", err.message, err.kind.code()));
        }

        if state.results.is_empty() {
            output.push_str("\nNo parking spots found.\n");
            return Ok(output);
        }

        output.push_str(&format!("\n{} spot(s):\n", state.results.len()));
        for (i, listing) in state.results.iter().enumerate() {
            output.push_str(&format!("{:>3}. {}\n", i + 1, listing.title));
            output.push_str(&format!(
                "     {}, {}, {} {}\n",
                listing.address, listing.city, listing.state, listing.zip_code
            ));

            let mut details = vec![format!("${:.2}/day", listing.price_per_day)];
            if let Some(d) = listing.distance_meters {
                details.push(format_distance(d));
            }
            if let Some(t) = &listing.parking_type {
                details.push(t.to_string());
            }
            if listing.is_available() {
                details.push(format!("{} space(s) left", listing.spaces_available));
            } else {
                details.push("full".to_string());
            }
            output.push_str(&format!("     {}\n", details.join(" | ")));

            if !listing.amenities.is_empty() {
                let names: Vec<&str> = listing.amenities.iter().map(|a| a.name.as_str()).collect();
                output.push_str(&format!("     Amenities: {}\n", names.join(", ")));
            }
        }

        Ok(output)
    }
}
