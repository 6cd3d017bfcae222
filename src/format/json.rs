//! JSON output formatter

use crate::error::Result;
use crate::format::OutputFormatter;
use crate::search::SearchState;

/// JSON formatter - outputs the full search state as pretty-printed JSON
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn name(&self) -> &str {
        "json"
    }

    fn description(&self) -> &str {
        "Full JSON search state"
    }

    fn format(&self, state: &SearchState) -> Result<String> {
        Ok(serde_json::to_string_pretty(state)?)
    }
}
