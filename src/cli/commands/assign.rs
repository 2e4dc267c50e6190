//! Assign command.

use serde_json::json;

use crate::config::Settings;
use crate::registry::{Assignment, CategoryAllocator, RegistryResult};
use crate::types::WorkRequest;

/// Categorize one request against the configured registry.
///
/// Split out from `run_assign` so tests can drive it without touching
/// process exit codes.
pub fn assign_request(
    settings: &Settings,
    title: &str,
    description: Option<&str>,
) -> RegistryResult<Assignment> {
    let request = WorkRequest::new(title, description.unwrap_or_default());
    CategoryAllocator::from_settings(settings).assign(&request)
}

/// Run assign command.
pub fn run_assign(settings: &Settings, title: String, description: Option<String>, json: bool) {
    match assign_request(settings, &title, description.as_deref()) {
        Ok(assignment) => {
            if json {
                let response = json!({
                    "id": assignment.id.as_str(),
                    "key": assignment.key.as_str(),
                    "decision": assignment.decision.as_str(),
                });
                println!("{}", serde_json::to_string_pretty(&response).unwrap());
            } else {
                println!("{}", assignment.id.as_str());
                eprintln!(
                    "Category {} ({}): {}",
                    assignment.id.as_str(),
                    assignment.decision,
                    assignment.key.as_str()
                );
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
