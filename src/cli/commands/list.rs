//! List command.

use serde_json::json;

use crate::config::Settings;
use crate::registry::RegistryStore;

/// Run list command - print registered categories.
///
/// Reads without taking the lock: registry writes are atomic replaces,
/// so a plain read always sees a complete file.
pub fn run_list(settings: &Settings, json: bool) {
    let store = RegistryStore::new(settings.registry.registry_path.clone());
    let registry = match store.load() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if json {
        let entries: Vec<_> = registry
            .categories
            .iter()
            .map(|(key, entry)| {
                json!({
                    "id": entry.id.as_str(),
                    "key": key.as_str(),
                    "display_name": entry.display_name,
                    "keywords": entry.keywords,
                    "created_date": entry.created_date.to_string(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries).unwrap());
        return;
    }

    if registry.categories.is_empty() {
        println!("No categories registered.");
        println!("\nTo register one: triago assign --title <TITLE>");
        return;
    }

    println!("Registered categories ({}):", registry.categories.len());
    for (key, entry) in &registry.categories {
        println!(
            "  {}  {} [{}] ({})",
            entry.id.as_str(),
            entry.display_name,
            entry.keywords.join(", "),
            key.as_str()
        );
    }
    println!("\nNext id: {}", registry.next_id.as_str());
}
