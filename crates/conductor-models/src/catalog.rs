//! Static catalog of installable agent types.

use serde::{Deserialize, Serialize};

/// One installable agent type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Agent id used with `install`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Category (database, api, messaging, ...).
    pub category: String,
    /// Published version.
    pub version: String,
}

impl CatalogEntry {
    fn new(id: &str, name: &str, category: &str, version: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            version: version.to_string(),
        }
    }
}

/// Returns the built-in catalog.
pub fn builtin_catalog() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry::new("agent-mysql", "MySQL Agent", "database", "1.2.0"),
        CatalogEntry::new("agent-postgresql", "PostgreSQL Agent", "database", "1.1.5"),
        CatalogEntry::new("agent-rest", "REST API Agent", "api", "2.0.0"),
        CatalogEntry::new("agent-whatsapp", "WhatsApp Agent", "messaging", "2.1.0"),
        CatalogEntry::new("agent-openai", "OpenAI GPT Agent", "ai", "2.0.0"),
        CatalogEntry::new("agent-scheduler", "Task Scheduler", "automation", "1.8.0"),
    ]
}
