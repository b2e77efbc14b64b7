use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::barcode::BarcodeConfig;

/// A named, persisted snapshot of a barcode configuration.
///
/// Templates are immutable once stored; edits happen on the live
/// configuration and are saved as a new template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub config: BarcodeConfig,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub id: String,
}

impl Template {
    /// Build a template with a fresh id.
    ///
    /// # Arguments
    /// * `name` - Display name, stored trimmed
    /// * `description` - Optional note; blank descriptions are dropped
    /// * `config` - Snapshot of the configuration to persist
    pub fn new(name: &str, description: Option<&str>, config: BarcodeConfig) -> Self {
        Self {
            config,
            name: name.trim().to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            id: Uuid::new_v4().to_string(),
        }
    }

    pub fn symbology(&self) -> &str {
        &self.config.symbology
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_template_trims_and_assigns_id() {
        let template = Template::new("  Shelf label ", Some("   "), BarcodeConfig::default());
        assert_eq!(template.name, "Shelf label");
        assert_eq!(template.description, None);
        assert!(Uuid::parse_str(&template.id).is_ok());
        assert_eq!(template.symbology(), "Code128");
    }

    #[test]
    fn test_template_ids_are_unique() {
        let a = Template::new("a", None, BarcodeConfig::default());
        let b = Template::new("a", None, BarcodeConfig::default());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_missing_description_deserializes() {
        let json = serde_json::json!({
            "config": BarcodeConfig::default(),
            "name": "legacy",
            "id": "42",
        });
        let template: Template = serde_json::from_value(json).unwrap();
        assert_eq!(template.description, None);
        assert_eq!(template.id, "42");
    }
}
