// Barcode Studio - barcode configuration, validation and template core
//
// This is the library crate containing the configuration store, the payload
// rules, generation orchestration and template management.
// The binary crate (main.rs) provides a command-line front end.

pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod session;
pub mod settings;
pub mod state;
pub mod validation;

// Re-export commonly used types for convenience
pub use models::{BarcodeConfig, DimensionField, Dimensions, StudioSettings, Template};
pub use session::{Collaborators, Session};
pub use settings::SettingsManager;
pub use state::{ConfigChange, ConfigurationStore};
pub use validation::{RuleTable, validate};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
