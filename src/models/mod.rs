//! Data models shared by the store, the services and the collaborators.
//!
//! - [`BarcodeConfig`]: the live configuration, replaced wholesale on every edit
//! - [`Template`]: a named, immutable snapshot persisted by a template store
//! - [`Envelope`]: `{success, message, data}` wrapper returned by remote collaborators
//! - [`ImportRow`]: a bulk-import row and how it maps onto a configuration
//! - [`StudioSettings`]: operator settings from `studio.yaml`
//!
//! The serde names on these types are the wire format shared with the
//! renderer and the template store, so renames here are breaking.

pub mod barcode;
pub mod envelope;
pub mod import;
pub mod settings;
pub mod template;

pub use barcode::{
    BarcodeConfig, DEFAULT_PAYLOAD, DEFAULT_SYMBOLOGY, DimensionField, Dimensions, Layout, Rgb,
    TextPosition, TextStyle,
};
pub use envelope::Envelope;
pub use import::ImportRow;
pub use settings::StudioSettings;
pub use template::Template;
