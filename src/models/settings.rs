use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Operator settings loaded from `studio.yaml` and `BARCODE_STUDIO__*` variables.
///
/// Every field has a default, so a missing file or a partial file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioSettings {
    /// Start sessions in automatic generation mode
    pub auto_generate: bool,

    /// Upper bound for a single renderer invocation
    pub render_timeout_secs: u64,

    /// External program that turns a configuration into PNG bytes
    pub renderer_program: String,

    pub renderer_args: Vec<String>,

    /// JSON file backing the template store
    pub template_store_path: Utf8PathBuf,

    pub log_dir: Utf8PathBuf,

    pub debug_mode: bool,

    /// Buffered notices per subscriber before the oldest are dropped
    pub notification_capacity: usize,
}

impl Default for StudioSettings {
    fn default() -> Self {
        Self {
            auto_generate: true,
            render_timeout_secs: 30,
            renderer_program: String::new(),
            renderer_args: Vec::new(),
            template_store_path: Utf8PathBuf::from("templates.json"),
            log_dir: Utf8PathBuf::from("logs"),
            debug_mode: false,
            notification_capacity: 64,
        }
    }
}

impl StudioSettings {
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs.max(1))
    }

    pub fn has_renderer(&self) -> bool {
        !self.renderer_program.trim().is_empty()
    }
}
