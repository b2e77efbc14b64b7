use crate::models::StudioSettings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::fs;

/// Settings file name inside the settings directory.
pub const SETTINGS_FILE: &str = "studio.yaml";

/// Environment prefix; `BARCODE_STUDIO__RENDER_TIMEOUT_SECS=5` overrides
/// `render_timeout_secs`.
pub const ENV_PREFIX: &str = "BARCODE_STUDIO";

/// Loads and saves [`StudioSettings`].
///
/// Load order, later sources winning: built-in defaults, `studio.yaml`,
/// then `BARCODE_STUDIO__*` environment variables.
#[derive(Debug, Clone)]
pub struct SettingsManager {
    settings_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl SettingsManager {
    /// Create a manager rooted at `settings_dir`, creating the directory if needed.
    pub fn new<P: AsRef<Utf8Path>>(settings_dir: P) -> Result<Self> {
        let settings_dir = settings_dir.as_ref().to_path_buf();

        if !settings_dir.exists() {
            fs::create_dir_all(&settings_dir).with_context(|| {
                format!("Failed to create settings directory: {}", settings_dir)
            })?;
        }

        Ok(Self {
            settings_path: settings_dir.join(SETTINGS_FILE),
            settings_dir,
        })
    }

    pub fn settings_dir(&self) -> &Utf8Path {
        &self.settings_dir
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }

    /// Load settings from the file and the process environment.
    pub fn load(&self) -> Result<StudioSettings> {
        self.load_with_env(None)
    }

    /// Load settings, reading overrides from `env` instead of the process
    /// environment when given.
    pub fn load_with_env(&self, env: Option<config::Map<String, String>>) -> Result<StudioSettings> {
        if !self.settings_path.exists() {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
        }

        let environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("renderer_args")
            .source(env);

        let settings: StudioSettings = Config::builder()
            .add_source(File::new(self.settings_path.as_str(), FileFormat::Yaml).required(false))
            .add_source(environment)
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::info!(
            "Loaded settings: auto_generate={}, renderer={}, templates={}",
            settings.auto_generate,
            if settings.has_renderer() {
                settings.renderer_program.as_str()
            } else {
                "<none>"
            },
            settings.template_store_path
        );
        Ok(settings)
    }

    pub fn save(&self, settings: &StudioSettings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Write the defaults unless a settings file already exists.
    ///
    /// # Returns
    /// `true` if a new file was written
    pub fn init_default(&self) -> Result<bool> {
        if self.settings_path.exists() {
            return Ok(false);
        }
        self.save(&StudioSettings::default())?;
        Ok(true)
    }
}
