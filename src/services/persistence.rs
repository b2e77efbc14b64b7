use anyhow::{Context, Result};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;

use crate::models::{Envelope, Template};

/// Errors from a remote collaborator call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// The collaborator answered with `success: false`
    #[error("{operation} failed: {message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },

    /// The call itself did not complete
    #[error("{operation} failed: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    #[error("{operation} returned no data")]
    MissingData { operation: &'static str },
}

impl PersistenceError {
    /// Unwrap a collaborator answer, mapping every failure mode.
    pub fn check<T>(operation: &'static str, answer: Result<Envelope<T>>) -> Result<Option<T>, Self> {
        let envelope = answer.map_err(|e| Self::Transport {
            operation,
            message: format!("{e:#}"),
        })?;
        envelope
            .into_result()
            .map_err(|message| Self::Rejected { operation, message })
    }

    /// Like [`check`](Self::check) but a missing `data` field is an error.
    pub fn require<T>(operation: &'static str, answer: Result<Envelope<T>>) -> Result<T, Self> {
        Self::check(operation, answer)?.ok_or(Self::MissingData { operation })
    }
}

/// Remote template persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn save_template(&self, template: Template) -> Result<Envelope<Template>>;

    async fn get_templates(&self) -> Result<Envelope<Vec<Template>>>;

    async fn get_template(&self, id: &str) -> Result<Envelope<Template>>;

    async fn delete_template(&self, id: &str) -> Result<Envelope<()>>;
}

/// Template store backed by a single pretty-printed JSON object keyed by id.
///
/// A missing file reads as an empty store. Writes replace the file through
/// a temporary sibling so a crash never leaves half a document behind.
#[derive(Debug)]
pub struct JsonFileTemplateStore {
    path: Utf8PathBuf,
    // Serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl JsonFileTemplateStore {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    async fn load_all(&self) -> Result<IndexMap<String, Template>> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            tracing::debug!("Template store {} not found, starting empty", self.path);
            return Ok(IndexMap::new());
        }

        let contents = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read template store: {}", self.path))?;
        if contents.trim().is_empty() {
            return Ok(IndexMap::new());
        }

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse template store: {}", self.path))
    }

    async fn write_all(&self, templates: &IndexMap<String, Template>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent))?;
        }

        let json = serde_json::to_string_pretty(templates)
            .context("Failed to serialize templates to JSON")?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .await
            .with_context(|| format!("Failed to write template store: {}", tmp_path))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace template store: {}", self.path))?;

        tracing::debug!("Wrote {} template(s) to {}", templates.len(), self.path);
        Ok(())
    }
}

#[async_trait]
impl TemplateStore for JsonFileTemplateStore {
    async fn save_template(&self, template: Template) -> Result<Envelope<Template>> {
        let _guard = self.lock.lock().await;
        let mut templates = self.load_all().await?;

        if templates.contains_key(&template.id) {
            return Ok(Envelope::failure(format!(
                "Template {} already exists",
                template.id
            )));
        }

        templates.insert(template.id.clone(), template.clone());
        self.write_all(&templates).await?;

        tracing::info!("Saved template '{}' ({})", template.name, template.id);
        Ok(Envelope::ok("Template saved successfully", template))
    }

    async fn get_templates(&self) -> Result<Envelope<Vec<Template>>> {
        let _guard = self.lock.lock().await;
        let templates = self.load_all().await?;
        Ok(Envelope::ok(
            "Templates retrieved successfully",
            templates.into_values().collect(),
        ))
    }

    async fn get_template(&self, id: &str) -> Result<Envelope<Template>> {
        let _guard = self.lock.lock().await;
        let mut templates = self.load_all().await?;
        Ok(match templates.shift_remove(id) {
            Some(template) => Envelope::ok("Template retrieved successfully", template),
            None => Envelope::failure(format!("Template {id} not found")),
        })
    }

    async fn delete_template(&self, id: &str) -> Result<Envelope<()>> {
        let _guard = self.lock.lock().await;
        let mut templates = self.load_all().await?;

        if templates.shift_remove(id).is_none() {
            return Ok(Envelope::failure(format!("Template {id} not found")));
        }
        self.write_all(&templates).await?;

        tracing::info!("Deleted template {}", id);
        Ok(Envelope::ok_empty("Template deleted successfully"))
    }
}
