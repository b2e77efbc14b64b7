//! Template management: a cached, symbology-filtered view over a
//! [`TemplateStore`], plus save, delete and load flows.

use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tokio::sync::broadcast;

use super::notify::Notifier;
use super::persistence::{PersistenceError, TemplateStore};
use crate::metrics::Metrics;
use crate::models::{BarcodeConfig, Template};
use crate::state::ConfigurationStore;
use crate::validation::ValidationError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Template {0} not found")]
    NotFound(String),
}

/// Asks the operator to approve a destructive action.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Approves everything; used for non-interactive deletes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

#[async_trait]
impl Confirm for AlwaysConfirm {
    async fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
}

/// Emitted to external listeners after a successful remote change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateChange {
    Saved { id: String },
    Deleted { id: String },
}

#[derive(Debug, Default)]
struct TemplateCache {
    templates: Vec<Template>,
    active_symbology: String,
    /// Message shown inline in the active dialog
    last_error: Option<String>,
}

/// Keeps a local copy of every stored template.
///
/// The cache is replaced only by a successful full reload, so a failed
/// remote call never leaves it partially updated.
pub struct TemplateCoordinator {
    store: Arc<dyn TemplateStore>,
    cache: RwLock<TemplateCache>,
    changes: broadcast::Sender<TemplateChange>,
    notifier: Notifier,
    metrics: Arc<Metrics>,
}

impl TemplateCoordinator {
    pub fn new(
        store: Arc<dyn TemplateStore>,
        notifier: Notifier,
        metrics: Arc<Metrics>,
        active_symbology: impl Into<String>,
    ) -> Self {
        let (changes, _) = broadcast::channel(32);
        Self {
            store,
            cache: RwLock::new(TemplateCache {
                active_symbology: active_symbology.into(),
                ..TemplateCache::default()
            }),
            changes,
            notifier,
            metrics,
        }
    }

    fn read_cache(&self) -> RwLockReadGuard<'_, TemplateCache> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, TemplateCache> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TemplateChange> {
        self.changes.subscribe()
    }

    /// Initial load.
    pub async fn mount(&self) -> Result<usize, TemplateError> {
        self.reload().await
    }

    /// Replace the cache with the store's full list.
    ///
    /// # Returns
    /// Number of cached templates after the reload
    pub async fn reload(&self) -> Result<usize, TemplateError> {
        let answer = self.store.get_templates().await;
        match PersistenceError::check("get_templates", answer) {
            Ok(templates) => {
                let templates = templates.unwrap_or_default();
                let count = templates.len();
                let mut cache = self.write_cache();
                cache.templates = templates;
                cache.last_error = None;
                tracing::debug!("Loaded {} template(s)", count);
                Ok(count)
            }
            Err(err) => Err(self.surface(err.into())),
        }
    }

    /// Track the editor's symbology, reloading when it actually changes.
    pub async fn set_active_symbology(&self, symbology: &str) -> Result<(), TemplateError> {
        {
            let mut cache = self.write_cache();
            if cache.active_symbology == symbology {
                return Ok(());
            }
            cache.active_symbology = symbology.to_string();
        }
        self.reload().await.map(|_| ())
    }

    pub fn active_symbology(&self) -> String {
        self.read_cache().active_symbology.clone()
    }

    /// Cached templates whose configuration uses `symbology`, in store order.
    pub fn list(&self, symbology: &str) -> Vec<Template> {
        self.read_cache()
            .templates
            .iter()
            .filter(|t| t.symbology() == symbology)
            .cloned()
            .collect()
    }

    pub fn list_active(&self) -> Vec<Template> {
        let symbology = self.active_symbology();
        self.list(&symbology)
    }

    pub fn all(&self) -> Vec<Template> {
        self.read_cache().templates.clone()
    }

    pub fn find(&self, id: &str) -> Option<Template> {
        self.read_cache().templates.iter().find(|t| t.id == id).cloned()
    }

    pub fn last_error(&self) -> Option<String> {
        self.read_cache().last_error.clone()
    }

    /// Persist a snapshot of `config` under a new id.
    ///
    /// # Arguments
    /// * `name` - Required; trimmed before storing
    /// * `description` - Optional; trimmed, blank is dropped
    /// * `config` - Configuration to snapshot
    pub async fn save(
        &self,
        name: &str,
        description: Option<&str>,
        config: &BarcodeConfig,
    ) -> Result<Template, TemplateError> {
        if name.trim().is_empty() {
            return Err(self.surface(ValidationError::BlankTemplateName.into()));
        }

        let template = Template::new(name, description, config.clone());
        let answer = self.store.save_template(template.clone()).await;
        let saved = match PersistenceError::check("save_template", answer) {
            Ok(saved) => saved.unwrap_or(template),
            Err(err) => return Err(self.surface(err.into())),
        };

        self.metrics.record_template_saved();
        self.notifier.info(format!("Template '{}' saved", saved.name));
        self.refresh_after_change(TemplateChange::Saved {
            id: saved.id.clone(),
        })
        .await;
        Ok(saved)
    }

    /// Delete after explicit confirmation. Declining touches nothing.
    pub async fn delete(
        &self,
        id: &str,
        confirm: &dyn Confirm,
    ) -> Result<DeleteOutcome, TemplateError> {
        let prompt = match self.find(id) {
            Some(template) => format!("Delete template '{}'?", template.name),
            None => format!("Delete template {id}?"),
        };
        if !confirm.confirm(&prompt).await {
            tracing::debug!("Delete of template {} declined", id);
            return Ok(DeleteOutcome::Declined);
        }

        let answer = self.store.delete_template(id).await;
        if let Err(err) = PersistenceError::check("delete_template", answer) {
            return Err(self.surface(err.into()));
        }

        self.metrics.record_template_deleted();
        self.refresh_after_change(TemplateChange::Deleted { id: id.to_string() })
            .await;
        Ok(DeleteOutcome::Deleted)
    }

    /// Hand a template's configuration to the store wholesale.
    ///
    /// Falls back to a remote lookup when the id is not cached.
    pub async fn load_into(
        &self,
        id: &str,
        store: &ConfigurationStore,
    ) -> Result<Arc<BarcodeConfig>, TemplateError> {
        let template = match self.find(id) {
            Some(template) => template,
            None => {
                let answer = self.store.get_template(id).await;
                match PersistenceError::check("get_template", answer) {
                    Ok(Some(template)) => template,
                    Ok(None) | Err(PersistenceError::Rejected { .. }) => {
                        return Err(self.surface(TemplateError::NotFound(id.to_string())));
                    }
                    Err(err) => return Err(self.surface(err.into())),
                }
            }
        };

        tracing::info!("Loading template '{}' ({})", template.name, template.id);
        store.replace(template.config);
        Ok(store.current())
    }

    async fn refresh_after_change(&self, change: TemplateChange) {
        // The remote change already happened; a failed reload is surfaced
        // but does not undo it.
        if let Err(err) = self.reload().await {
            tracing::warn!("Template reload after change failed: {}", err);
        }
        let _ = self.changes.send(change);
    }

    fn surface(&self, err: TemplateError) -> TemplateError {
        tracing::error!("Template operation failed: {}", err);
        self.metrics.record_template_error();
        self.write_cache().last_error = Some(err.to_string());
        self.notifier.error(err.to_string());
        err
    }
}
