// Session wiring
//
// Builds the store, the orchestrator and the template coordinator from a set
// of collaborators, and runs the listener task that reacts to configuration
// snapshots plus the task that keeps the template list on the active
// symbology.

use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::metrics::Metrics;
use crate::models::{BarcodeConfig, StudioSettings, Template};
use crate::services::{
    Confirm, DeleteOutcome, GenerationOrchestrator, GenerationOutcome, GenerationTicket,
    LayoutSource, ManualTriggerRejected, Notice, Notifier, PersistenceError, Renderer,
    TemplateCoordinator, TemplateError, TemplateStore,
};
use crate::state::{ConfigChange, ConfigurationStore, Subscription};

/// External collaborators a session talks to
#[derive(Clone)]
pub struct Collaborators {
    pub renderer: Arc<dyn Renderer>,
    pub templates: Arc<dyn TemplateStore>,
    pub layout: Arc<dyn LayoutSource>,
}

/// One editing session.
///
/// Edits go through [`store()`](Self::store). A background listener picks up
/// every published snapshot, asks the orchestrator whether to render and
/// keeps the template list in step with the active symbology.
pub struct Session {
    store: ConfigurationStore,
    orchestrator: Arc<GenerationOrchestrator>,
    templates: Arc<TemplateCoordinator>,
    notifier: Notifier,
    metrics: Arc<Metrics>,
    listener: JoinHandle<()>,
    symbology_watch: JoinHandle<()>,
}

impl Session {
    /// Seed the configuration from the layout source, mount the template
    /// list and start listening.
    ///
    /// Collaborator failures during startup are reported as notices; the
    /// session still starts, on defaults if necessary. Must be called from
    /// within a tokio runtime.
    pub async fn start(settings: &StudioSettings, collaborators: Collaborators) -> Self {
        let notifier = Notifier::new(settings.notification_capacity);
        let metrics = Arc::new(Metrics::new());

        let initial = match PersistenceError::require(
            "get_layout",
            collaborators.layout.get_layout().await,
        ) {
            Ok(layout) => layout.config,
            Err(err) => {
                notifier.warn(format!("Using default configuration: {err}"));
                BarcodeConfig::default()
            }
        };

        let store = ConfigurationStore::with_config(initial, Arc::clone(&metrics));
        let orchestrator = Arc::new(GenerationOrchestrator::new(
            collaborators.renderer,
            store.clone(),
            notifier.clone(),
            settings.auto_generate,
        ));
        let templates = Arc::new(TemplateCoordinator::new(
            collaborators.templates,
            notifier.clone(),
            Arc::clone(&metrics),
            store.read(|c| c.symbology.clone()),
        ));

        if let Err(err) = templates.mount().await {
            tracing::warn!("Template list unavailable at startup: {}", err);
        }

        let (symbology_tx, symbology_rx) = watch::channel(templates.active_symbology());
        let symbology_watch = spawn_symbology_watch(symbology_rx, Arc::clone(&templates));
        let listener = spawn_listener(store.subscribe(), Arc::clone(&orchestrator), symbology_tx);

        if let Some(ticket) = orchestrator.on_config_changed(&store.current()) {
            spawn_generation(&orchestrator, ticket);
        }

        tracing::info!(
            "Session started: symbology={}, auto_generate={}",
            store.read(|c| c.symbology.clone()),
            settings.auto_generate
        );

        Self {
            store,
            orchestrator,
            templates,
            notifier,
            metrics,
            listener,
            symbology_watch,
        }
    }

    pub fn store(&self) -> &ConfigurationStore {
        &self.store
    }

    pub fn orchestrator(&self) -> &Arc<GenerationOrchestrator> {
        &self.orchestrator
    }

    pub fn templates(&self) -> &Arc<TemplateCoordinator> {
        &self.templates
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notifier.subscribe()
    }

    /// Render the current configuration now.
    pub fn generate_now(&self) -> Result<JoinHandle<GenerationOutcome>, ManualTriggerRejected> {
        let ticket = self.orchestrator.request_manual()?;
        Ok(spawn_generation(&self.orchestrator, ticket))
    }

    pub fn set_auto_generate(&self, enabled: bool) -> Option<JoinHandle<GenerationOutcome>> {
        self.orchestrator
            .set_auto_generate(enabled)
            .map(|ticket| spawn_generation(&self.orchestrator, ticket))
    }

    /// Save the current configuration as a template.
    pub async fn save_template(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Template, TemplateError> {
        let config = self.store.current();
        self.templates.save(name, description, &config).await
    }

    pub async fn delete_template(
        &self,
        id: &str,
        confirm: &dyn Confirm,
    ) -> Result<DeleteOutcome, TemplateError> {
        self.templates.delete(id, confirm).await
    }

    /// Replace the live configuration with a stored template.
    ///
    /// The listener treats a changed configuration like any other edit. A
    /// template identical to the live configuration publishes nothing, so
    /// it is evaluated here instead; automatic mode renders it either way.
    pub async fn load_template(&self, id: &str) -> Result<Arc<BarcodeConfig>, TemplateError> {
        let revision = self.store.revision();
        let config = self.templates.load_into(id, &self.store).await?;

        if self.store.revision() == revision {
            if let Some(ticket) = self.orchestrator.on_config_changed(&config) {
                spawn_generation(&self.orchestrator, ticket);
            }
        }
        Ok(config)
    }

    /// Stop the listener and log the session summary.
    pub fn shutdown(self) {
        self.listener.abort();
        self.symbology_watch.abort();
        self.metrics.log_summary();
        tracing::info!("Session shut down");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.listener.abort();
        self.symbology_watch.abort();
    }
}

fn spawn_generation(
    orchestrator: &Arc<GenerationOrchestrator>,
    ticket: GenerationTicket,
) -> JoinHandle<GenerationOutcome> {
    let orchestrator = Arc::clone(orchestrator);
    tokio::spawn(async move { orchestrator.execute(ticket).await })
}

// Never awaits anything but the next snapshot, so a slow collaborator cannot
// hold back generation requests.
fn spawn_listener(
    mut subscription: Subscription,
    orchestrator: Arc<GenerationOrchestrator>,
    symbology: watch::Sender<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(update) = subscription.recv().await {
            if let Some(ticket) = orchestrator.on_config_changed(&update.snapshot) {
                spawn_generation(&orchestrator, ticket);
            }

            for change in &update.changes {
                if let ConfigChange::SymbologyChanged { to, .. } = change {
                    symbology.send_replace(to.clone());
                }
            }
        }
        tracing::debug!("Configuration listener stopped");
    })
}

// Reloads the template list for the latest symbology. Switches made while a
// reload is pending collapse into one follow-up reload.
fn spawn_symbology_watch(
    mut symbology: watch::Receiver<String>,
    templates: Arc<TemplateCoordinator>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while symbology.changed().await.is_ok() {
            let active = symbology.borrow_and_update().clone();
            // Errors are already surfaced by the coordinator
            let _ = templates.set_active_symbology(&active).await;
        }
        tracing::debug!("Symbology watch stopped");
    })
}
