//! Decides when to render and which completion may update the preview.
//!
//! Every request gets a strictly increasing sequence number. Requests may
//! overlap and finish in any order; only the completion carrying the latest
//! issued number is allowed to touch the preview or the phase. Everything
//! else is discarded silently, whether it succeeded or failed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use thiserror::Error;
use tokio::sync::broadcast;

use super::notify::Notifier;
use super::renderer::{GenerationError, Renderer};
use crate::metrics::Metrics;
use crate::models::BarcodeConfig;
use crate::state::{ConfigurationStore, Preview};
use crate::validation::{ConfigValidator, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationPhase {
    Idle,
    Requested,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOrigin {
    Auto,
    Manual,
}

/// An issued request: the frozen configuration and its sequence number.
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    pub sequence: u64,
    pub config: Arc<BarcodeConfig>,
    pub origin: TriggerOrigin,
}

/// What happened to a completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Displayed { sequence: u64 },
    Stale { sequence: u64, latest: u64 },
    Failed { sequence: u64, error: GenerationError },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManualTriggerRejected {
    #[error("A generation request is already in progress")]
    InProgress,

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

struct OrchestratorState {
    auto_generate: bool,
    latest_issued: u64,
    phase: GenerationPhase,
}

/// Generation orchestrator.
///
/// Reads snapshots from the [`ConfigurationStore`], hands them to a
/// [`Renderer`] and writes accepted images back as the store's preview.
pub struct GenerationOrchestrator {
    renderer: Arc<dyn Renderer>,
    store: ConfigurationStore,
    notifier: Notifier,
    metrics: Arc<Metrics>,
    validator: ConfigValidator<'static>,
    state: Mutex<OrchestratorState>,
    outcomes: broadcast::Sender<GenerationOutcome>,
}

impl GenerationOrchestrator {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        store: ConfigurationStore,
        notifier: Notifier,
        auto_generate: bool,
    ) -> Self {
        let metrics = Arc::clone(store.metrics());
        let (outcomes, _) = broadcast::channel(64);
        Self {
            renderer,
            store,
            notifier,
            metrics,
            validator: ConfigValidator::default(),
            state: Mutex::new(OrchestratorState {
                auto_generate,
                latest_issued: 0,
                phase: GenerationPhase::Idle,
            }),
            outcomes,
        }
    }

    /// Every settled completion, stale ones included.
    pub fn subscribe_outcomes(&self) -> broadcast::Receiver<GenerationOutcome> {
        self.outcomes.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, OrchestratorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> GenerationPhase {
        self.lock().phase
    }

    pub fn latest_sequence(&self) -> u64 {
        self.lock().latest_issued
    }

    pub fn auto_generate(&self) -> bool {
        self.lock().auto_generate
    }

    /// Whether a manual trigger would currently be accepted on timing grounds.
    pub fn manual_trigger_enabled(&self) -> bool {
        self.lock().phase != GenerationPhase::Requested
    }

    /// Switch modes. Turning automatic mode on evaluates the current
    /// configuration immediately.
    pub fn set_auto_generate(&self, enabled: bool) -> Option<GenerationTicket> {
        {
            let mut state = self.lock();
            if state.auto_generate == enabled {
                return None;
            }
            state.auto_generate = enabled;
        }
        tracing::info!("Automatic generation {}", if enabled { "enabled" } else { "disabled" });

        if enabled {
            self.on_config_changed(&self.store.current())
        } else {
            None
        }
    }

    /// Decide whether a new snapshot warrants a request.
    ///
    /// Requires automatic mode, a non-blank payload and a clean validation.
    /// Validation failures are reported as a warning notice.
    pub fn on_config_changed(&self, snapshot: &Arc<BarcodeConfig>) -> Option<GenerationTicket> {
        let mut state = self.lock();
        if !state.auto_generate || !snapshot.has_payload() {
            return None;
        }

        if let Err(err) = self.validator.validate_config(snapshot) {
            drop(state);
            self.metrics.record_validation_block();
            tracing::debug!("Generation blocked by validation: {}", err);
            self.notifier.warn(err.to_string());
            return None;
        }

        Some(self.issue(&mut state, Arc::clone(snapshot), TriggerOrigin::Auto))
    }

    /// Request a render of the current configuration on demand.
    pub fn request_manual(&self) -> Result<GenerationTicket, ManualTriggerRejected> {
        let mut state = self.lock();
        if state.phase == GenerationPhase::Requested {
            return Err(ManualTriggerRejected::InProgress);
        }

        let snapshot = self.store.current();
        if let Err(err) = self.validator.validate_config(&snapshot) {
            self.metrics.record_validation_block();
            return Err(err.into());
        }

        Ok(self.issue(&mut state, snapshot, TriggerOrigin::Manual))
    }

    fn issue(
        &self,
        state: &mut OrchestratorState,
        config: Arc<BarcodeConfig>,
        origin: TriggerOrigin,
    ) -> GenerationTicket {
        state.latest_issued += 1;
        state.phase = GenerationPhase::Requested;
        self.metrics.record_generation_requested();

        tracing::debug!(
            "Issued generation #{} ({:?}) for {} '{}'",
            state.latest_issued,
            origin,
            config.symbology,
            config.payload
        );
        GenerationTicket {
            sequence: state.latest_issued,
            config,
            origin,
        }
    }

    /// Run the renderer for a ticket and settle the result.
    pub async fn execute(&self, ticket: GenerationTicket) -> GenerationOutcome {
        let start = Instant::now();
        let result = self.renderer.generate(&ticket.config).await;
        self.metrics.record_render_time(start.elapsed());
        self.complete(&ticket, result)
    }

    /// Settle a finished request.
    ///
    /// Only the latest issued request may update the preview or the phase.
    /// A failure of the latest request keeps the previous preview and emits
    /// an error notice.
    pub fn complete(
        &self,
        ticket: &GenerationTicket,
        result: Result<Vec<u8>, GenerationError>,
    ) -> GenerationOutcome {
        let outcome = self.settle(ticket, result);
        let _ = self.outcomes.send(outcome.clone());
        outcome
    }

    fn settle(
        &self,
        ticket: &GenerationTicket,
        result: Result<Vec<u8>, GenerationError>,
    ) -> GenerationOutcome {
        let mut state = self.lock();

        if ticket.sequence != state.latest_issued {
            self.metrics.record_generation_stale();
            tracing::debug!(
                "Discarding stale generation #{} (latest #{})",
                ticket.sequence,
                state.latest_issued
            );
            return GenerationOutcome::Stale {
                sequence: ticket.sequence,
                latest: state.latest_issued,
            };
        }

        match result {
            Ok(png) => {
                state.phase = GenerationPhase::Succeeded;
                self.store.set_preview(Preview {
                    sequence: ticket.sequence,
                    png,
                    config: Arc::clone(&ticket.config),
                });
                self.metrics.record_generation_displayed();
                tracing::debug!("Displayed generation #{}", ticket.sequence);
                GenerationOutcome::Displayed {
                    sequence: ticket.sequence,
                }
            }
            Err(error) => {
                state.phase = GenerationPhase::Failed;
                drop(state);
                tracing::warn!("Generation #{} failed: {}", ticket.sequence, error);
                self.metrics.record_generation_failed();
                self.notifier.error(format!("Failed to generate barcode: {error}"));
                GenerationOutcome::Failed {
                    sequence: ticket.sequence,
                    error,
                }
            }
        }
    }
}
