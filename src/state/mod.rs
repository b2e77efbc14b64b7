// Configuration store
//
// Owns the live BarcodeConfig behind Arc<RwLock<..>>, publishes whole
// snapshots to subscribers in mutation order and keeps the last accepted
// preview image.

pub mod dimensions;

pub use dimensions::{DimensionSynchronizer, SyncAction};

use crate::metrics::Metrics;
use crate::models::{BarcodeConfig, DimensionField, TextStyle};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc;

/// What differs between two consecutive snapshots
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigChange {
    SymbologyChanged { from: String, to: String },

    PayloadChanged,

    /// `corrected` is set when the synchronizer adjusted the edit
    DimensionsChanged { corrected: bool },

    /// Scale or quiet zones
    OutputChanged,

    TextsChanged,
}

/// A published snapshot with the changes that produced it
#[derive(Clone, Debug)]
pub struct ConfigUpdate {
    /// Monotonic per store; one per published snapshot
    pub revision: u64,
    pub snapshot: Arc<BarcodeConfig>,
    pub changes: Vec<ConfigChange>,
}

/// The rendered image currently on display
#[derive(Clone, Debug, PartialEq)]
pub struct Preview {
    /// Generation sequence number that produced the image
    pub sequence: u64,
    pub png: Vec<u8>,
    pub config: Arc<BarcodeConfig>,
}

impl Preview {
    pub fn data_url(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Receiving half of a store subscription.
///
/// Dropping it unsubscribes lazily; [`ConfigurationStore::unsubscribe`]
/// does so eagerly.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::UnboundedReceiver<ConfigUpdate>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub async fn recv(&mut self) -> Option<ConfigUpdate> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ConfigUpdate> {
        self.rx.try_recv().ok()
    }
}

struct StoreInner {
    config: Arc<BarcodeConfig>,
    revision: u64,
    preview: Option<Arc<Preview>>,
    subscribers: IndexMap<SubscriptionId, mpsc::UnboundedSender<ConfigUpdate>>,
    next_subscription: u64,
}

/// Single source of truth for the configuration being edited.
///
/// - [`current()`](Self::current) hands out an immutable snapshot
/// - [`update()`](Self::update) applies a mutation to a copy, lets the
///   [`DimensionSynchronizer`] correct it and publishes the result
/// - [`replace()`](Self::replace) installs a configuration wholesale (template load)
///
/// Subscribers receive every published snapshot exactly once and in
/// mutation order, because publishing happens while the write lock is held.
/// Cloning the store yields another handle to the same state.
#[derive(Clone)]
pub struct ConfigurationStore {
    inner: Arc<RwLock<StoreInner>>,
    synchronizer: DimensionSynchronizer<'static>,
    metrics: Arc<Metrics>,
}

impl ConfigurationStore {
    pub fn new() -> Self {
        Self::with_config(BarcodeConfig::default(), Arc::new(Metrics::new()))
    }

    pub fn with_config(config: BarcodeConfig, metrics: Arc<Metrics>) -> Self {
        let synchronizer = DimensionSynchronizer::default();
        let config = BarcodeConfig {
            dimensions: synchronizer.enforce_square(&config.symbology, config.dimensions),
            ..config
        };
        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                config: Arc::new(config),
                revision: 0,
                preview: None,
                subscribers: IndexMap::new(),
                next_subscription: 0,
            })),
            synchronizer,
            metrics,
        }
    }

    fn read_inner(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_inner(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// The latest published snapshot.
    pub fn current(&self) -> Arc<BarcodeConfig> {
        Arc::clone(&self.read_inner().config)
    }

    /// Execute a function with read access to the configuration
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&BarcodeConfig) -> R,
    {
        f(&self.read_inner().config)
    }

    pub fn revision(&self) -> u64 {
        self.read_inner().revision
    }

    /// Apply a mutation and publish the corrected result.
    ///
    /// The closure works on a private copy; nothing is visible to readers
    /// or subscribers until the corrected copy is installed. A mutation
    /// that leaves the configuration unchanged publishes nothing.
    ///
    /// # Returns
    /// The changes that were published, empty if none
    pub fn update<F>(&self, mutate: F) -> Vec<ConfigChange>
    where
        F: FnOnce(&mut BarcodeConfig),
    {
        let mut inner = self.write_inner();
        let previous = Arc::clone(&inner.config);

        let mut next = (*previous).clone();
        mutate(&mut next);

        let (dimensions, action) = self.synchronizer.synchronize(&previous, &next);
        if action != SyncAction::Unchanged {
            tracing::debug!(
                "Dimensions {:?} for {}: {:?} -> {:?}",
                action,
                next.symbology,
                next.dimensions,
                dimensions
            );
            self.metrics.record_dimension_correction();
        }
        next.dimensions = dimensions;

        let changes = detect_changes(&previous, &next, action != SyncAction::Unchanged);
        if !changes.is_empty() {
            self.publish(&mut inner, next, changes.clone());
        }
        changes
    }

    /// Install a configuration wholesale.
    ///
    /// The incoming configuration is authoritative: no rectangular reset is
    /// applied, only the square invariant is enforced (width wins).
    pub fn replace(&self, config: BarcodeConfig) -> Vec<ConfigChange> {
        let mut inner = self.write_inner();
        let previous = Arc::clone(&inner.config);

        let mut next = config;
        let squared = self
            .synchronizer
            .enforce_square(&next.symbology, next.dimensions);
        let corrected = squared != next.dimensions;
        next.dimensions = squared;

        let changes = detect_changes(&previous, &next, corrected);
        if !changes.is_empty() {
            self.publish(&mut inner, next, changes.clone());
        }
        changes
    }

    fn publish(&self, inner: &mut StoreInner, next: BarcodeConfig, changes: Vec<ConfigChange>) {
        inner.revision += 1;
        inner.config = Arc::new(next);
        self.metrics.record_config_update();

        let update = ConfigUpdate {
            revision: inner.revision,
            snapshot: Arc::clone(&inner.config),
            changes,
        };
        inner.subscribers.retain(|id, tx| {
            let delivered = tx.send(update.clone()).is_ok();
            if !delivered {
                tracing::debug!("Dropping closed subscription {:?}", id);
            }
            delivered
        });
        tracing::trace!(
            "Published revision {} to {} subscriber(s)",
            update.revision,
            inner.subscribers.len()
        );
    }

    /// Register for every future snapshot.
    pub fn subscribe(&self) -> Subscription {
        let mut inner = self.write_inner();
        let id = SubscriptionId(inner.next_subscription);
        inner.next_subscription += 1;

        let (tx, rx) = mpsc::unbounded_channel();
        inner.subscribers.insert(id, tx);
        Subscription { id, rx }
    }

    /// Stop delivery to a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.write_inner().subscribers.shift_remove(&id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.read_inner().subscribers.len()
    }

    pub fn preview(&self) -> Option<Arc<Preview>> {
        self.read_inner().preview.clone()
    }

    pub(crate) fn set_preview(&self, preview: Preview) {
        self.write_inner().preview = Some(Arc::new(preview));
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    // Convenience methods for common edits

    pub fn set_payload(&self, payload: impl Into<String>) -> Vec<ConfigChange> {
        let payload = payload.into();
        self.update(|config| config.payload = payload)
    }

    pub fn set_symbology(&self, symbology: impl Into<String>) -> Vec<ConfigChange> {
        let symbology = symbology.into();
        self.update(|config| config.symbology = symbology)
    }

    pub fn set_dimension(&self, field: DimensionField, value: f64) -> Vec<ConfigChange> {
        self.update(|config| config.dimensions = config.dimensions.with(field, value))
    }

    /// Set the module scale; values below 1 are raised to 1.
    pub fn set_scale(&self, scale: u32) -> Vec<ConfigChange> {
        self.update(|config| config.scale = scale.max(1))
    }

    pub fn set_quiet_zones(&self, enabled: bool) -> Vec<ConfigChange> {
        self.update(|config| config.quiet_zones = enabled)
    }

    /// Append a default-styled text.
    ///
    /// # Returns
    /// The id assigned to the new text
    pub fn add_text(&self, text: impl Into<String>) -> u64 {
        let text = text.into();
        let mut id = 0;
        self.update(|config| id = config.add_text(text));
        id
    }

    /// Edit one text in place. Unknown ids publish nothing.
    pub fn update_text<F>(&self, id: u64, edit: F) -> Vec<ConfigChange>
    where
        F: FnOnce(&mut TextStyle),
    {
        self.update(|config| {
            if let Some(text) = config.text_mut(id) {
                edit(text);
                text.id = id;
            }
        })
    }

    /// Remove a text. The last remaining text is kept.
    pub fn remove_text(&self, id: u64) -> Vec<ConfigChange> {
        self.update(|config| {
            config.remove_text(id);
        })
    }
}

impl Default for ConfigurationStore {
    fn default() -> Self {
        Self::new()
    }
}

fn detect_changes(old: &BarcodeConfig, new: &BarcodeConfig, corrected: bool) -> Vec<ConfigChange> {
    let mut changes = Vec::new();

    if old.symbology != new.symbology {
        changes.push(ConfigChange::SymbologyChanged {
            from: old.symbology.clone(),
            to: new.symbology.clone(),
        });
    }
    if old.payload != new.payload {
        changes.push(ConfigChange::PayloadChanged);
    }
    if old.dimensions != new.dimensions {
        changes.push(ConfigChange::DimensionsChanged { corrected });
    }
    if old.scale != new.scale || old.quiet_zones != new.quiet_zones {
        changes.push(ConfigChange::OutputChanged);
    }
    if old.texts != new.texts {
        changes.push(ConfigChange::TextsChanged);
    }

    changes
}
