// Session metrics
//
// Lock-free counters for configuration edits, generation requests and
// template operations, summarized to the log on shutdown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters shared by the store, the generation orchestrator and the
/// template coordinator.
#[derive(Debug)]
pub struct Metrics {
    /// Configuration snapshots published by the store
    pub config_updates: AtomicU64,

    /// Dimension corrections applied by the synchronizer
    pub dimension_corrections: AtomicU64,

    /// Generation requests issued to the renderer
    pub generations_requested: AtomicU64,

    /// Completions that became the displayed preview
    pub generations_displayed: AtomicU64,

    /// Completions discarded because a newer request existed
    pub generations_stale: AtomicU64,

    /// Latest-request completions that failed
    pub generations_failed: AtomicU64,

    /// Trigger evaluations blocked by validation
    pub validation_blocks: AtomicU64,

    pub total_render_time_ms: AtomicU64,

    pub templates_saved: AtomicU64,
    pub templates_deleted: AtomicU64,
    pub template_errors: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            config_updates: AtomicU64::new(0),
            dimension_corrections: AtomicU64::new(0),
            generations_requested: AtomicU64::new(0),
            generations_displayed: AtomicU64::new(0),
            generations_stale: AtomicU64::new(0),
            generations_failed: AtomicU64::new(0),
            validation_blocks: AtomicU64::new(0),
            total_render_time_ms: AtomicU64::new(0),
            templates_saved: AtomicU64::new(0),
            templates_deleted: AtomicU64::new(0),
            template_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_config_update(&self) {
        self.config_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dimension_correction(&self) {
        self.dimension_corrections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_generation_requested(&self) {
        self.generations_requested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_generation_displayed(&self) {
        self.generations_displayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_generation_stale(&self) {
        self.generations_stale.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_generation_failed(&self) {
        self.generations_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_validation_block(&self) {
        self.validation_blocks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_render_time(&self, duration: Duration) {
        self.total_render_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_template_saved(&self) {
        self.templates_saved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_template_deleted(&self) {
        self.templates_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_template_error(&self) {
        self.template_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average renderer time over every completion, displayed or not
    pub fn avg_render_time_ms(&self) -> f64 {
        let total = self.total_render_time_ms.load(Ordering::Relaxed);
        let count = self.generations_displayed.load(Ordering::Relaxed)
            + self.generations_stale.load(Ordering::Relaxed)
            + self.generations_failed.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Session Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Configuration: {} updates, {} dimension corrections",
            self.config_updates.load(Ordering::Relaxed),
            self.dimension_corrections.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Generation: {} requested, {} displayed, {} stale, {} failed, {} blocked by validation",
            self.generations_requested.load(Ordering::Relaxed),
            self.generations_displayed.load(Ordering::Relaxed),
            self.generations_stale.load(Ordering::Relaxed),
            self.generations_failed.load(Ordering::Relaxed),
            self.validation_blocks.load(Ordering::Relaxed)
        );
        tracing::info!("Average render time: {:.2}ms", self.avg_render_time_ms());
        tracing::info!(
            "Templates: {} saved, {} deleted, {} errors",
            self.templates_saved.load(Ordering::Relaxed),
            self.templates_deleted.load(Ordering::Relaxed),
            self.template_errors.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
