use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use super::notify::Notifier;
use super::persistence::PersistenceError;
use crate::models::{BarcodeConfig, Envelope, ImportRow};
use crate::validation::ConfigValidator;

/// Remote spreadsheet ingestion
#[async_trait]
pub trait ImportPipeline: Send + Sync {
    async fn submit_file(&self, bytes: Vec<u8>) -> Result<Envelope<()>>;

    async fn get_imported_rows(&self) -> Result<Envelope<Vec<ImportRow>>>;
}

/// Validation verdict for one imported row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowReport {
    /// Zero-based row position in the import
    pub index: usize,
    pub value: String,
    pub errors: Vec<String>,
}

impl RowReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct ImportCoordinator {
    pipeline: Arc<dyn ImportPipeline>,
    notifier: Notifier,
}

impl ImportCoordinator {
    pub fn new(pipeline: Arc<dyn ImportPipeline>, notifier: Notifier) -> Self {
        Self { pipeline, notifier }
    }

    /// Submit a file and validate every row it produced.
    ///
    /// # Arguments
    /// * `bytes` - Raw spreadsheet contents
    /// * `symbology` - Symbology every row is validated against
    pub async fn import(&self, bytes: Vec<u8>, symbology: &str) -> Result<Vec<RowReport>, PersistenceError> {
        let submitted = PersistenceError::check("submit_file", self.pipeline.submit_file(bytes).await);
        if let Err(err) = submitted {
            self.notifier.error(err.to_string());
            return Err(err);
        }

        let rows = match PersistenceError::check(
            "get_imported_rows",
            self.pipeline.get_imported_rows().await,
        ) {
            Ok(rows) => rows.unwrap_or_default(),
            Err(err) => {
                self.notifier.error(err.to_string());
                return Err(err);
            }
        };

        let reports = Self::review(&rows, symbology);
        let invalid = reports.iter().filter(|r| !r.is_valid()).count();
        if invalid > 0 {
            self.notifier
                .warn(format!("{invalid} of {} imported rows are invalid", reports.len()));
        } else {
            self.notifier.info(format!("Imported {} rows", reports.len()));
        }
        Ok(reports)
    }

    /// Validate rows without touching the pipeline.
    pub fn review(rows: &[ImportRow], symbology: &str) -> Vec<RowReport> {
        let validator = ConfigValidator::default();
        rows.iter()
            .enumerate()
            .map(|(index, row)| RowReport {
                index,
                value: row.value.clone(),
                errors: validator.validate(&row.value, symbology),
            })
            .collect()
    }

    /// Configurations for the rows that passed validation, in row order.
    pub fn configs_for(rows: &[ImportRow], reports: &[RowReport], base: &BarcodeConfig) -> Vec<BarcodeConfig> {
        reports
            .iter()
            .filter(|r| r.is_valid())
            .filter_map(|r| rows.get(r.index))
            .map(|row| row.apply_to(base))
            .collect()
    }
}
