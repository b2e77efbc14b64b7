//! Keeps the dimension fields consistent with the active symbology.
//!
//! Square symbologies mirror width and height within each unit pair; switching
//! to one copies width into height.
//! Switching to a rectangular symbology resets the physical size to
//! [`RECTANGULAR_WIDTH_MM`] x [`RECTANGULAR_HEIGHT_MM`]; percentages are left
//! as they are.

use crate::models::{BarcodeConfig, DimensionField, Dimensions};
use crate::validation::{DimensionClass, RuleTable};

pub const RECTANGULAR_WIDTH_MM: f64 = 50.0;
pub const RECTANGULAR_HEIGHT_MM: f64 = 25.0;

/// What a synchronization pass did to the proposed dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Unchanged,
    Mirrored,
    Reset,
}

#[derive(Debug, Clone, Copy)]
pub struct DimensionSynchronizer<'a> {
    rules: &'a RuleTable,
}

impl Default for DimensionSynchronizer<'static> {
    fn default() -> Self {
        Self::new(RuleTable::global())
    }
}

impl<'a> DimensionSynchronizer<'a> {
    pub fn new(rules: &'a RuleTable) -> Self {
        Self { rules }
    }

    /// Correct the dimensions of `next` given the configuration it replaces.
    ///
    /// # Arguments
    /// * `previous` - Configuration before the edit
    /// * `next` - Proposed configuration after the edit
    ///
    /// # Returns
    /// The dimensions `next` must carry, and what was done to get them
    pub fn synchronize(
        &self,
        previous: &BarcodeConfig,
        next: &BarcodeConfig,
    ) -> (Dimensions, SyncAction) {
        let class = self.rules.dimension_class(&next.symbology);

        if previous.symbology != next.symbology {
            return match class {
                Some(DimensionClass::Square) => {
                    let squared = self.enforce_square(&next.symbology, next.dimensions);
                    (squared, action_for(&next.dimensions, &squared, SyncAction::Mirrored))
                }
                Some(DimensionClass::Rectangular) => {
                    let reset = Self::rectangular_reset(next.dimensions);
                    (reset, action_for(&next.dimensions, &reset, SyncAction::Reset))
                }
                None => (next.dimensions, SyncAction::Unchanged),
            };
        }

        match class {
            Some(DimensionClass::Square) => self.mirror(&previous.dimensions, &next.dimensions),
            _ => (next.dimensions, SyncAction::Unchanged),
        }
    }

    /// Apply a single-field edit, mirroring it on square symbologies.
    pub fn apply_edit(
        &self,
        symbology: &str,
        dimensions: Dimensions,
        field: DimensionField,
        value: f64,
    ) -> Dimensions {
        let edited = dimensions.with(field, value);
        if self.rules.is_square(symbology) {
            edited.with(field.paired(), value)
        } else {
            edited
        }
    }

    /// Square a configuration that arrived wholesale. Width wins.
    pub fn enforce_square(&self, symbology: &str, dimensions: Dimensions) -> Dimensions {
        if !self.rules.is_square(symbology) {
            return dimensions;
        }
        Dimensions {
            height_mm: dimensions.width_mm,
            height_pct: dimensions.width_pct,
            ..dimensions
        }
    }

    fn rectangular_reset(dimensions: Dimensions) -> Dimensions {
        Dimensions {
            width_mm: RECTANGULAR_WIDTH_MM,
            height_mm: RECTANGULAR_HEIGHT_MM,
            ..dimensions
        }
    }

    // Per unit pair: if only height moved, height wins; otherwise width wins.
    fn mirror(&self, previous: &Dimensions, next: &Dimensions) -> (Dimensions, SyncAction) {
        let (width_mm, height_mm) = mirror_pair(
            (previous.width_mm, previous.height_mm),
            (next.width_mm, next.height_mm),
        );
        let (width_pct, height_pct) = mirror_pair(
            (previous.width_pct, previous.height_pct),
            (next.width_pct, next.height_pct),
        );
        let mirrored = Dimensions::new(width_mm, height_mm, width_pct, height_pct);
        (mirrored, action_for(next, &mirrored, SyncAction::Mirrored))
    }
}

fn mirror_pair(previous: (f64, f64), next: (f64, f64)) -> (f64, f64) {
    let width_changed = previous.0 != next.0;
    let height_changed = previous.1 != next.1;
    if height_changed && !width_changed {
        (next.1, next.1)
    } else {
        (next.0, next.0)
    }
}

fn action_for(proposed: &Dimensions, corrected: &Dimensions, action: SyncAction) -> SyncAction {
    if proposed == corrected {
        SyncAction::Unchanged
    } else {
        action
    }
}
