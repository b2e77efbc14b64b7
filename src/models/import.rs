use serde::{Deserialize, Serialize};

use super::barcode::{BarcodeConfig, DimensionField, TextPosition, TextStyle};
use crate::state::DimensionSynchronizer;

/// One spreadsheet row returned by the bulk import pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRow {
    pub value: String,
    #[serde(default)]
    pub upper_center_text: Option<String>,
    #[serde(default)]
    pub lower_center_text: Option<String>,
    #[serde(default)]
    pub scale: Option<u32>,
    #[serde(default)]
    pub height_percentage: Option<f64>,
    #[serde(default)]
    pub width_percentage: Option<f64>,
    #[serde(default)]
    pub font_size: Option<u32>,
}

impl ImportRow {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            upper_center_text: None,
            lower_center_text: None,
            scale: None,
            height_percentage: None,
            width_percentage: None,
            font_size: None,
        }
    }

    /// Derive the configuration this row renders with.
    ///
    /// Row overrides win over `base`; the text list is rebuilt from the
    /// row's centered captions and falls back to the base texts when the
    /// row has none. Percentage overrides keep square symbologies square.
    pub fn apply_to(&self, base: &BarcodeConfig) -> BarcodeConfig {
        let mut config = base.clone();
        config.payload = self.value.clone();
        if let Some(scale) = self.scale {
            config.scale = scale.max(1);
        }
        let sync = DimensionSynchronizer::default();
        let mut dimensions = config.dimensions;
        // Height first so width wins on square symbologies
        if let Some(pct) = self.height_percentage {
            dimensions =
                sync.apply_edit(&config.symbology, dimensions, DimensionField::HeightPct, pct);
        }
        if let Some(pct) = self.width_percentage {
            dimensions =
                sync.apply_edit(&config.symbology, dimensions, DimensionField::WidthPct, pct);
        }
        config.dimensions = sync.enforce_square(&config.symbology, dimensions);

        let captions = [
            (self.upper_center_text.as_deref(), TextPosition::UpperCenter),
            (self.lower_center_text.as_deref(), TextPosition::LowerCenter),
        ];
        let mut texts = Vec::new();
        for (caption, position) in captions {
            let Some(caption) = caption.filter(|c| !c.trim().is_empty()) else {
                continue;
            };
            let mut style = TextStyle::new(texts.len() as u64 + 1, caption);
            style.position = position;
            if let Some(size) = self.font_size {
                style.size = size;
            }
            texts.push(style);
        }
        if !texts.is_empty() {
            config.texts = texts;
        }
        config
    }
}
