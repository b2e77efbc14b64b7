use serde::{Deserialize, Serialize};

/// Symbology selected for a fresh configuration.
pub const DEFAULT_SYMBOLOGY: &str = "Code128";

/// Default payload for a fresh configuration.
pub const DEFAULT_PAYLOAD: &str = "123456789";

/// One of the four editable dimension fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionField {
    WidthMm,
    HeightMm,
    WidthPct,
    HeightPct,
}

impl DimensionField {
    /// The field this one mirrors into on square symbologies.
    pub fn paired(self) -> Self {
        match self {
            Self::WidthMm => Self::HeightMm,
            Self::HeightMm => Self::WidthMm,
            Self::WidthPct => Self::HeightPct,
            Self::HeightPct => Self::WidthPct,
        }
    }

    pub fn all() -> [Self; 4] {
        [Self::WidthMm, Self::HeightMm, Self::WidthPct, Self::HeightPct]
    }
}

/// Physical and relative size of the rendered symbol.
///
/// Serialized with the `width_percentage`/`height_percentage` names the
/// template store and renderer expect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width_mm: f64,
    pub height_mm: f64,
    #[serde(rename = "width_percentage")]
    pub width_pct: f64,
    #[serde(rename = "height_percentage")]
    pub height_pct: f64,
}

impl Dimensions {
    pub const fn new(width_mm: f64, height_mm: f64, width_pct: f64, height_pct: f64) -> Self {
        Self {
            width_mm,
            height_mm,
            width_pct,
            height_pct,
        }
    }

    pub fn get(&self, field: DimensionField) -> f64 {
        match field {
            DimensionField::WidthMm => self.width_mm,
            DimensionField::HeightMm => self.height_mm,
            DimensionField::WidthPct => self.width_pct,
            DimensionField::HeightPct => self.height_pct,
        }
    }

    /// Copy with a single field replaced.
    pub fn with(self, field: DimensionField, value: f64) -> Self {
        let mut next = self;
        match field {
            DimensionField::WidthMm => next.width_mm = value,
            DimensionField::HeightMm => next.height_mm = value,
            DimensionField::WidthPct => next.width_pct = value,
            DimensionField::HeightPct => next.height_pct = value,
        }
        next
    }

    /// Both pairs hold equal values.
    pub fn is_square(&self) -> bool {
        self.width_mm == self.height_mm && self.width_pct == self.height_pct
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::new(50.0, 25.0, 100.0, 100.0)
    }
}

/// Placement of a decorative text relative to the symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextPosition {
    Upper,
    Lower,
    None,
    UpperCenter,
    LowerCenter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A decorative text line drawn above or below the symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub text: String,
    #[serde(rename = "text_color")]
    pub color: Rgb,
    #[serde(rename = "text_size")]
    pub size: u32,
    #[serde(rename = "text_position")]
    pub position: TextPosition,
    pub font: String,
    pub margin: u32,
    /// Unique within the owning configuration's text list
    pub id: u64,
}

impl TextStyle {
    /// Black 12pt Arial below the symbol, the same style new texts get in the editor.
    pub fn new(id: u64, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: Rgb::BLACK,
            size: 12,
            position: TextPosition::Lower,
            font: "Arial".to_string(),
            margin: 5,
            id,
        }
    }
}

/// The complete description of one barcode.
///
/// Owned by [`crate::state::ConfigurationStore`], which replaces it wholesale
/// on every edit. Field names on the wire follow the persisted template layout
/// (`format: { format }`, `data`, `quiet_zones`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarcodeConfig {
    #[serde(rename = "format", with = "format_tag")]
    pub symbology: String,
    #[serde(rename = "data")]
    pub payload: String,
    pub scale: u32,
    pub quiet_zones: bool,
    pub dimensions: Dimensions,
    pub texts: Vec<TextStyle>,
}

impl Default for BarcodeConfig {
    fn default() -> Self {
        Self {
            symbology: DEFAULT_SYMBOLOGY.to_string(),
            payload: DEFAULT_PAYLOAD.to_string(),
            scale: 2,
            quiet_zones: true,
            dimensions: Dimensions::default(),
            texts: vec![TextStyle::new(1, DEFAULT_PAYLOAD)],
        }
    }
}

impl BarcodeConfig {
    pub fn has_payload(&self) -> bool {
        !self.payload.trim().is_empty()
    }

    /// Next free text id; ids are never derived from wall-clock time.
    pub fn next_text_id(&self) -> u64 {
        self.texts.iter().map(|t| t.id).max().map_or(1, |max| max + 1)
    }

    /// Append a default-styled text and return its id.
    pub fn add_text(&mut self, text: impl Into<String>) -> u64 {
        let id = self.next_text_id();
        self.texts.push(TextStyle::new(id, text));
        id
    }

    /// Remove a text by id. The last remaining text is kept.
    pub fn remove_text(&mut self, id: u64) -> bool {
        if self.texts.len() <= 1 {
            return false;
        }
        let before = self.texts.len();
        self.texts.retain(|t| t.id != id);
        self.texts.len() != before
    }

    pub fn text_mut(&mut self, id: u64) -> Option<&mut TextStyle> {
        self.texts.iter_mut().find(|t| t.id == id)
    }
}

/// Session layout handed out by the bootstrap collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub config: BarcodeConfig,
}

mod format_tag {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize)]
    struct TagRef<'a> {
        format: &'a str,
    }

    #[derive(Deserialize)]
    struct Tag {
        format: String,
    }

    pub fn serialize<S: Serializer>(symbology: &str, serializer: S) -> Result<S::Ok, S::Error> {
        TagRef { format: symbology }.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Tag::deserialize(deserializer).map(|tag| tag.format)
    }
}
