use indexmap::IndexMap;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Whether a symbology keeps width and height equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimensionClass {
    Square,
    Rectangular,
}

impl DimensionClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Square => "square",
            Self::Rectangular => "rectangular",
        }
    }
}

impl fmt::Display for DimensionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Payload constraints for one symbology.
///
/// Lengths count characters, not bytes. The alphabet is stored as a negated
/// character class so a single `find` locates the first disallowed character.
#[derive(Debug, Clone)]
pub struct ValidationRule {
    pub symbology: &'static str,
    pub min_length: usize,
    pub max_length: usize,
    /// Human-readable alphabet; `None` for symbologies whose rejection
    /// message does not enumerate the allowed set
    pub alphabet_description: Option<&'static str>,
    pub dimension_class: DimensionClass,
    disallowed: Regex,
}

impl ValidationRule {
    /// First character of `payload` outside the alphabet.
    pub fn first_disallowed(&self, payload: &str) -> Option<char> {
        self.disallowed
            .find(payload)
            .and_then(|m| m.as_str().chars().next())
    }

    pub fn allows(&self, payload: &str) -> bool {
        !self.disallowed.is_match(payload)
    }

    pub fn is_square(&self) -> bool {
        self.dimension_class == DimensionClass::Square
    }
}

// Character class bodies. `LATIN1` admits any character in U+0000..=U+00FF;
// `\s` is any Unicode whitespace.
const DIGITS: &str = r"0-9";
const LATIN1: &str = r"\x00-\xFF";
const CODE128: &str = r"A-Za-z0-9\s\-./+%";
const CODE39: &str = r"0-9A-Z\-.\s$/+%";
const CODABAR: &str = r"0-9A-D\-\s./:+$";

const DIGITS_DESC: &str = "0-9";
const CODE39_DESC: &str = "0-9, A-Z, -, ., whitespace, $, /, +, %";
const CODABAR_DESC: &str = "0-9, A-D, -, ., whitespace, /, :, +, $";

struct RuleDef {
    symbology: &'static str,
    min_length: usize,
    max_length: usize,
    class: &'static str,
    description: Option<&'static str>,
    dimension_class: DimensionClass,
}

const fn rule(
    symbology: &'static str,
    min_length: usize,
    max_length: usize,
    class: &'static str,
    description: Option<&'static str>,
    dimension_class: DimensionClass,
) -> RuleDef {
    RuleDef {
        symbology,
        min_length,
        max_length,
        class,
        description,
        dimension_class,
    }
}

use DimensionClass::{Rectangular, Square};

const RULE_DEFS: &[RuleDef] = &[
    rule("Code128", 1, 99, CODE128, None, Rectangular),
    rule("Code39", 1, 43, CODE39, Some(CODE39_DESC), Rectangular),
    rule("QRCode", 1, 2953, LATIN1, None, Square),
    rule("EAN13", 13, 13, DIGITS, Some(DIGITS_DESC), Rectangular),
    rule("EAN8", 8, 8, DIGITS, Some(DIGITS_DESC), Rectangular),
    rule("UPCA", 12, 12, DIGITS, Some(DIGITS_DESC), Rectangular),
    rule("UPCE", 8, 8, DIGITS, Some(DIGITS_DESC), Rectangular),
    rule("DataMatrix", 1, 2335, LATIN1, None, Square),
    rule("PDF417", 1, 1850, LATIN1, None, Rectangular),
    rule("Aztec", 1, 3832, LATIN1, None, Square),
    rule("Codabar", 4, 20, CODABAR, Some(CODABAR_DESC), Rectangular),
    rule("Code93", 1, 48, CODE39, Some(CODE39_DESC), Rectangular),
    rule("DataBar", 14, 14, DIGITS, Some(DIGITS_DESC), Rectangular),
    rule("DataBarExpanded", 4, 74, CODE39, Some(CODE39_DESC), Rectangular),
    rule("DataBarLimited", 14, 14, DIGITS, Some(DIGITS_DESC), Rectangular),
    rule("ITF", 2, 14, DIGITS, Some(DIGITS_DESC), Rectangular),
    rule("MaxiCode", 1, 150, LATIN1, None, Square),
    rule("MicroQRCode", 1, 35, LATIN1, None, Square),
    rule("RMQRCode", 1, 3617, LATIN1, None, Rectangular),
    rule("DXFilmEdge", 6, 6, DIGITS, Some(DIGITS_DESC), Rectangular),
];

static GLOBAL: LazyLock<RuleTable> = LazyLock::new(RuleTable::builtin);

/// Immutable mapping from symbology name to its [`ValidationRule`].
///
/// Names are case-sensitive and iterate in declaration order.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: IndexMap<&'static str, ValidationRule>,
}

impl RuleTable {
    /// Shared table with every supported symbology.
    pub fn global() -> &'static RuleTable {
        &GLOBAL
    }

    fn builtin() -> Self {
        let rules = RULE_DEFS
            .iter()
            .map(|def| {
                let pattern = format!("[^{}]", def.class);
                let disallowed = Regex::new(&pattern).expect("Invalid alphabet regex");
                let rule = ValidationRule {
                    symbology: def.symbology,
                    min_length: def.min_length,
                    max_length: def.max_length,
                    alphabet_description: def.description,
                    dimension_class: def.dimension_class,
                    disallowed,
                };
                (def.symbology, rule)
            })
            .collect();
        Self { rules }
    }

    pub fn lookup(&self, symbology: &str) -> Option<&ValidationRule> {
        self.rules.get(symbology)
    }

    pub fn dimension_class(&self, symbology: &str) -> Option<DimensionClass> {
        self.lookup(symbology).map(|r| r.dimension_class)
    }

    /// `true` only for known square symbologies.
    pub fn is_square(&self, symbology: &str) -> bool {
        self.dimension_class(symbology) == Some(DimensionClass::Square)
    }

    pub fn symbologies(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationRule> {
        self.rules.values()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
