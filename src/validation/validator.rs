use std::fmt;
use thiserror::Error;

use super::rules::{RuleTable, ValidationRule};
use crate::models::BarcodeConfig;

/// A single way a payload breaks its symbology's rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    TooShort {
        symbology: String,
        min: usize,
        actual: usize,
    },
    TooLong {
        symbology: String,
        max: usize,
        actual: usize,
    },
    InvalidCharacters {
        symbology: String,
        allowed: Option<&'static str>,
        found: char,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { symbology, min, .. } => {
                write!(f, "{symbology} requires at least {min} characters")
            }
            Self::TooLong { symbology, max, .. } => {
                write!(f, "{symbology} supports maximum {max} characters")
            }
            Self::InvalidCharacters {
                symbology,
                allowed: Some(allowed),
                ..
            } => write!(f, "{symbology} only supports: {allowed}"),
            Self::InvalidCharacters { symbology, .. } => {
                write!(f, "{symbology} contains invalid characters")
            }
        }
    }
}

/// Errors raised before a configuration or template reaches a collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{}", violations.join("; "))]
    InvalidPayload {
        symbology: String,
        violations: Vec<String>,
    },

    #[error("Payload is empty")]
    EmptyPayload,

    #[error("Template name is required")]
    BlankTemplateName,
}

/// Checks payloads against a [`RuleTable`].
#[derive(Debug, Clone, Copy)]
pub struct ConfigValidator<'a> {
    rules: &'a RuleTable,
}

impl Default for ConfigValidator<'static> {
    fn default() -> Self {
        Self::new(RuleTable::global())
    }
}

impl<'a> ConfigValidator<'a> {
    pub fn new(rules: &'a RuleTable) -> Self {
        Self { rules }
    }

    /// Structured violations in reporting order: length, then alphabet.
    ///
    /// A symbology without a rule never produces violations. The alphabet
    /// check looks only at character membership, so a too-short payload of
    /// valid characters yields exactly one violation.
    pub fn check(&self, payload: &str, symbology: &str) -> Vec<Violation> {
        let Some(rule) = self.rules.lookup(symbology) else {
            tracing::trace!("No validation rule for {}, accepting payload", symbology);
            return Vec::new();
        };
        check_against(rule, payload)
    }

    /// Human-readable violation messages; empty means valid.
    pub fn validate(&self, payload: &str, symbology: &str) -> Vec<String> {
        self.check(payload, symbology)
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Gate used before any generation attempt.
    pub fn validate_config(&self, config: &BarcodeConfig) -> Result<(), ValidationError> {
        if !config.has_payload() {
            return Err(ValidationError::EmptyPayload);
        }
        let violations = self.validate(&config.payload, &config.symbology);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::InvalidPayload {
                symbology: config.symbology.clone(),
                violations,
            })
        }
    }
}

fn check_against(rule: &ValidationRule, payload: &str) -> Vec<Violation> {
    let mut violations = Vec::new();
    let length = payload.chars().count();

    if length < rule.min_length {
        violations.push(Violation::TooShort {
            symbology: rule.symbology.to_string(),
            min: rule.min_length,
            actual: length,
        });
    }
    if length > rule.max_length {
        violations.push(Violation::TooLong {
            symbology: rule.symbology.to_string(),
            max: rule.max_length,
            actual: length,
        });
    }
    if let Some(found) = rule.first_disallowed(payload) {
        violations.push(Violation::InvalidCharacters {
            symbology: rule.symbology.to_string(),
            allowed: rule.alphabet_description,
            found,
        });
    }
    violations
}

/// Validate against the global rule table.
///
/// # Arguments
/// * `payload` - Raw payload text
/// * `symbology` - Symbology name, case-sensitive
///
/// # Returns
/// Violation messages in order; an empty list means the payload is valid
pub fn validate(payload: &str, symbology: &str) -> Vec<String> {
    ConfigValidator::default().validate(payload, symbology)
}
