// Payload rules per symbology and the validator that applies them

pub mod rules;
pub mod validator;

pub use rules::{DimensionClass, RuleTable, ValidationRule};
pub use validator::{ConfigValidator, ValidationError, Violation, validate};
