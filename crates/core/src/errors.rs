use thiserror::Error;

/// A rule definition that cannot be compiled. Raised at ingestion, never mid-evaluation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("rule `{rule_id}` has invalid {field}: {reason}")]
pub struct RuleValidationError {
    pub rule_id: String,
    pub field: String,
    pub reason: String,
}

impl RuleValidationError {
    pub fn new(rule_id: &str, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { rule_id: rule_id.to_string(), field: field.into(), reason: reason.into() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    RuleValidation(#[from] RuleValidationError),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("catalog failure: {0}")]
    Catalog(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl From<RuleValidationError> for ApplicationError {
    fn from(value: RuleValidationError) -> Self {
        Self::Domain(DomainError::RuleValidation(value))
    }
}

impl ApplicationError {
    /// Stable machine-readable class used in operator-facing output.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::RuleValidation(_)) => "rule_validation",
            Self::Domain(DomainError::InvariantViolation(_)) => "bad_request",
            Self::Catalog(_) => "catalog_load",
            Self::Configuration(_) => "config_validation",
        }
    }
}
