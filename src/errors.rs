use thiserror::Error;

#[derive(Debug, Error)]
pub enum OdmError {
    #[error("Malformed path {path:?}: {reason}")]
    MalformedPath { path: String, reason: String },

    #[error("Unknown field {field:?} on {container}")]
    UnknownField { container: String, field: String },

    #[error("Index {index} out of range at {path:?} (length {len})")]
    IndexOutOfRange { path: String, index: usize, len: usize },

    #[error("Conflicting update on {path:?}: {reason}")]
    ConflictingUpdate { path: String, reason: String },

    #[error("Invalid operand for ${op}: {reason}")]
    InvalidOperand { op: String, reason: String },

    #[error("Invalid literal for field {field:?}: {reason}")]
    InvalidLiteral { field: String, reason: String },

    #[error("Schema not registered: {0}")]
    UnknownSchema(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

impl OdmError {
    pub(crate) fn operand(op: &str, reason: impl Into<String>) -> Self {
        Self::InvalidOperand { op: op.to_string(), reason: reason.into() }
    }

    pub(crate) fn literal(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidLiteral { field: field.to_string(), reason: reason.into() }
    }
}
