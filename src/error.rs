//! The single error type shared by every phase of pipeline construction.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    // =========================================================================
    // === Configuration errors (bad parse, out-of-range, wrong variant)
    // =========================================================================
    #[error("Unable to parse '{value}' for parameter '{name}' as {expected}")]
    Parse {
        name: String,
        value: String,
        expected: String,
    },

    #[error("Value out of range for '{name}': {value} is not within [{min}, {max}]")]
    Range {
        name: String,
        value: String,
        min: String,
        max: String,
    },

    #[error("Parameter '{name}' expects a {expected} value, got {found}")]
    TypeMismatch {
        name: String,
        expected: String,
        found: String,
    },

    /// Unknown registry name, parameter name, port name or enum key.
    #[error("{what} not found: {key}")]
    Lookup { what: String, key: String },

    // =========================================================================
    // === Lifecycle errors
    // =========================================================================
    #[error("Cannot {operation} in phase {phase}")]
    Sequence { operation: String, phase: String },

    #[error("Internal contract violated: {0}")]
    InternalContract(String),

    // =========================================================================
    // === Port shape errors
    // =========================================================================
    #[error("Port '{port}' expects {expected}, got {found}")]
    KindMismatch {
        port: String,
        expected: String,
        found: String,
    },

    #[error("Port '{port}' expects {expected} entries, got {found}")]
    ArityMismatch {
        port: String,
        expected: usize,
        found: usize,
    },

    #[error("Output '{0}' has not been populated yet")]
    NotYetBound(String),

    // =========================================================================
    // === Naming and registry errors
    // =========================================================================
    #[error("Invalid name '{0}': names must match [A-Za-z][A-Za-z0-9_]* and may not contain \"__\"")]
    InvalidName(String),

    #[error("Duplicate {what}: {name}")]
    Duplicate { what: String, name: String },

    // =========================================================================
    // === Graph errors
    // =========================================================================
    #[error("Invalid graph definition: {0}")]
    Definition(String),

    #[error("Realization failed: {0}")]
    Realize(String),

    /// An error raised by user-supplied build or schedule code.
    #[error("Pipeline body failed: {0}")]
    Body(anyhow::Error),
}

impl PipelineError {
    pub(crate) fn lookup(what: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Lookup {
            what: what.into(),
            key: key.into(),
        }
    }

    pub(crate) fn sequence(operation: impl Into<String>, phase: impl ToString) -> Self {
        Self::Sequence {
            operation: operation.into(),
            phase: phase.to_string(),
        }
    }

    /// Parse, range, type and unknown-name failures raised while configuring.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. } | Self::Range { .. } | Self::TypeMismatch { .. } | Self::Lookup { .. }
        )
    }

    pub fn is_sequence_error(&self) -> bool {
        matches!(self, Self::Sequence { .. })
    }

    /// Recovers a framework error that travelled through user code as `anyhow::Error`.
    pub(crate) fn from_body(err: anyhow::Error) -> Self {
        match err.downcast::<PipelineError>() {
            Ok(inner) => inner,
            Err(other) => Self::Body(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framework_error_survives_anyhow_round_trip() {
        let original = PipelineError::NotYetBound("f".to_string());
        let wrapped: anyhow::Error = original.into();

        let recovered = PipelineError::from_body(wrapped);
        assert!(matches!(recovered, PipelineError::NotYetBound(ref name) if name == "f"));
    }

    #[test]
    fn test_foreign_error_becomes_body() {
        let recovered = PipelineError::from_body(anyhow::anyhow!("user failure"));
        assert!(matches!(recovered, PipelineError::Body(_)));
        assert!(recovered.to_string().contains("user failure"));
    }

    #[test]
    fn test_configuration_classification() {
        let err = PipelineError::lookup("Parameter", "nope");
        assert!(err.is_configuration_error());
        assert!(!err.is_sequence_error());

        let err = PipelineError::sequence("schedule", "Constructed");
        assert!(err.is_sequence_error());
    }
}
