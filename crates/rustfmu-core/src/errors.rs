use crate::instance::LifecycleState;
use crate::status::Fmi2Status;
use crate::value::VariableType;
use crate::variable::ValueReference;
use thiserror::Error;

/// Error type for invalid operations.
///
/// Configuration errors are raised while registering variables or building the model
/// description, validation errors are raised by batch get/set calls, and [`FmuError::Fatal`]
/// is the separate channel for unrecoverable slave failures.
#[derive(Error, Debug)]
pub enum FmuError {
    #[error("{0}")]
    Error(String),
    #[error("Variable '{0}' is already registered")]
    DuplicateVariable(String),
    #[error("Value reference of variable '{name}' is already set to {existing}")]
    ValueReferenceAlreadySet {
        name: String,
        existing: ValueReference,
    },
    #[error("A model name is required")]
    MissingModelName,
    #[error("Cannot bind variable '{name}': '{segment}' does not resolve on its owner")]
    UnresolvedPath { name: String, segment: String },
    #[error("Variable '{name}' is declared {declared} but its field is {field}")]
    FieldTypeMismatch {
        name: String,
        declared: VariableType,
        field: VariableType,
    },
    #[error("No variable with valueReference={0}")]
    UnknownValueReference(ValueReference),
    #[error("Variable with valueReference={value_reference} (index {index}) is not of type {expected}, it is {actual}")]
    TypeMismatch {
        index: usize,
        value_reference: ValueReference,
        expected: VariableType,
        actual: VariableType,
    },
    #[error("Variable '{name}' (valueReference={value_reference}) is read-only")]
    ReadOnly {
        name: String,
        value_reference: ValueReference,
    },
    #[error("Got {values} values for {references} value references")]
    LengthMismatch { references: usize, values: usize },
    #[error("Cannot convert {found} to {expected} for '{name}'")]
    ValueConversion {
        name: String,
        expected: VariableType,
        found: String,
    },
    #[error("Unable to resolve a start value for variable '{0}'")]
    StartUnresolved(String),
    #[error("'{operation}' is not allowed while the instance is {state}")]
    InvalidState {
        operation: &'static str,
        state: LifecycleState,
    },
    #[error("Malformed FMU state: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
    #[error("Failed to write model description: {0}")]
    Xml(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Fatal: {0}")]
    Fatal(String),
}

impl FmuError {
    /// The FMI2 status reported to the master when this error reaches the ABI boundary.
    pub fn status(&self) -> Fmi2Status {
        match self {
            FmuError::Fatal(_) => Fmi2Status::Fatal,
            _ => Fmi2Status::Error,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, FmuError::Fatal(_))
    }
}

impl From<quick_xml::Error> for FmuError {
    fn from(value: quick_xml::Error) -> Self {
        FmuError::Xml(value.to_string())
    }
}

/// Convenience type for `Result<T, FmuError>`.
pub type FmuResult<T> = Result<T, FmuError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(FmuError::Fatal("boom".into()).status(), Fmi2Status::Fatal);
        assert_eq!(
            FmuError::DuplicateVariable("x".into()).status(),
            Fmi2Status::Error
        );
        assert_eq!(
            FmuError::ReadOnly {
                name: "x".into(),
                value_reference: 0
            }
            .status(),
            Fmi2Status::Error
        );
    }

    #[test]
    fn test_type_mismatch_message_names_reference() {
        let err = FmuError::TypeMismatch {
            index: 1,
            value_reference: 7,
            expected: VariableType::Integer,
            actual: VariableType::Real,
        };
        let msg = err.to_string();
        assert!(msg.contains("valueReference=7"));
        assert!(msg.contains("Integer"));
    }
}
