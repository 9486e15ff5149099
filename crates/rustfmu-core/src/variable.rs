//! FMI2 scalar variable definitions.
//!
//! A [`ScalarVariable`] describes one variable of a slave: its name, FMI2 metadata
//! (causality, variability, initial), an optional description and a start value typed by
//! its [`VariableKind`]. Variables know nothing about where their value is stored; the
//! [`VariableRegistry`](crate::registry::VariableRegistry) pairs each one with a
//! [`Binding`](crate::binding::Binding).
//!
//! # Example
//!
//! ```rust
//! use rustfmu_core::variable::{Causality, ScalarVariable, Variability};
//!
//! let gain = ScalarVariable::real("gain")
//!     .with_causality(Causality::Parameter)
//!     .with_variability(Variability::Tunable)
//!     .with_description("Amplification factor")
//!     .with_start(2.5)
//!     .unwrap();
//!
//! assert!(gain.requires_start());
//! assert_eq!(gain.value_reference(), None);
//! ```

use crate::errors::{FmuError, FmuResult};
use crate::value::{ScalarValue, VariableType};
use serde::{Deserialize, Serialize};

/// Stable numeric identifier of a variable, `fmi2ValueReference` on the C side.
pub type ValueReference = u32;

/// Separator between owner segments in a structured variable name.
pub const PATH_SEPARATOR: char = '.';

/// Role of a variable in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Causality {
    Parameter,
    CalculatedParameter,
    Input,
    Output,
    Local,
}

impl Causality {
    pub fn name(&self) -> &'static str {
        match self {
            Causality::Parameter => "parameter",
            Causality::CalculatedParameter => "calculatedParameter",
            Causality::Input => "input",
            Causality::Output => "output",
            Causality::Local => "local",
        }
    }
}

/// How often a variable may change value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Variability {
    Constant,
    Fixed,
    Tunable,
    Discrete,
    Continuous,
}

impl Variability {
    pub fn name(&self) -> &'static str {
        match self {
            Variability::Constant => "constant",
            Variability::Fixed => "fixed",
            Variability::Tunable => "tunable",
            Variability::Discrete => "discrete",
            Variability::Continuous => "continuous",
        }
    }
}

/// How the start value of a variable is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Initial {
    Exact,
    Approx,
    Calculated,
}

impl Initial {
    pub fn name(&self) -> &'static str {
        match self {
            Initial::Exact => "exact",
            Initial::Approx => "approx",
            Initial::Calculated => "calculated",
        }
    }
}

macro_rules! impl_display_by_name {
    ($($ty:ty),*) => {
        $(
            impl std::fmt::Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.name())
                }
            }
        )*
    };
}

impl_display_by_name!(Causality, Variability, Initial);

/// Type of a variable together with its type-specific start value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VariableKind {
    Real { start: Option<f64> },
    Integer { start: Option<i32> },
    Boolean { start: Option<bool> },
    String { start: Option<String> },
}

impl VariableKind {
    pub fn variable_type(&self) -> VariableType {
        match self {
            VariableKind::Real { .. } => VariableType::Real,
            VariableKind::Integer { .. } => VariableType::Integer,
            VariableKind::Boolean { .. } => VariableType::Boolean,
            VariableKind::String { .. } => VariableType::String,
        }
    }

    pub fn start(&self) -> Option<ScalarValue> {
        match self {
            VariableKind::Real { start } => start.map(ScalarValue::Real),
            VariableKind::Integer { start } => start.map(ScalarValue::Integer),
            VariableKind::Boolean { start } => start.map(ScalarValue::Boolean),
            VariableKind::String { start } => start.clone().map(ScalarValue::String),
        }
    }

    fn set_start(&mut self, value: ScalarValue, name: &str) -> FmuResult<()> {
        let value = value.coerce(self.variable_type(), name)?;
        match (self, value) {
            (VariableKind::Real { start }, ScalarValue::Real(v)) => *start = Some(v),
            (VariableKind::Integer { start }, ScalarValue::Integer(v)) => *start = Some(v),
            (VariableKind::Boolean { start }, ScalarValue::Boolean(v)) => *start = Some(v),
            (VariableKind::String { start }, ScalarValue::String(v)) => *start = Some(v),
            (kind, value) => {
                return Err(FmuError::ValueConversion {
                    name: name.to_string(),
                    expected: kind.variable_type(),
                    found: format!("{:?}", value),
                })
            }
        }
        Ok(())
    }
}

/// Definition of one FMI2 scalar variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarVariable {
    name: String,
    value_reference: Option<ValueReference>,
    causality: Option<Causality>,
    variability: Option<Variability>,
    initial: Option<Initial>,
    description: Option<String>,
    kind: VariableKind,
    /// Whether `start` was supplied by the model author rather than read back from the
    /// live value while building the model description.
    #[serde(default)]
    declared_start: bool,
}

impl ScalarVariable {
    pub fn new(name: impl Into<String>, kind: VariableKind) -> Self {
        let declared_start = kind.start().is_some();
        Self {
            name: name.into(),
            value_reference: None,
            causality: None,
            variability: None,
            initial: None,
            description: None,
            kind,
            declared_start,
        }
    }

    pub fn real(name: impl Into<String>) -> Self {
        Self::new(name, VariableKind::Real { start: None })
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, VariableKind::Integer { start: None })
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, VariableKind::Boolean { start: None })
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, VariableKind::String { start: None })
    }

    /// Create an untyped-start variable of the given type.
    pub fn of_type(name: impl Into<String>, variable_type: VariableType) -> Self {
        let kind = match variable_type {
            VariableType::Real => VariableKind::Real { start: None },
            VariableType::Integer => VariableKind::Integer { start: None },
            VariableType::Boolean => VariableKind::Boolean { start: None },
            VariableType::String => VariableKind::String { start: None },
        };
        Self::new(name, kind)
    }

    pub fn with_causality(mut self, causality: Causality) -> Self {
        self.causality = Some(causality);
        self
    }

    pub fn with_variability(mut self, variability: Variability) -> Self {
        self.variability = Some(variability);
        self
    }

    pub fn with_initial(mut self, initial: Initial) -> Self {
        self.initial = Some(initial);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare a start value. Fails if the value cannot be converted to the variable's type.
    pub fn with_start(mut self, start: impl Into<ScalarValue>) -> FmuResult<Self> {
        self.kind.set_start(start.into(), &self.name)?;
        self.declared_start = true;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last segment of a structured name (`container.gain` -> `gain`).
    pub fn local_name(&self) -> &str {
        self.name
            .rsplit(PATH_SEPARATOR)
            .next()
            .unwrap_or(self.name.as_str())
    }

    pub fn value_reference(&self) -> Option<ValueReference> {
        self.value_reference
    }

    /// Assign the value reference.
    ///
    /// A value reference may only be assigned once; a second assignment is a configuration
    /// error.
    pub fn set_value_reference(&mut self, value_reference: ValueReference) -> FmuResult<()> {
        if let Some(existing) = self.value_reference {
            return Err(FmuError::ValueReferenceAlreadySet {
                name: self.name.clone(),
                existing,
            });
        }
        self.value_reference = Some(value_reference);
        Ok(())
    }

    pub fn causality(&self) -> Option<Causality> {
        self.causality
    }

    pub fn variability(&self) -> Option<Variability> {
        self.variability
    }

    pub fn initial(&self) -> Option<Initial> {
        self.initial
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn kind(&self) -> &VariableKind {
        &self.kind
    }

    pub fn variable_type(&self) -> VariableType {
        self.kind.variable_type()
    }

    pub fn start(&self) -> Option<ScalarValue> {
        self.kind.start()
    }

    /// True when the author declared the start value explicitly.
    pub fn has_declared_start(&self) -> bool {
        self.declared_start
    }

    /// Cache a start value resolved from the live slave.
    ///
    /// Unlike [`ScalarVariable::with_start`] this does not mark the start as declared, so
    /// it is never pushed back into the slave.
    pub(crate) fn cache_start(&mut self, value: ScalarValue) -> FmuResult<()> {
        self.kind.set_start(value, &self.name)
    }

    pub fn is_constant(&self) -> bool {
        self.variability == Some(Variability::Constant)
    }

    /// Whether FMI2 requires a `start` attribute for this variable.
    ///
    /// This is the case when `initial` is exact or approx, the causality is input or
    /// parameter, or the variable is constant.
    pub fn requires_start(&self) -> bool {
        matches!(self.initial, Some(Initial::Exact) | Some(Initial::Approx))
            || matches!(
                self.causality,
                Some(Causality::Input) | Some(Causality::Parameter)
            )
            || self.is_constant()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_reference_set_once_only() {
        let mut v = ScalarVariable::real("variable");
        v.set_value_reference(22).unwrap();

        let result = v.set_value_reference(33);
        assert!(matches!(
            result,
            Err(FmuError::ValueReferenceAlreadySet { existing: 22, .. })
        ));
        assert_eq!(v.value_reference(), Some(22));
    }

    #[test]
    fn test_requires_start() {
        assert!(!ScalarVariable::real("a").requires_start());
        assert!(!ScalarVariable::real("a")
            .with_causality(Causality::Output)
            .requires_start());
        assert!(ScalarVariable::real("a")
            .with_causality(Causality::Input)
            .requires_start());
        assert!(ScalarVariable::real("a")
            .with_causality(Causality::Parameter)
            .requires_start());
        assert!(ScalarVariable::real("a")
            .with_initial(Initial::Approx)
            .requires_start());
        assert!(ScalarVariable::integer("a")
            .with_variability(Variability::Constant)
            .requires_start());
        assert!(!ScalarVariable::integer("a")
            .with_initial(Initial::Calculated)
            .requires_start());
    }

    #[test]
    fn test_with_start_is_typed() {
        let v = ScalarVariable::integer("count").with_start(3).unwrap();
        assert_eq!(v.kind(), &VariableKind::Integer { start: Some(3) });
        assert!(v.has_declared_start());

        let widened = ScalarVariable::real("x").with_start(3).unwrap();
        assert_eq!(widened.start(), Some(ScalarValue::Real(3.0)));

        assert!(ScalarVariable::string("s").with_start(1.5).is_err());
    }

    #[test]
    fn test_local_name() {
        assert_eq!(ScalarVariable::real("container.gain").local_name(), "gain");
        assert_eq!(ScalarVariable::real("a.b.c").local_name(), "c");
        assert_eq!(ScalarVariable::real("plain").local_name(), "plain");
    }

    #[test]
    fn test_enum_names() {
        assert_eq!(
            Causality::CalculatedParameter.to_string(),
            "calculatedParameter"
        );
        assert_eq!(Variability::Tunable.to_string(), "tunable");
        assert_eq!(Initial::Exact.to_string(), "exact");
        assert_eq!(
            serde_json::to_string(&Causality::CalculatedParameter).unwrap(),
            "\"calculatedParameter\""
        );
    }
}
