//! Scalar values exchanged with the master simulator.
//!
//! FMI2 knows four scalar types. [`ScalarValue`] carries one value of any of them and is the
//! currency of the accessor table: getters produce it, setters consume it, and FMU state
//! snapshots store it. [`FieldValue`] connects plain Rust field types to it.

use crate::errors::{FmuError, FmuResult};
use serde::{Deserialize, Serialize};

/// The four FMI2 scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableType {
    Real,
    Integer,
    Boolean,
    String,
}

impl VariableType {
    /// Element name of the type-specific child of `ScalarVariable`.
    pub fn element_name(&self) -> &'static str {
        match self {
            VariableType::Real => "Real",
            VariableType::Integer => "Integer",
            VariableType::Boolean => "Boolean",
            VariableType::String => "String",
        }
    }
}

impl std::fmt::Display for VariableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.element_name())
    }
}

/// A single typed value.
///
/// Serialises untagged so that an FMU state snapshot is a plain JSON object of
/// `name -> value`. On the way back in, numbers without a fractional part come back as
/// [`ScalarValue::Integer`]; [`ScalarValue::coerce`] restores the declared type.
///
/// JSON has no literal for NaN or the infinities, so non-finite reals are written as
/// `{"real": "NaN"}`, `{"real": "inf"}` or `{"real": "-inf"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Encoded", into = "Encoded")]
pub enum ScalarValue {
    Boolean(bool),
    Integer(i32),
    Real(f64),
    String(String),
}

/// Wire form of [`ScalarValue`].
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum Encoded {
    Boolean(bool),
    Integer(i32),
    Real(f64),
    String(String),
    NonFinite { real: NonFinite },
}

#[derive(Serialize, Deserialize)]
enum NonFinite {
    #[serde(rename = "NaN")]
    NaN,
    #[serde(rename = "inf")]
    Infinity,
    #[serde(rename = "-inf")]
    NegInfinity,
}

impl From<ScalarValue> for Encoded {
    fn from(value: ScalarValue) -> Self {
        match value {
            ScalarValue::Boolean(v) => Encoded::Boolean(v),
            ScalarValue::Integer(v) => Encoded::Integer(v),
            ScalarValue::Real(v) if v.is_nan() => Encoded::NonFinite {
                real: NonFinite::NaN,
            },
            ScalarValue::Real(v) if v.is_infinite() => Encoded::NonFinite {
                real: if v > 0.0 {
                    NonFinite::Infinity
                } else {
                    NonFinite::NegInfinity
                },
            },
            ScalarValue::Real(v) => Encoded::Real(v),
            ScalarValue::String(v) => Encoded::String(v),
        }
    }
}

impl From<Encoded> for ScalarValue {
    fn from(value: Encoded) -> Self {
        match value {
            Encoded::Boolean(v) => ScalarValue::Boolean(v),
            Encoded::Integer(v) => ScalarValue::Integer(v),
            Encoded::Real(v) => ScalarValue::Real(v),
            Encoded::String(v) => ScalarValue::String(v),
            Encoded::NonFinite { real } => ScalarValue::Real(match real {
                NonFinite::NaN => f64::NAN,
                NonFinite::Infinity => f64::INFINITY,
                NonFinite::NegInfinity => f64::NEG_INFINITY,
            }),
        }
    }
}

impl ScalarValue {
    pub fn variable_type(&self) -> VariableType {
        match self {
            ScalarValue::Real(_) => VariableType::Real,
            ScalarValue::Integer(_) => VariableType::Integer,
            ScalarValue::Boolean(_) => VariableType::Boolean,
            ScalarValue::String(_) => VariableType::String,
        }
    }

    /// Convert to the representation of `target`.
    ///
    /// Numeric values widen and narrow between Real, Integer and Boolean (Reals narrow by
    /// truncation and must fit into an `i32`). Strings never convert.
    pub fn coerce(self, target: VariableType, name: &str) -> FmuResult<ScalarValue> {
        let fail = |value: &ScalarValue| FmuError::ValueConversion {
            name: name.to_string(),
            expected: target,
            found: format!("{:?}", value),
        };
        let converted = match (target, &self) {
            (VariableType::Real, ScalarValue::Real(_))
            | (VariableType::Integer, ScalarValue::Integer(_))
            | (VariableType::Boolean, ScalarValue::Boolean(_))
            | (VariableType::String, ScalarValue::String(_)) => return Ok(self),
            (VariableType::Real, ScalarValue::Integer(v)) => ScalarValue::Real(*v as f64),
            (VariableType::Real, ScalarValue::Boolean(v)) => {
                ScalarValue::Real(if *v { 1.0 } else { 0.0 })
            }
            (VariableType::Integer, ScalarValue::Real(v)) => {
                let truncated = v.trunc();
                if !truncated.is_finite()
                    || truncated < i32::MIN as f64
                    || truncated > i32::MAX as f64
                {
                    return Err(fail(&self));
                }
                ScalarValue::Integer(truncated as i32)
            }
            (VariableType::Integer, ScalarValue::Boolean(v)) => ScalarValue::Integer(*v as i32),
            (VariableType::Boolean, ScalarValue::Integer(v)) => ScalarValue::Boolean(*v != 0),
            (VariableType::Boolean, ScalarValue::Real(v)) => ScalarValue::Boolean(*v != 0.0),
            _ => return Err(fail(&self)),
        };
        Ok(converted)
    }

    /// Render the value for a `start` attribute.
    ///
    /// Reals use the shortest round-trip representation and always carry a decimal point
    /// or exponent. Non-finite reals use the `xs:double` spellings `NaN`, `INF` and `-INF`.
    /// Booleans are lowercase.
    pub fn render(&self) -> String {
        match self {
            ScalarValue::Real(v) if v.is_nan() => "NaN".to_string(),
            ScalarValue::Real(v) if v.is_infinite() => {
                if *v > 0.0 { "INF" } else { "-INF" }.to_string()
            }
            ScalarValue::Real(v) => format!("{:?}", v),
            ScalarValue::Integer(v) => v.to_string(),
            ScalarValue::Boolean(v) => v.to_string(),
            ScalarValue::String(v) => v.clone(),
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            ScalarValue::Real(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i32> {
        match self {
            ScalarValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            ScalarValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Real(value)
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        ScalarValue::Integer(value)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Boolean(value)
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::String(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::String(value.to_string())
    }
}

/// A Rust field type that can back an FMI2 variable.
///
/// Implemented for the primitive types that map losslessly onto one of the four FMI2
/// scalar types. `#[derive(Reflect)]` requires every exposed field to implement it.
pub trait FieldValue: Sized {
    /// The FMI2 type this field is exposed as.
    const TYPE: VariableType;

    fn to_scalar(&self) -> ScalarValue;

    fn from_scalar(value: ScalarValue, name: &str) -> FmuResult<Self>;
}

macro_rules! impl_field_value {
    ($ty:ty, $variant:ident, $inner:ty) => {
        impl FieldValue for $ty {
            const TYPE: VariableType = VariableType::$variant;

            fn to_scalar(&self) -> ScalarValue {
                ScalarValue::$variant(<$inner>::from(*self))
            }

            fn from_scalar(value: ScalarValue, name: &str) -> FmuResult<Self> {
                match value.coerce(Self::TYPE, name)? {
                    ScalarValue::$variant(v) => {
                        <$ty>::try_from(v).map_err(|_| FmuError::ValueConversion {
                            name: name.to_string(),
                            expected: Self::TYPE,
                            found: format!("{} (out of range for {})", v, stringify!($ty)),
                        })
                    }
                    other => Err(FmuError::ValueConversion {
                        name: name.to_string(),
                        expected: Self::TYPE,
                        found: format!("{:?}", other),
                    }),
                }
            }
        }
    };
}

impl_field_value!(i32, Integer, i32);
impl_field_value!(i16, Integer, i32);
impl_field_value!(i8, Integer, i32);
impl_field_value!(u16, Integer, i32);
impl_field_value!(u8, Integer, i32);
impl_field_value!(bool, Boolean, bool);

impl FieldValue for f64 {
    const TYPE: VariableType = VariableType::Real;

    fn to_scalar(&self) -> ScalarValue {
        ScalarValue::Real(*self)
    }

    fn from_scalar(value: ScalarValue, name: &str) -> FmuResult<Self> {
        match value.coerce(Self::TYPE, name)? {
            ScalarValue::Real(v) => Ok(v),
            other => Err(FmuError::ValueConversion {
                name: name.to_string(),
                expected: Self::TYPE,
                found: format!("{:?}", other),
            }),
        }
    }
}

impl FieldValue for f32 {
    const TYPE: VariableType = VariableType::Real;

    fn to_scalar(&self) -> ScalarValue {
        ScalarValue::Real(f64::from(*self))
    }

    fn from_scalar(value: ScalarValue, name: &str) -> FmuResult<Self> {
        f64::from_scalar(value, name).map(|v| v as f32)
    }
}

impl FieldValue for String {
    const TYPE: VariableType = VariableType::String;

    fn to_scalar(&self) -> ScalarValue {
        ScalarValue::String(self.clone())
    }

    fn from_scalar(value: ScalarValue, name: &str) -> FmuResult<Self> {
        match value {
            ScalarValue::String(v) => Ok(v),
            other => Err(FmuError::ValueConversion {
                name: name.to_string(),
                expected: Self::TYPE,
                found: format!("{:?}", other),
            }),
        }
    }
}
