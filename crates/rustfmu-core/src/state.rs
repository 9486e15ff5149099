//! FMU runtime state snapshots.
//!
//! A snapshot is a mapping from variable (or field) name to its value at the time of
//! capture, in registration order. It serialises to a self-describing JSON object so that
//! `fmi2SerializeFMUstate` can hand the master an opaque byte blob and
//! `fmi2DeSerializeFMUstate` can restore it.
//!
//! ```rust
//! use rustfmu_core::state::FmuState;
//! use rustfmu_core::value::ScalarValue;
//!
//! let mut state = FmuState::new();
//! state.insert("count", ScalarValue::Integer(4));
//! state.insert("label", ScalarValue::from("dog"));
//!
//! let bytes = state.to_bytes().unwrap();
//! assert_eq!(FmuState::from_bytes(&bytes).unwrap(), state);
//! ```

use crate::errors::FmuResult;
use crate::value::ScalarValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FmuState {
    values: IndexMap<String, ScalarValue>,
}

impl FmuState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ScalarValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ScalarValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ScalarValue)> {
        self.values.iter()
    }

    /// Serialise the snapshot to bytes.
    pub fn to_bytes(&self) -> FmuResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a snapshot produced by [`FmuState::to_bytes`].
    ///
    /// Values decode to their natural JSON type (a whole-number real comes back as an
    /// integer); restoring through the registry converts them back to the declared type.
    /// Non-finite reals keep their tagged encoding and come back as reals.
    pub fn from_bytes(bytes: &[u8]) -> FmuResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl FromIterator<(String, ScalarValue)> for FmuState {
    fn from_iter<T: IntoIterator<Item = (String, ScalarValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
