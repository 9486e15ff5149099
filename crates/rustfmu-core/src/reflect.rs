//! Index-addressed access to the fields of a slave.
//!
//! The binding resolver needs to turn a variable name such as `container.gain` into
//! something that can read and write the backing storage without runtime string lookups.
//! [`Reflect`] exposes a struct as two small tables: scalar fields and nested owners, both
//! addressed by position. Names are only consulted once, at registration time.
//!
//! The trait is normally derived:
//!
//! ```rust
//! use rustfmu_core::Reflect;
//! use rustfmu_core::reflect::Reflect as _;
//!
//! #[derive(Default, Reflect)]
//! struct Amplifier {
//!     gain: f64,
//!     enabled: bool,
//! }
//!
//! #[derive(Default, Reflect)]
//! struct Model {
//!     count: i32,
//!     #[reflect(nested)]
//!     amplifier: Amplifier,
//!     #[reflect(skip)]
//!     history: Vec<f64>,
//! }
//!
//! let model = Model::default();
//! assert_eq!(model.field_index("count"), Some(0));
//! assert!(model.owner_index("amplifier").is_some());
//! assert_eq!(model.field_index("history"), None);
//! ```

use crate::errors::{FmuError, FmuResult};
use crate::value::{ScalarValue, VariableType};

/// Positional access to the scalar fields and nested owners of a value.
pub trait Reflect {
    /// Position of the scalar field called `name`, if any.
    fn field_index(&self, name: &str) -> Option<usize>;

    /// Current value of the field at `index`.
    fn get_field(&self, index: usize) -> Option<ScalarValue>;

    /// Overwrite the field at `index`, converting `value` to the field's type.
    fn set_field(&mut self, index: usize, value: ScalarValue) -> FmuResult<()>;

    /// FMI2 type the field at `index` is exposed as.
    ///
    /// `None` means the type is unknown and is not checked when binding.
    fn field_type(&self, _index: usize) -> Option<VariableType> {
        None
    }

    /// Check that `set_field(index, value)` would succeed, without writing anything.
    ///
    /// The default only checks that the field exists; the derive also runs the conversion.
    fn check_field(&self, index: usize, _value: &ScalarValue) -> FmuResult<()> {
        match self.get_field(index) {
            Some(_) => Ok(()),
            None => Err(missing_field("field", index)),
        }
    }

    /// Names of all scalar fields, in index order.
    fn field_names(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// Position of the nested owner called `name`, if any.
    fn owner_index(&self, _name: &str) -> Option<usize> {
        None
    }

    fn owner(&self, _index: usize) -> Option<&dyn Reflect> {
        None
    }

    fn owner_mut(&mut self, _index: usize) -> Option<&mut dyn Reflect> {
        None
    }
}

/// Follow a chain of owner indices starting at `root`.
pub(crate) fn walk<'a>(root: &'a dyn Reflect, owners: &[usize]) -> Option<&'a dyn Reflect> {
    owners
        .iter()
        .try_fold(root, |current, index| current.owner(*index))
}

/// Mutable counterpart of [`walk`].
pub(crate) fn walk_mut<'a>(
    root: &'a mut dyn Reflect,
    owners: &[usize],
) -> Option<&'a mut dyn Reflect> {
    let mut current = root;
    for index in owners {
        current = current.owner_mut(*index)?;
    }
    Some(current)
}

/// Error for a field index that the owner does not know about.
#[doc(hidden)]
pub fn missing_field(name: &str, index: usize) -> FmuError {
    FmuError::UnresolvedPath {
        name: name.to_string(),
        segment: format!("#{}", index),
    }
}
