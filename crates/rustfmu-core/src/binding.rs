//! Binding resolution: connecting a variable to its backing storage.
//!
//! When a variable is registered, the resolver turns its name (or a caller-supplied pair of
//! closures) into an [`Accessor`]. Name resolution happens exactly once:
//!
//! - `gain` binds directly to field `gain` of the slave ([`Accessor::Direct`])
//! - `container.gain` walks owner `container` and binds to its field `gain`
//!   ([`Accessor::Nested`])
//! - custom getter/setter closures bypass traversal entirely ([`Accessor::Custom`])
//!
//! The resolved accessor holds positions and closures only, so a get/set at runtime is a
//! table lookup.
//!
//! A [`Binding`] never gets a setter when the variable is constant, and a field binding is
//! only accepted when the field's type matches the declared type of the variable.

use crate::errors::{FmuError, FmuResult};
use crate::reflect::{walk, walk_mut, Reflect};
use crate::value::{ScalarValue, VariableType};
use crate::variable::{ScalarVariable, PATH_SEPARATOR};
use std::sync::Arc;
use tracing::warn;

/// Caller-supplied getter.
pub type Getter<S> = Arc<dyn Fn(&S) -> FmuResult<ScalarValue> + Send + Sync>;

/// Caller-supplied setter.
pub type Setter<S> = Arc<dyn Fn(&mut S, ScalarValue) -> FmuResult<()> + Send + Sync>;

/// How the resolver should find the storage of a variable.
pub enum BindingSpec<S> {
    /// Resolve by name; `.` separates nested owners.
    Auto,
    /// Resolve by name without nesting; the whole name is one field.
    Flat,
    /// Use the supplied accessors as-is.
    Custom {
        getter: Getter<S>,
        setter: Option<Setter<S>>,
    },
}

impl<S> Clone for BindingSpec<S> {
    fn clone(&self) -> Self {
        match self {
            BindingSpec::Auto => BindingSpec::Auto,
            BindingSpec::Flat => BindingSpec::Flat,
            BindingSpec::Custom { getter, setter } => BindingSpec::Custom {
                getter: Arc::clone(getter),
                setter: setter.clone(),
            },
        }
    }
}

impl<S> BindingSpec<S> {
    /// Custom read-only accessor.
    pub fn getter<G>(getter: G) -> Self
    where
        G: Fn(&S) -> FmuResult<ScalarValue> + Send + Sync + 'static,
    {
        BindingSpec::Custom {
            getter: Arc::new(getter),
            setter: None,
        }
    }

    /// Custom read/write accessor pair.
    pub fn accessors<G, T>(getter: G, setter: T) -> Self
    where
        G: Fn(&S) -> FmuResult<ScalarValue> + Send + Sync + 'static,
        T: Fn(&mut S, ScalarValue) -> FmuResult<()> + Send + Sync + 'static,
    {
        BindingSpec::Custom {
            getter: Arc::new(getter),
            setter: Some(Arc::new(setter)),
        }
    }
}

/// A resolved storage location.
pub enum Accessor<S> {
    /// A field of the slave itself.
    Direct { field: usize },
    /// A field of an owner reached through `owners` (outermost first).
    Nested { owners: Vec<usize>, field: usize },
    /// Caller-supplied accessors.
    Custom {
        getter: Getter<S>,
        setter: Option<Setter<S>>,
    },
}

impl<S> std::fmt::Debug for Accessor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Accessor::Direct { field } => f.debug_struct("Direct").field("field", field).finish(),
            Accessor::Nested { owners, field } => f
                .debug_struct("Nested")
                .field("owners", owners)
                .field("field", field)
                .finish(),
            Accessor::Custom { setter, .. } => f
                .debug_struct("Custom")
                .field("writable", &setter.is_some())
                .finish(),
        }
    }
}

/// The resolved getter/setter pair for one registered variable.
#[derive(Debug)]
pub struct Binding<S> {
    name: String,
    accessor: Accessor<S>,
    writable: bool,
}

impl<S: Reflect> Binding<S> {
    /// Resolve `spec` for `variable` against a live `slave`.
    ///
    /// Fails with [`FmuError::UnresolvedPath`] if an owner segment or the leaf field does
    /// not exist, and with [`FmuError::FieldTypeMismatch`] if the field is not of the
    /// declared type.
    pub fn resolve(slave: &S, variable: &ScalarVariable, spec: BindingSpec<S>) -> FmuResult<Self> {
        let name = variable.name().to_string();
        let constant = variable.is_constant();

        let (accessor, writable) = match spec {
            BindingSpec::Custom { getter, setter } => {
                let setter = if constant && setter.is_some() {
                    warn!(variable = %name, "Ignoring setter supplied for a constant variable");
                    None
                } else {
                    setter
                };
                let writable = setter.is_some();
                (Accessor::Custom { getter, setter }, writable)
            }
            BindingSpec::Flat => {
                let field = slave
                    .field_index(&name)
                    .ok_or_else(|| FmuError::UnresolvedPath {
                        name: name.clone(),
                        segment: name.clone(),
                    })?;
                check_field_type(slave, field, variable)?;
                (Accessor::Direct { field }, !constant)
            }
            BindingSpec::Auto => {
                let (path, leaf): (Vec<&str>, &str) = match name.rsplit_once(PATH_SEPARATOR) {
                    Some((path, leaf)) => (path.split(PATH_SEPARATOR).collect(), leaf),
                    None => (Vec::new(), name.as_str()),
                };

                let mut owners = Vec::with_capacity(path.len());
                let mut owner: &dyn Reflect = slave;
                for segment in &path {
                    let index =
                        owner
                            .owner_index(segment)
                            .ok_or_else(|| FmuError::UnresolvedPath {
                                name: name.clone(),
                                segment: segment.to_string(),
                            })?;
                    owner = owner.owner(index).ok_or_else(|| FmuError::UnresolvedPath {
                        name: name.clone(),
                        segment: segment.to_string(),
                    })?;
                    owners.push(index);
                }

                let field = owner
                    .field_index(leaf)
                    .ok_or_else(|| FmuError::UnresolvedPath {
                        name: name.clone(),
                        segment: leaf.to_string(),
                    })?;
                check_field_type(owner, field, variable)?;

                let accessor = if owners.is_empty() {
                    Accessor::Direct { field }
                } else {
                    Accessor::Nested { owners, field }
                };
                (accessor, !constant)
            }
        };

        Ok(Self {
            name,
            accessor,
            writable,
        })
    }

    pub fn accessor(&self) -> &Accessor<S> {
        &self.accessor
    }

    /// Whether a setter exists for this binding.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Read the current value from `slave`.
    pub fn get(&self, slave: &S) -> FmuResult<ScalarValue> {
        match &self.accessor {
            Accessor::Direct { field } => slave
                .get_field(*field)
                .ok_or_else(|| crate::reflect::missing_field(&self.name, *field)),
            Accessor::Nested { owners, field } => walk(slave, owners)
                .and_then(|owner| owner.get_field(*field))
                .ok_or_else(|| crate::reflect::missing_field(&self.name, *field)),
            Accessor::Custom { getter, .. } => getter(slave),
        }
    }

    /// Check that [`Binding::set`] would accept `value`, without writing it.
    ///
    /// Field bindings run the field's own conversion. Custom setters cannot be checked
    /// ahead of time and always pass.
    pub fn check(&self, slave: &S, value: &ScalarValue) -> FmuResult<()> {
        match &self.accessor {
            Accessor::Direct { field } => slave.check_field(*field, value),
            Accessor::Nested { owners, field } => walk(slave, owners)
                .ok_or_else(|| crate::reflect::missing_field(&self.name, *field))?
                .check_field(*field, value),
            Accessor::Custom { .. } => Ok(()),
        }
    }

    /// Write `value` into `slave`.
    ///
    /// Returns `Ok(false)` without touching the slave if the binding has no setter.
    pub fn set(&self, slave: &mut S, value: ScalarValue) -> FmuResult<bool> {
        if !self.writable {
            return Ok(false);
        }
        match &self.accessor {
            Accessor::Direct { field } => slave.set_field(*field, value)?,
            Accessor::Nested { owners, field } => walk_mut(slave, owners)
                .ok_or_else(|| crate::reflect::missing_field(&self.name, *field))?
                .set_field(*field, value)?,
            Accessor::Custom { setter, .. } => match setter {
                Some(setter) => setter(slave, value)?,
                None => return Ok(false),
            },
        }
        Ok(true)
    }
}

fn check_field_type(
    owner: &dyn Reflect,
    field: usize,
    variable: &ScalarVariable,
) -> FmuResult<()> {
    let declared: VariableType = variable.variable_type();
    match owner.field_type(field) {
        Some(actual) if actual != declared => Err(FmuError::FieldTypeMismatch {
            name: variable.name().to_string(),
            declared,
            field: actual,
        }),
        _ => Ok(()),
    }
}
