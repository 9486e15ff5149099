//! Per-instance variable registry.
//!
//! The registry owns value-reference assignment: the N-th registered variable receives
//! value reference N-1, so references are contiguous and follow registration order. Each
//! entry pairs a [`ScalarVariable`] with the [`Binding`] resolved for it.
//!
//! Batch get/set calls are type-checked up front: if any reference in the batch has the
//! wrong type (or, for set, no setter) the call fails before a single accessor runs, and the
//! error names the first offending position. Values are then checked against their fields.
//! A custom setter can still fail halfway through a batch; the values captured before the
//! first write are then put back.
//!
//! Every slave instance owns its own registry, so there is no shared counter between
//! instances.

use crate::binding::{Binding, BindingSpec};
use crate::errors::{FmuError, FmuResult};
use crate::reflect::Reflect;
use crate::state::FmuState;
use crate::value::{ScalarValue, VariableType};
use crate::variable::{ScalarVariable, ValueReference};
use indexmap::IndexMap;
use tracing::{debug, warn};

/// A registered variable and its storage binding.
#[derive(Debug)]
pub struct Entry<S> {
    variable: ScalarVariable,
    binding: Binding<S>,
}

impl<S> Entry<S> {
    pub fn variable(&self) -> &ScalarVariable {
        &self.variable
    }

    pub fn binding(&self) -> &Binding<S> {
        &self.binding
    }
}

/// Ordered mapping from value reference to variable.
///
/// Entries are keyed by name; the position of an entry in the map is its value reference.
#[derive(Debug)]
pub struct VariableRegistry<S> {
    entries: IndexMap<String, Entry<S>>,
}

impl<S> VariableRegistry<S> {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the variables in value-reference order.
    pub fn variables(&self) -> impl Iterator<Item = &ScalarVariable> {
        self.entries.values().map(|entry| &entry.variable)
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry<S>> {
        self.entries.values()
    }

    pub fn variable(&self, value_reference: ValueReference) -> Option<&ScalarVariable> {
        self.entry(value_reference).map(|entry| &entry.variable)
    }

    pub fn by_name(&self, name: &str) -> Option<&ScalarVariable> {
        self.entries.get(name).map(|entry| &entry.variable)
    }

    pub fn value_reference_of(&self, name: &str) -> Option<ValueReference> {
        self.entries
            .get_index_of(name)
            .map(|index| index as ValueReference)
    }

    /// Check if a variable is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    fn entry(&self, value_reference: ValueReference) -> Option<&Entry<S>> {
        self.entries
            .get_index(value_reference as usize)
            .map(|(_, entry)| entry)
    }

    fn lookup(&self, value_reference: ValueReference) -> FmuResult<&Entry<S>> {
        self.entry(value_reference)
            .ok_or(FmuError::UnknownValueReference(value_reference))
    }

    /// Resolve every reference of a batch, checking its type against `kind`.
    fn checked_batch(
        &self,
        kind: VariableType,
        references: &[ValueReference],
    ) -> FmuResult<Vec<&Entry<S>>> {
        references
            .iter()
            .enumerate()
            .map(|(index, vr)| {
                let entry = self.lookup(*vr)?;
                let actual = entry.variable.variable_type();
                if actual != kind {
                    return Err(FmuError::TypeMismatch {
                        index,
                        value_reference: *vr,
                        expected: kind,
                        actual,
                    });
                }
                Ok(entry)
            })
            .collect()
    }
}

impl<S> Default for VariableRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Reflect> VariableRegistry<S> {
    /// Register a variable whose binding has already been resolved.
    ///
    /// Assigns the next sequential value reference and returns it.
    ///
    /// # Errors
    ///
    /// Fails if a variable with the same name is already registered, or if the variable
    /// already carries a value reference.
    pub fn register(
        &mut self,
        mut variable: ScalarVariable,
        binding: Binding<S>,
    ) -> FmuResult<ValueReference> {
        if self.entries.contains_key(variable.name()) {
            return Err(FmuError::DuplicateVariable(variable.name().to_string()));
        }
        let value_reference = self.entries.len() as ValueReference;
        variable.set_value_reference(value_reference)?;

        debug!(
            variable = variable.name(),
            value_reference,
            variable_type = %variable.variable_type(),
            "Registered variable"
        );
        self.entries
            .insert(variable.name().to_string(), Entry { variable, binding });
        Ok(value_reference)
    }

    /// Resolve `spec` against `slave` and register the result.
    pub fn register_with(
        &mut self,
        slave: &S,
        variable: ScalarVariable,
        spec: BindingSpec<S>,
    ) -> FmuResult<ValueReference> {
        if self.entries.contains_key(variable.name()) {
            return Err(FmuError::DuplicateVariable(variable.name().to_string()));
        }
        let binding = Binding::resolve(slave, &variable, spec)?;
        self.register(variable, binding)
    }

    /// Read the values of `references`, which must all be of type `kind`.
    ///
    /// Values are returned in the order of `references`, converted to the native
    /// representation of `kind`.
    pub fn get(
        &self,
        slave: &S,
        kind: VariableType,
        references: &[ValueReference],
    ) -> FmuResult<Vec<ScalarValue>> {
        let entries = self.checked_batch(kind, references)?;
        entries
            .into_iter()
            .map(|entry| {
                entry
                    .binding
                    .get(slave)?
                    .coerce(kind, entry.variable.name())
            })
            .collect()
    }

    /// Write `values` to `references`, which must all be of type `kind` and writable.
    ///
    /// Types, setters and the conversion into each backing field are validated for the whole
    /// batch before the first setter runs. If a custom setter fails anyway, earlier writes
    /// of the batch are rolled back.
    pub fn set(
        &self,
        slave: &mut S,
        kind: VariableType,
        references: &[ValueReference],
        values: Vec<ScalarValue>,
    ) -> FmuResult<()> {
        if references.len() != values.len() {
            return Err(FmuError::LengthMismatch {
                references: references.len(),
                values: values.len(),
            });
        }
        let entries = self.checked_batch(kind, references)?;

        let mut writes = Vec::with_capacity(entries.len());
        for (entry, value) in entries.into_iter().zip(values) {
            if !entry.binding.is_writable() {
                return Err(FmuError::ReadOnly {
                    name: entry.variable.name().to_string(),
                    value_reference: entry.variable.value_reference().unwrap_or_default(),
                });
            }
            let value = value.coerce(kind, entry.variable.name())?;
            entry.binding.check(slave, &value)?;
            writes.push((Target::Binding(&entry.binding), value));
        }

        write_all(slave, writes)
    }

    pub fn get_real(&self, slave: &S, references: &[ValueReference]) -> FmuResult<Vec<f64>> {
        self.get(slave, VariableType::Real, references)
            .map(|values| values.iter().filter_map(ScalarValue::as_real).collect())
    }

    pub fn get_integer(&self, slave: &S, references: &[ValueReference]) -> FmuResult<Vec<i32>> {
        self.get(slave, VariableType::Integer, references)
            .map(|values| values.iter().filter_map(ScalarValue::as_integer).collect())
    }

    pub fn get_boolean(&self, slave: &S, references: &[ValueReference]) -> FmuResult<Vec<bool>> {
        self.get(slave, VariableType::Boolean, references)
            .map(|values| values.iter().filter_map(ScalarValue::as_boolean).collect())
    }

    pub fn get_string(&self, slave: &S, references: &[ValueReference]) -> FmuResult<Vec<String>> {
        self.get(slave, VariableType::String, references).map(|values| {
            values
                .into_iter()
                .filter_map(|value| match value {
                    ScalarValue::String(v) => Some(v),
                    _ => None,
                })
                .collect()
        })
    }

    pub fn set_real(
        &self,
        slave: &mut S,
        references: &[ValueReference],
        values: &[f64],
    ) -> FmuResult<()> {
        let values = values.iter().copied().map(ScalarValue::Real).collect();
        self.set(slave, VariableType::Real, references, values)
    }

    pub fn set_integer(
        &self,
        slave: &mut S,
        references: &[ValueReference],
        values: &[i32],
    ) -> FmuResult<()> {
        let values = values.iter().copied().map(ScalarValue::Integer).collect();
        self.set(slave, VariableType::Integer, references, values)
    }

    pub fn set_boolean(
        &self,
        slave: &mut S,
        references: &[ValueReference],
        values: &[bool],
    ) -> FmuResult<()> {
        let values = values.iter().copied().map(ScalarValue::Boolean).collect();
        self.set(slave, VariableType::Boolean, references, values)
    }

    pub fn set_string<T: AsRef<str>>(
        &self,
        slave: &mut S,
        references: &[ValueReference],
        values: &[T],
    ) -> FmuResult<()> {
        let values = values
            .iter()
            .map(|v| ScalarValue::String(v.as_ref().to_string()))
            .collect();
        self.set(slave, VariableType::String, references, values)
    }

    /// Resolve and cache missing start values from the live slave.
    ///
    /// Only variables that require a start value and have none are touched. Resolving
    /// twice is a no-op the second time.
    pub fn resolve_start_values(&mut self, slave: &S) -> FmuResult<()> {
        for entry in self.entries.values_mut() {
            let variable = &mut entry.variable;
            if !variable.requires_start() || variable.start().is_some() {
                continue;
            }
            let value = entry
                .binding
                .get(slave)
                .map_err(|_| FmuError::StartUnresolved(variable.name().to_string()))?;
            variable.cache_start(value)?;
        }
        Ok(())
    }

    /// Push declared start values into the slave.
    ///
    /// Variables without a setter keep their live value.
    pub fn apply_declared_starts(&self, slave: &mut S) -> FmuResult<()> {
        for entry in self.entries.values() {
            Self::apply_start(entry, slave)?;
        }
        Ok(())
    }

    /// Push the declared start value of one variable into the slave, if it has one.
    pub fn apply_declared_start(
        &self,
        slave: &mut S,
        value_reference: ValueReference,
    ) -> FmuResult<()> {
        Self::apply_start(self.lookup(value_reference)?, slave)
    }

    fn apply_start(entry: &Entry<S>, slave: &mut S) -> FmuResult<()> {
        if !entry.variable.has_declared_start() {
            return Ok(());
        }
        if let Some(start) = entry.variable.start() {
            entry.binding.set(slave, start)?;
        }
        Ok(())
    }

    /// Capture the current value of every variable, keyed by name.
    pub fn snapshot(&self, slave: &S) -> FmuResult<FmuState> {
        let mut state = FmuState::new();
        for entry in self.entries.values() {
            state.insert(entry.variable.name(), entry.binding.get(slave)?);
        }
        Ok(state)
    }

    /// Restore a snapshot produced by [`VariableRegistry::snapshot`].
    ///
    /// Names that belong to a registered variable go through its setter (read-only
    /// variables are skipped). Any other name is assigned directly to the slave field of
    /// that name, which lets slaves keep private bookkeeping in their state. The whole
    /// snapshot is checked against the slave's fields before anything is written, and a
    /// failing custom setter rolls back what was already restored.
    pub fn restore(&self, slave: &mut S, state: &FmuState) -> FmuResult<()> {
        let mut writes = Vec::with_capacity(state.len());
        for (name, value) in state.iter() {
            match self.entries.get(name) {
                Some(entry) if entry.binding.is_writable() => {
                    let value = value
                        .clone()
                        .coerce(entry.variable.variable_type(), name)?;
                    entry.binding.check(slave, &value)?;
                    writes.push((Target::Binding(&entry.binding), value));
                }
                Some(_) => {}
                None => {
                    let field =
                        slave
                            .field_index(name)
                            .ok_or_else(|| FmuError::UnresolvedPath {
                                name: name.to_string(),
                                segment: name.to_string(),
                            })?;
                    slave.check_field(field, value)?;
                    writes.push((Target::Field(name, field), value.clone()));
                }
            }
        }

        write_all(slave, writes)
    }
}

/// Where a validated value goes.
enum Target<'a, S> {
    Binding(&'a Binding<S>),
    /// A slave field outside the registry, with the name it was found under.
    Field(&'a str, usize),
}

impl<S: Reflect> Target<'_, S> {
    fn read(&self, slave: &S) -> FmuResult<ScalarValue> {
        match self {
            Target::Binding(binding) => binding.get(slave),
            Target::Field(name, field) => slave
                .get_field(*field)
                .ok_or_else(|| crate::reflect::missing_field(name, *field)),
        }
    }

    fn write(&self, slave: &mut S, value: ScalarValue) -> FmuResult<()> {
        match self {
            Target::Binding(binding) => binding.set(slave, value).map(|_| ()),
            Target::Field(_, field) => slave.set_field(*field, value),
        }
    }
}

/// Apply `writes` in order, or none of them.
///
/// The current value of every target is captured first. When a write fails, the targets
/// already written get their captured values back, last write first.
fn write_all<S: Reflect>(
    slave: &mut S,
    writes: Vec<(Target<'_, S>, ScalarValue)>,
) -> FmuResult<()> {
    let (targets, values): (Vec<_>, Vec<_>) = writes.into_iter().unzip();
    let previous = targets
        .iter()
        .map(|target| target.read(slave))
        .collect::<FmuResult<Vec<_>>>()?;

    for (applied, (target, value)) in targets.iter().zip(values).enumerate() {
        if let Err(err) = target.write(slave, value) {
            for (target, old) in targets[..applied].iter().zip(&previous).rev() {
                if let Err(rollback) = target.write(slave, old.clone()) {
                    warn!(error = %rollback, "Could not roll back a partially applied write");
                }
            }
            return Err(err);
        }
    }
    Ok(())
}
