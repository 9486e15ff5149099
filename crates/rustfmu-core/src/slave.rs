//! The contract a model author implements.
//!
//! A slave is a plain Rust struct deriving [`Reflect`](crate::Reflect) and implementing
//! [`Fmi2Slave`]. Only [`Fmi2Slave::do_step`] and the construction hooks are required;
//! every other lifecycle hook defaults to a no-op and FMU state capture defaults to a
//! snapshot of all registered variables.
//!
//! ```rust
//! use rustfmu_core::prelude::*;
//!
//! #[derive(Reflect)]
//! struct Counter {
//!     count: i32,
//! }
//!
//! impl Fmi2Slave for Counter {
//!     fn metadata() -> ModelMetadata {
//!         ModelMetadata::new("Counter")
//!     }
//!
//!     fn instantiate(_context: &InstanceContext) -> FmuResult<Self> {
//!         Ok(Counter { count: 1 })
//!     }
//!
//!     fn register_variables(&self, registrar: &mut Registrar<'_, Self>) -> FmuResult<()> {
//!         registrar.register(ScalarVariable::integer("count").with_causality(Causality::Output))?;
//!         Ok(())
//!     }
//!
//!     fn do_step(&mut self, _current_time: f64, _step_size: f64) -> FmuResult<bool> {
//!         self.count += 1;
//!         Ok(true)
//!     }
//! }
//! ```

use crate::binding::{BindingSpec, Getter, Setter};
use crate::errors::FmuResult;
use crate::logging::LogQueue;
use crate::model_description::ModelMetadata;
use crate::reflect::Reflect;
use crate::registry::VariableRegistry;
use crate::state::FmuState;
use crate::status::Fmi2Status;
use crate::value::ScalarValue;
use crate::variable::{ScalarVariable, ValueReference};
use std::path::PathBuf;
use std::sync::Arc;

/// Information handed to a slave when it is instantiated.
#[derive(Debug, Clone)]
pub struct InstanceContext {
    pub instance_name: String,
    /// Location of the unpacked `resources/` directory, if the master supplied one.
    pub resources: Option<PathBuf>,
    pub visible: bool,
    logger: LogQueue,
}

impl InstanceContext {
    pub fn new(instance_name: impl Into<String>, logger: LogQueue) -> Self {
        Self {
            instance_name: instance_name.into(),
            resources: None,
            visible: false,
            logger,
        }
    }

    pub fn with_resources(mut self, resources: impl Into<PathBuf>) -> Self {
        self.resources = Some(resources.into());
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Handle to the instance log, which slaves may keep for use during stepping.
    pub fn logger(&self) -> LogQueue {
        self.logger.clone()
    }

    pub fn log(&self, message: impl Into<String>, status: Fmi2Status, category: Option<&str>) {
        self.logger.log(message, status, category);
    }
}

/// Registers the variables of one slave instance.
pub struct Registrar<'a, S> {
    slave: &'a S,
    registry: &'a mut VariableRegistry<S>,
}

impl<'a, S: Reflect> Registrar<'a, S> {
    pub fn new(slave: &'a S, registry: &'a mut VariableRegistry<S>) -> Self {
        Self { slave, registry }
    }

    /// Register a variable bound by name; `.` in the name walks nested owners.
    pub fn register(&mut self, variable: ScalarVariable) -> FmuResult<ValueReference> {
        self.register_with(variable, BindingSpec::Auto)
    }

    /// Register a variable whose name is a single field, even if it contains `.`.
    pub fn register_flat(&mut self, variable: ScalarVariable) -> FmuResult<ValueReference> {
        self.register_with(variable, BindingSpec::Flat)
    }

    pub fn register_with(
        &mut self,
        variable: ScalarVariable,
        spec: BindingSpec<S>,
    ) -> FmuResult<ValueReference> {
        self.registry.register_with(self.slave, variable, spec)
    }

    /// Register a computed variable. Without a setter the variable is read-only.
    pub fn register_custom<G>(
        &mut self,
        variable: ScalarVariable,
        getter: G,
        setter: Option<Setter<S>>,
    ) -> FmuResult<ValueReference>
    where
        G: Fn(&S) -> FmuResult<ScalarValue> + Send + Sync + 'static,
    {
        let getter: Getter<S> = Arc::new(getter);
        self.register_with(variable, BindingSpec::Custom { getter, setter })
    }
}

/// An FMI 2.0 Co-Simulation slave.
pub trait Fmi2Slave: Reflect + Sized + 'static {
    /// Model-level metadata.
    ///
    /// Called again for every new instance, so it should be cheap and return the same
    /// metadata each time. Only the GUID derived from it is cached per slave type.
    fn metadata() -> ModelMetadata;

    /// Construct a fresh slave. Also used to rebuild the slave on reset.
    fn instantiate(context: &InstanceContext) -> FmuResult<Self>;

    /// Register every variable, in value-reference order.
    fn register_variables(&self, registrar: &mut Registrar<'_, Self>) -> FmuResult<()>;

    fn setup_experiment(
        &mut self,
        _start_time: f64,
        _stop_time: Option<f64>,
        _tolerance: Option<f64>,
    ) -> FmuResult<()> {
        Ok(())
    }

    fn enter_initialization_mode(&mut self) -> FmuResult<()> {
        Ok(())
    }

    fn exit_initialization_mode(&mut self) -> FmuResult<()> {
        Ok(())
    }

    /// Advance from `current_time` by `step_size`.
    ///
    /// `Ok(false)` reports a recoverable failure (`fmi2Discard`); the master may retry with
    /// a smaller step. An `Err` is reported with its own status.
    fn do_step(&mut self, current_time: f64, step_size: f64) -> FmuResult<bool>;

    /// Called before the instance is rebuilt by `fmi2Reset`.
    fn reset(&mut self) -> FmuResult<()> {
        Ok(())
    }

    fn terminate(&mut self) -> FmuResult<()> {
        Ok(())
    }

    /// Capture the FMU state. Defaults to the value of every registered variable.
    fn get_fmu_state(&self, registry: &VariableRegistry<Self>) -> FmuResult<FmuState> {
        registry.snapshot(self)
    }

    /// Restore a state captured by [`Fmi2Slave::get_fmu_state`].
    fn set_fmu_state(
        &mut self,
        registry: &VariableRegistry<Self>,
        state: &FmuState,
    ) -> FmuResult<()> {
        registry.restore(self, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FmuError;
    use crate::variable::Variability;
    use crate::Reflect;

    #[derive(Reflect)]
    struct Thermometer {
        celsius: f64,
        #[reflect(skip)]
        #[allow(dead_code)]
        readings: Vec<f64>,
    }

    #[test]
    fn test_registrar_binds_against_slave() {
        let slave = Thermometer {
            celsius: 20.0,
            readings: Vec::new(),
        };
        let mut registry = VariableRegistry::new();
        let mut registrar = Registrar::new(&slave, &mut registry);

        assert_eq!(registrar.register(ScalarVariable::real("celsius")).unwrap(), 0);
        let fahrenheit = registrar
            .register_custom(
                ScalarVariable::real("fahrenheit"),
                |s: &Thermometer| Ok(ScalarValue::Real(s.celsius * 9.0 / 5.0 + 32.0)),
                None,
            )
            .unwrap();
        assert_eq!(fahrenheit, 1);
        assert!(matches!(
            registrar.register(ScalarVariable::real("readings")),
            Err(FmuError::UnresolvedPath { .. })
        ));
        assert!(matches!(
            registrar.register_flat(
                ScalarVariable::integer("celsius").with_variability(Variability::Constant)
            ),
            Err(FmuError::DuplicateVariable(_))
        ));

        assert_eq!(registry.get_real(&slave, &[1]).unwrap(), vec![68.0]);
    }

    #[test]
    fn test_context_logger_is_shared() {
        let queue = LogQueue::default();
        let context = InstanceContext::new("instance", queue.clone()).with_visible(true);
        context.log("hello", Fmi2Status::Ok, Some("logAll"));
        context.logger().log("again", Fmi2Status::Warning, None);

        let messages = queue.drain();
        assert_eq!(messages.len(), 2);
        // An empty category table falls back to logAll
        assert_eq!(messages[1].category, "logAll");
    }
}
