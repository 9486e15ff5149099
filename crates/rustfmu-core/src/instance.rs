//! A running slave instance.
//!
//! [`SlaveInstance`] owns one slave, its variable registry and its log, and enforces the
//! FMI2 Co-Simulation call sequence:
//!
//! ```text
//! Constructed -> ExperimentSetup -> Initializing -> Initialized -> Stepping -> Terminated
//! ```
//!
//! `fmi2SetupExperiment` may be skipped. `reset` returns to `Constructed` from any state
//! except `Failed`, keeping variables registered through
//! [`SlaveInstance::register_variable`]. A fatal error from any slave hook moves the instance to `Failed`, after
//! which only teardown is possible.

use crate::binding::BindingSpec;
use crate::errors::{FmuError, FmuResult};
use crate::logging::LogQueue;
use crate::model_description::{
    cached_guid, derive_guid, CapabilityOverrides, ModelDescriptionBuilder, ModelMetadata,
};
use crate::registry::VariableRegistry;
use crate::slave::{Fmi2Slave, InstanceContext, Registrar};
use crate::state::FmuState;
use crate::status::Fmi2Status;
use crate::variable::{ScalarVariable, ValueReference};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    Constructed,
    ExperimentSetup,
    Initializing,
    Initialized,
    Stepping,
    Terminated,
    Failed,
}

impl LifecycleState {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleState::Constructed => "constructed",
            LifecycleState::ExperimentSetup => "experimentSetup",
            LifecycleState::Initializing => "initializing",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Stepping => "stepping",
            LifecycleState::Terminated => "terminated",
            LifecycleState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Result of a communication step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    /// The slave rejected the step; maps to `fmi2Discard`.
    Discarded,
}

impl StepOutcome {
    pub fn status(&self) -> Fmi2Status {
        match self {
            StepOutcome::Completed => Fmi2Status::Ok,
            StepOutcome::Discarded => Fmi2Status::Discard,
        }
    }
}

pub struct SlaveInstance<S: Fmi2Slave> {
    context: InstanceContext,
    metadata: ModelMetadata,
    slave: S,
    registry: VariableRegistry<S>,
    /// Variables registered after instantiation, replayed when the slave is rebuilt.
    extra_variables: Vec<(ScalarVariable, BindingSpec<S>)>,
    state: LifecycleState,
    start_time: f64,
    last_successful_time: f64,
}

impl<S: Fmi2Slave> std::fmt::Debug for SlaveInstance<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlaveInstance")
            .field("instance_name", &self.context.instance_name)
            .field("model_name", &self.metadata.model_name)
            .field("state", &self.state)
            .field("variables", &self.registry.len())
            .finish()
    }
}

/// Instantiate a slave and register its variables, applying declared start values.
fn build_slave<S: Fmi2Slave>(context: &InstanceContext) -> FmuResult<(S, VariableRegistry<S>)> {
    let mut slave = S::instantiate(context)?;
    let mut registry = VariableRegistry::new();
    {
        let mut registrar = Registrar::new(&slave, &mut registry);
        slave.register_variables(&mut registrar)?;
    }
    registry.apply_declared_starts(&mut slave)?;
    Ok((slave, registry))
}

impl<S: Fmi2Slave> SlaveInstance<S> {
    /// Instantiate a new slave.
    ///
    /// The log queue is created from the declared log categories of `S`; use
    /// [`SlaveInstance::with_context`] to supply a context directly.
    pub fn new(instance_name: impl Into<String>) -> FmuResult<Self> {
        let metadata = S::metadata();
        let context = InstanceContext::new(
            instance_name,
            LogQueue::new(metadata.log_categories.clone()),
        );
        Self::with_metadata(context, metadata)
    }

    pub fn with_context(context: InstanceContext) -> FmuResult<Self> {
        Self::with_metadata(context, S::metadata())
    }

    /// Instantiate with metadata other than `S::metadata()`, e.g. after applying a
    /// [`DescriptionConfig`](crate::config::DescriptionConfig).
    pub fn with_metadata(context: InstanceContext, metadata: ModelMetadata) -> FmuResult<Self> {
        metadata.validate()?;
        let (slave, registry) = build_slave::<S>(&context)?;
        debug!(
            instance = %context.instance_name,
            model = %metadata.model_name,
            variables = registry.len(),
            "Instantiated slave"
        );
        Ok(Self {
            context,
            metadata,
            slave,
            registry,
            extra_variables: Vec::new(),
            state: LifecycleState::Constructed,
            start_time: 0.0,
            last_successful_time: 0.0,
        })
    }

    pub fn instance_name(&self) -> &str {
        &self.context.instance_name
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn slave(&self) -> &S {
        &self.slave
    }

    pub fn registry(&self) -> &VariableRegistry<S> {
        &self.registry
    }

    pub fn logger(&self) -> LogQueue {
        self.context.logger()
    }

    /// Start time passed to `setup_experiment`, 0 if it was skipped.
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// End time of the last completed step (or the start time before the first step).
    pub fn last_successful_time(&self) -> f64 {
        self.last_successful_time
    }

    /// GUID of the model: the declared one, or one derived from the model name and the
    /// variables and cached for the slave type.
    pub fn guid(&self) -> String {
        match &self.metadata.guid {
            Some(guid) => guid.clone(),
            None => cached_guid::<S>(|| {
                derive_guid(&self.metadata.model_name, self.registry.variables())
            }),
        }
    }

    /// Render `modelDescription.xml` for this model.
    pub fn to_model_description(&mut self, overrides: &CapabilityOverrides) -> FmuResult<String> {
        let guid = self.guid();
        ModelDescriptionBuilder::new(&self.metadata)
            .with_guid(guid)
            .with_capabilities(overrides)
            .build(&mut self.registry, &self.slave)
    }

    /// Register an additional variable on this instance.
    ///
    /// The registration survives [`SlaveInstance::reset`]: it is replayed, in the same
    /// order, after the slave's own variables.
    pub fn register_variable(
        &mut self,
        variable: ScalarVariable,
        spec: BindingSpec<S>,
    ) -> FmuResult<ValueReference> {
        let value_reference = Self::register_extra(
            &mut self.slave,
            &mut self.registry,
            variable.clone(),
            spec.clone(),
        )?;
        self.extra_variables.push((variable, spec));
        Ok(value_reference)
    }

    fn register_extra(
        slave: &mut S,
        registry: &mut VariableRegistry<S>,
        variable: ScalarVariable,
        spec: BindingSpec<S>,
    ) -> FmuResult<ValueReference> {
        let value_reference = registry.register_with(slave, variable, spec)?;
        registry.apply_declared_start(slave, value_reference)?;
        Ok(value_reference)
    }

    /// Instantiate a fresh slave and register its own variables, then the extra ones.
    fn rebuild(&self) -> FmuResult<(S, VariableRegistry<S>)> {
        let (mut slave, mut registry) = build_slave::<S>(&self.context)?;
        for (variable, spec) in &self.extra_variables {
            Self::register_extra(&mut slave, &mut registry, variable.clone(), spec.clone())?;
        }
        Ok((slave, registry))
    }

    fn expect_state(
        &self,
        operation: &'static str,
        allowed: &[LifecycleState],
    ) -> FmuResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(FmuError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn reject_failed(&self, operation: &'static str) -> FmuResult<()> {
        if self.state == LifecycleState::Failed {
            Err(FmuError::InvalidState {
                operation,
                state: self.state,
            })
        } else {
            Ok(())
        }
    }

    /// Move to `Failed` if `result` carries a fatal error.
    fn track<T>(&mut self, result: FmuResult<T>) -> FmuResult<T> {
        if let Err(err) = &result {
            if err.is_fatal() {
                error!(instance = %self.context.instance_name, %err, "Slave failed");
                self.state = LifecycleState::Failed;
            }
        }
        result
    }

    /// Mark the instance as failed after the slave panicked.
    pub(crate) fn fail(&mut self) {
        self.state = LifecycleState::Failed;
    }

    pub fn setup_experiment(
        &mut self,
        start_time: f64,
        stop_time: Option<f64>,
        tolerance: Option<f64>,
    ) -> FmuResult<()> {
        self.expect_state("setupExperiment", &[LifecycleState::Constructed])?;
        let result = self.slave.setup_experiment(start_time, stop_time, tolerance);
        self.track(result)?;
        self.start_time = start_time;
        self.last_successful_time = start_time;
        self.state = LifecycleState::ExperimentSetup;
        Ok(())
    }

    pub fn enter_initialization_mode(&mut self) -> FmuResult<()> {
        self.expect_state(
            "enterInitializationMode",
            &[LifecycleState::Constructed, LifecycleState::ExperimentSetup],
        )?;
        let result = self.slave.enter_initialization_mode();
        self.track(result)?;
        self.state = LifecycleState::Initializing;
        Ok(())
    }

    pub fn exit_initialization_mode(&mut self) -> FmuResult<()> {
        self.expect_state("exitInitializationMode", &[LifecycleState::Initializing])?;
        let result = self.slave.exit_initialization_mode();
        self.track(result)?;
        self.state = LifecycleState::Initialized;
        Ok(())
    }

    pub fn do_step(&mut self, current_time: f64, step_size: f64) -> FmuResult<StepOutcome> {
        self.expect_state(
            "doStep",
            &[LifecycleState::Initialized, LifecycleState::Stepping],
        )?;
        self.state = LifecycleState::Stepping;
        let result = self.slave.do_step(current_time, step_size);
        match self.track(result)? {
            true => {
                self.last_successful_time = current_time + step_size;
                Ok(StepOutcome::Completed)
            }
            false => {
                debug!(
                    instance = %self.context.instance_name,
                    current_time,
                    step_size,
                    "Step discarded"
                );
                Ok(StepOutcome::Discarded)
            }
        }
    }

    /// Reset the instance to its freshly instantiated state.
    ///
    /// The slave's `reset` hook runs first, then the slave is rebuilt from scratch and its
    /// variables, including those added with [`SlaveInstance::register_variable`], are
    /// registered again with the same value references.
    pub fn reset(&mut self) -> FmuResult<()> {
        self.reject_failed("reset")?;
        let result = self.slave.reset();
        self.track(result)?;

        let rebuilt = self.rebuild();
        let (slave, registry) = self.track(rebuilt)?;
        self.slave = slave;
        self.registry = registry;
        self.state = LifecycleState::Constructed;
        self.start_time = 0.0;
        self.last_successful_time = 0.0;
        Ok(())
    }

    pub fn terminate(&mut self) -> FmuResult<()> {
        self.expect_state(
            "terminate",
            &[LifecycleState::Initialized, LifecycleState::Stepping],
        )?;
        let result = self.slave.terminate();
        self.track(result)?;
        self.state = LifecycleState::Terminated;
        Ok(())
    }

    fn check_writable_state(&self, operation: &'static str) -> FmuResult<()> {
        self.expect_state(
            operation,
            &[
                LifecycleState::Constructed,
                LifecycleState::ExperimentSetup,
                LifecycleState::Initializing,
                LifecycleState::Initialized,
                LifecycleState::Stepping,
            ],
        )
    }

    pub fn get_real(&self, references: &[ValueReference]) -> FmuResult<Vec<f64>> {
        self.reject_failed("getReal")?;
        self.registry.get_real(&self.slave, references)
    }

    pub fn get_integer(&self, references: &[ValueReference]) -> FmuResult<Vec<i32>> {
        self.reject_failed("getInteger")?;
        self.registry.get_integer(&self.slave, references)
    }

    pub fn get_boolean(&self, references: &[ValueReference]) -> FmuResult<Vec<bool>> {
        self.reject_failed("getBoolean")?;
        self.registry.get_boolean(&self.slave, references)
    }

    pub fn get_string(&self, references: &[ValueReference]) -> FmuResult<Vec<String>> {
        self.reject_failed("getString")?;
        self.registry.get_string(&self.slave, references)
    }

    pub fn set_real(&mut self, references: &[ValueReference], values: &[f64]) -> FmuResult<()> {
        self.check_writable_state("setReal")?;
        self.registry.set_real(&mut self.slave, references, values)
    }

    pub fn set_integer(&mut self, references: &[ValueReference], values: &[i32]) -> FmuResult<()> {
        self.check_writable_state("setInteger")?;
        self.registry.set_integer(&mut self.slave, references, values)
    }

    pub fn set_boolean(&mut self, references: &[ValueReference], values: &[bool]) -> FmuResult<()> {
        self.check_writable_state("setBoolean")?;
        self.registry.set_boolean(&mut self.slave, references, values)
    }

    pub fn set_string<T: AsRef<str>>(
        &mut self,
        references: &[ValueReference],
        values: &[T],
    ) -> FmuResult<()> {
        self.check_writable_state("setString")?;
        self.registry.set_string(&mut self.slave, references, values)
    }

    pub fn get_fmu_state(&mut self) -> FmuResult<FmuState> {
        self.reject_failed("getFMUstate")?;
        let result = self.slave.get_fmu_state(&self.registry);
        self.track(result)
    }

    pub fn set_fmu_state(&mut self, state: &FmuState) -> FmuResult<()> {
        self.reject_failed("setFMUstate")?;
        let result = self.slave.set_fmu_state(&self.registry, state);
        self.track(result)
    }

    pub fn state_to_bytes(&self, state: &FmuState) -> FmuResult<Vec<u8>> {
        state.to_bytes()
    }

    /// Decode a serialized state. The instance is not modified.
    pub fn state_from_bytes(&self, bytes: &[u8]) -> FmuResult<FmuState> {
        FmuState::from_bytes(bytes)
    }

    /// Queue a message for the master's logger.
    pub fn log(&self, message: impl Into<String>, status: Fmi2Status, category: Option<&str>) {
        self.context.log(message, status, category);
    }
}
