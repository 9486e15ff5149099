use rustfmu_core::logging::LogQueue;
use rustfmu_core::prelude::*;

/// Counts communication steps.
///
/// `count` starts at 1 and is incremented by `increment` on every step.
#[derive(Debug, Reflect)]
pub struct Counter {
    pub count: i32,
    pub increment: i32,
    #[reflect(skip)]
    logger: LogQueue,
}

impl Fmi2Slave for Counter {
    fn metadata() -> ModelMetadata {
        ModelMetadata::new("Counter")
            .with_description("Counts communication steps")
            .with_default_experiment(DefaultExperiment {
                start_time: Some(0.0),
                stop_time: Some(10.0),
                tolerance: None,
                step_size: Some(0.1),
            })
    }

    fn instantiate(context: &InstanceContext) -> FmuResult<Self> {
        Ok(Counter {
            count: 1,
            increment: 1,
            logger: context.logger(),
        })
    }

    fn register_variables(&self, registrar: &mut Registrar<'_, Self>) -> FmuResult<()> {
        registrar.register(
            ScalarVariable::integer("count")
                .with_causality(Causality::Output)
                .with_description("Number of steps taken, plus one"),
        )?;
        registrar.register(
            ScalarVariable::integer("increment")
                .with_causality(Causality::Parameter)
                .with_variability(Variability::Tunable)
                .with_start(1)?,
        )?;
        Ok(())
    }

    fn do_step(&mut self, _current_time: f64, _step_size: f64) -> FmuResult<bool> {
        self.count = self
            .count
            .checked_add(self.increment)
            .ok_or_else(|| FmuError::Error("count overflowed".to_string()))?;
        Ok(true)
    }

    fn terminate(&mut self) -> FmuResult<()> {
        self.logger.log(
            format!("Terminated with count={}", self.count),
            Fmi2Status::Ok,
            None,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfmu_core::instance::LifecycleState;

    fn initialized() -> SlaveInstance<Counter> {
        let mut instance = SlaveInstance::<Counter>::new("counter").unwrap();
        instance.setup_experiment(0.0, None, None).unwrap();
        instance.enter_initialization_mode().unwrap();
        instance.exit_initialization_mode().unwrap();
        instance
    }

    #[test]
    fn test_counts_steps() {
        let mut instance = initialized();
        for i in 0..3 {
            instance.do_step(i as f64 * 0.1, 0.1).unwrap();
        }
        assert_eq!(instance.get_integer(&[0]).unwrap(), vec![4]);
    }

    #[test]
    fn test_increment_is_tunable() {
        let mut instance = initialized();
        instance.set_integer(&[1], &[10]).unwrap();
        instance.do_step(0.0, 0.1).unwrap();
        assert_eq!(instance.slave().count, 11);
    }

    #[test]
    fn test_overflow_is_an_error() {
        let mut instance = initialized();
        instance.set_integer(&[1], &[i32::MAX]).unwrap();
        assert!(instance.do_step(0.0, 0.1).is_err());
        assert_eq!(instance.state(), LifecycleState::Stepping);
    }

    #[test]
    fn test_terminate_logs_count() {
        let mut instance = initialized();
        instance.do_step(0.0, 0.1).unwrap();
        instance.terminate().unwrap();

        let messages = instance.logger().drain();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message, "Terminated with count=2");
        assert_eq!(messages[0].category, "logAll");
    }
}
