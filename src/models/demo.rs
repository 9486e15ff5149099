use rustfmu_core::prelude::*;

/// First-order low-pass filter applied to `realIn`.
#[derive(Debug, Clone, Reflect)]
pub struct Filter {
    /// Smoothing factor in `[0, 1]`
    pub alpha: f64,
    pub value: f64,
}

/// Registers one variable of every type with the usual causalities.
///
/// `realOut` tracks the end of the last step. `filter.*` variables live in a nested owner
/// and `realInPercent` is a computed view of `realIn`.
#[derive(Debug, Reflect)]
pub struct DemoSlave {
    #[reflect(rename = "intParam")]
    pub int_param: i32,
    #[reflect(rename = "realIn")]
    pub real_in: f64,
    #[reflect(rename = "booleanParameter")]
    pub boolean_parameter: bool,
    #[reflect(rename = "stringParameter")]
    pub string_parameter: String,
    #[reflect(rename = "intOut")]
    pub int_out: i32,
    #[reflect(rename = "realOut")]
    pub real_out: f64,
    #[reflect(rename = "booleanVariable")]
    pub boolean_variable: bool,
    #[reflect(rename = "stringVariable")]
    pub string_variable: String,
    #[reflect(nested)]
    pub filter: Filter,
}

impl Fmi2Slave for DemoSlave {
    fn metadata() -> ModelMetadata {
        ModelMetadata::new("DemoSlave")
            .with_author("John Doe")
            .with_description("A simple description")
    }

    fn instantiate(_context: &InstanceContext) -> FmuResult<Self> {
        Ok(DemoSlave {
            int_param: 42,
            real_in: 2.0 / 3.0,
            boolean_parameter: false,
            string_parameter: "dog".to_string(),
            int_out: 23,
            real_out: 3.0,
            boolean_variable: true,
            string_variable: "Hello World!".to_string(),
            filter: Filter {
                alpha: 0.5,
                value: 0.0,
            },
        })
    }

    fn register_variables(&self, registrar: &mut Registrar<'_, Self>) -> FmuResult<()> {
        registrar.register(
            ScalarVariable::integer("intParam")
                .with_causality(Causality::Parameter)
                .with_variability(Variability::Tunable),
        )?;
        registrar.register(ScalarVariable::real("realIn").with_causality(Causality::Input))?;
        registrar.register(
            ScalarVariable::boolean("booleanParameter")
                .with_causality(Causality::Parameter)
                .with_variability(Variability::Tunable),
        )?;
        registrar.register(
            ScalarVariable::string("stringParameter")
                .with_causality(Causality::Parameter)
                .with_variability(Variability::Tunable),
        )?;
        registrar.register(ScalarVariable::integer("intOut").with_causality(Causality::Output))?;
        registrar.register(ScalarVariable::real("realOut").with_causality(Causality::Output))?;
        registrar.register(
            ScalarVariable::boolean("booleanVariable").with_causality(Causality::Local),
        )?;
        registrar.register(
            ScalarVariable::string("stringVariable").with_causality(Causality::Local),
        )?;

        registrar.register(
            ScalarVariable::real("filter.alpha")
                .with_causality(Causality::Parameter)
                .with_variability(Variability::Fixed)
                .with_description("Smoothing factor of the input filter"),
        )?;
        registrar.register(
            ScalarVariable::real("filter.value")
                .with_causality(Causality::Output)
                .with_description("Filtered realIn"),
        )?;
        // Read-only so that restoring a state never writes realIn through the scaled view
        registrar.register_custom(
            ScalarVariable::real("realInPercent")
                .with_causality(Causality::Output)
                .with_description("realIn scaled by 100"),
            |slave: &DemoSlave| Ok(ScalarValue::Real(slave.real_in * 100.0)),
            None,
        )?;
        Ok(())
    }

    fn do_step(&mut self, current_time: f64, step_size: f64) -> FmuResult<bool> {
        self.real_out = current_time + step_size;
        self.filter.value += self.filter.alpha * (self.real_in - self.filter.value);
        Ok(true)
    }
}
