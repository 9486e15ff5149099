//! The object behind an `fmi2Component` handle.

use crate::errors::FmuResult;
use crate::ffi::types::Fmi2CallbackFunctions;
use crate::instance::SlaveInstance;
use crate::logging::{LogMessage, LoggerSettings};
use crate::slave::Fmi2Slave;
use crate::status::Fmi2Status;
use std::ffi::{CStr, CString};

/// Convert to a C string, replacing interior NULs.
pub(crate) fn to_c_string(value: &str) -> CString {
    CString::new(value.replace('\0', " ")).unwrap_or_default()
}

/// Send one message to the master's logger callback, if it installed one.
///
/// The message is passed as an argument to a `%s` format so that `%` in the text is not
/// interpreted by the master.
pub(crate) fn emit(
    callbacks: &Fmi2CallbackFunctions,
    instance_name: &CStr,
    status: Fmi2Status,
    category: &str,
    message: &str,
) {
    if let Some(logger) = callbacks.logger {
        let category = to_c_string(category);
        let message = to_c_string(message);
        // SAFETY: the master guarantees the callback stays valid for the lifetime of the
        // instance; all pointers outlive the call.
        unsafe {
            logger(
                callbacks.component_environment,
                instance_name.as_ptr(),
                status,
                category.as_ptr(),
                c"%s".as_ptr(),
                message.as_ptr(),
            );
        }
    }
}

/// One instantiated FMU: the slave instance plus everything the C side needs.
pub struct Component<S: Fmi2Slave> {
    instance: SlaveInstance<S>,
    instance_name: CString,
    callbacks: Fmi2CallbackFunctions,
    settings: LoggerSettings,
    /// Backing storage for the last `fmi2GetString` result.
    strings: Vec<CString>,
}

impl<S: Fmi2Slave> Component<S> {
    pub fn new(
        instance: SlaveInstance<S>,
        callbacks: Fmi2CallbackFunctions,
        logging_on: bool,
    ) -> Self {
        let instance_name = to_c_string(instance.instance_name());
        Self {
            instance,
            instance_name,
            callbacks,
            settings: LoggerSettings::new(logging_on),
            strings: Vec::new(),
        }
    }

    pub fn instance(&self) -> &SlaveInstance<S> {
        &self.instance
    }

    pub fn instance_mut(&mut self) -> &mut SlaveInstance<S> {
        &mut self.instance
    }

    pub fn settings(&self) -> &LoggerSettings {
        &self.settings
    }

    pub fn set_debug_logging(&mut self, enabled: bool, categories: Vec<String>) {
        self.settings.configure(enabled, categories);
    }

    /// Turn the result of an operation into the status returned to the master.
    ///
    /// Errors are logged with their own status before the log is flushed.
    pub fn report(&mut self, result: FmuResult<Fmi2Status>) -> Fmi2Status {
        let status = match result {
            Ok(status) => status,
            Err(err) => {
                let status = err.status();
                self.instance.log(err.to_string(), status, None);
                status
            }
        };
        self.flush_log();
        status
    }

    /// Record a panic that escaped the slave. The instance cannot be used afterwards.
    pub fn fail(&mut self, message: &str) -> Fmi2Status {
        self.instance.fail();
        self.instance
            .log(format!("Slave panicked: {}", message), Fmi2Status::Fatal, None);
        self.flush_log();
        Fmi2Status::Fatal
    }

    /// Forward queued messages admitted by the logger settings; drop the rest.
    pub fn flush_log(&self) -> Vec<LogMessage> {
        let messages = self.instance.logger().drain();
        let mut delivered = Vec::new();
        for message in messages {
            if self.settings.admits(&message) {
                emit(
                    &self.callbacks,
                    &self.instance_name,
                    message.status,
                    &message.category,
                    &message.message,
                );
                delivered.push(message);
            }
        }
        delivered
    }

    /// Keep `values` alive until the next call and return their C pointers.
    pub fn hold_strings(&mut self, values: Vec<String>) -> Vec<*const std::os::raw::c_char> {
        self.strings = values.iter().map(|v| to_c_string(v)).collect();
        self.strings.iter().map(|s| s.as_ptr()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FmuError;
    use crate::model_description::ModelMetadata;
    use crate::slave::{InstanceContext, Registrar};
    use crate::variable::ScalarVariable;
    use crate::Reflect;

    #[derive(Reflect)]
    struct Quiet {
        value: f64,
    }

    impl Fmi2Slave for Quiet {
        fn metadata() -> ModelMetadata {
            ModelMetadata::new("Quiet")
        }

        fn instantiate(_context: &InstanceContext) -> FmuResult<Self> {
            Ok(Quiet { value: 0.0 })
        }

        fn register_variables(&self, registrar: &mut Registrar<'_, Self>) -> FmuResult<()> {
            registrar.register(ScalarVariable::real("value"))?;
            Ok(())
        }

        fn do_step(&mut self, _current_time: f64, _step_size: f64) -> FmuResult<bool> {
            Ok(true)
        }
    }

    fn component(logging_on: bool) -> Component<Quiet> {
        let instance = SlaveInstance::<Quiet>::new("quiet").unwrap();
        Component::new(instance, Fmi2CallbackFunctions::default(), logging_on)
    }

    #[test]
    fn test_report_logs_errors() {
        let mut component = component(true);
        let status = component.report(Err(FmuError::UnknownValueReference(9)));
        assert_eq!(status, Fmi2Status::Error);
        // The report flushed the queue
        assert!(component.instance().logger().is_empty());
        assert_eq!(component.report(Ok(Fmi2Status::Discard)), Fmi2Status::Discard);
    }

    #[test]
    fn test_flush_respects_settings() {
        let mut component = component(false);
        component
            .instance()
            .log("hidden", Fmi2Status::Warning, None);
        assert!(component.flush_log().is_empty());

        component.set_debug_logging(true, vec!["logStatusError".to_string()]);
        component.instance().log("warning", Fmi2Status::Warning, None);
        component.instance().log("error", Fmi2Status::Error, None);
        let delivered = component.flush_log();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].message, "error");
    }

    #[test]
    fn test_string_buffer() {
        let mut component = component(false);
        let pointers = component.hold_strings(vec!["dog".to_string(), "a\0b".to_string()]);
        let first = unsafe { CStr::from_ptr(pointers[0]) };
        let second = unsafe { CStr::from_ptr(pointers[1]) };
        assert_eq!(first.to_str().unwrap(), "dog");
        assert_eq!(second.to_str().unwrap(), "a b");
    }

    #[test]
    fn test_fail_is_fatal() {
        let mut component = component(true);
        assert_eq!(component.fail("boom"), Fmi2Status::Fatal);
        assert!(component.instance_mut().reset().is_err());
    }
}
