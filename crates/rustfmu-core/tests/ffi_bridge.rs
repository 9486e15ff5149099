//! Tests of the FMI2 C-ABI bridge.
//!
//! The generic entry points in `rustfmu_core::ffi::functions` are called the way a master
//! simulator would call the exported symbols: raw handles, raw arrays and status codes.

use rustfmu_core::ffi::functions as f;
use rustfmu_core::ffi::types::*;
use rustfmu_core::prelude::*;
use std::ffi::{CStr, CString};
use std::ptr;

#[derive(Reflect)]
struct Counter {
    count: i32,
    step: i32,
    label: String,
    ready: bool,
    gain: f64,
    panic_on_step: bool,
}

impl Fmi2Slave for Counter {
    fn metadata() -> ModelMetadata {
        ModelMetadata::new("Counter").with_guid("c0ffee00-0000-4000-8000-000000000001")
    }

    fn instantiate(_context: &InstanceContext) -> FmuResult<Self> {
        Ok(Counter {
            count: 1,
            step: 1,
            label: "dog".to_string(),
            ready: false,
            gain: 0.5,
            panic_on_step: false,
        })
    }

    fn register_variables(&self, registrar: &mut Registrar<'_, Self>) -> FmuResult<()> {
        registrar.register(ScalarVariable::integer("count").with_causality(Causality::Output))?;
        registrar.register(ScalarVariable::integer("step").with_causality(Causality::Input))?;
        registrar.register(ScalarVariable::string("label").with_causality(Causality::Input))?;
        registrar.register(ScalarVariable::boolean("ready").with_causality(Causality::Output))?;
        registrar.register(ScalarVariable::real("gain").with_causality(Causality::Parameter))?;
        registrar.register(
            ScalarVariable::boolean("panic_on_step").with_causality(Causality::Input),
        )?;
        Ok(())
    }

    fn do_step(&mut self, _current_time: f64, _step_size: f64) -> FmuResult<bool> {
        if self.panic_on_step {
            panic!("step exploded");
        }
        self.count += self.step;
        self.ready = true;
        Ok(true)
    }
}

const COUNT: Fmi2ValueReference = 0;
const STEP: Fmi2ValueReference = 1;
const LABEL: Fmi2ValueReference = 2;
const READY: Fmi2ValueReference = 3;
const GAIN: Fmi2ValueReference = 4;
const PANIC_ON_STEP: Fmi2ValueReference = 5;

fn instantiate(fmu_type: Fmi2Type) -> Fmi2Component {
    let name = CString::new("counter").unwrap();
    let guid = CString::new("c0ffee00-0000-4000-8000-000000000001").unwrap();
    let resources = CString::new("file:///tmp/counter/resources").unwrap();
    let callbacks = Fmi2CallbackFunctions::default();
    unsafe {
        f::instantiate::<Counter>(
            name.as_ptr(),
            fmu_type,
            guid.as_ptr(),
            resources.as_ptr(),
            &callbacks,
            FMI2_FALSE,
            FMI2_FALSE,
        )
    }
}

fn initialized() -> Fmi2Component {
    let c = instantiate(FMI2_CO_SIMULATION);
    assert!(!c.is_null());
    unsafe {
        assert_eq!(
            f::setup_experiment::<Counter>(c, FMI2_FALSE, 0.0, 0.0, FMI2_FALSE, 0.0),
            Fmi2Status::Ok
        );
        assert_eq!(f::enter_initialization_mode::<Counter>(c), Fmi2Status::Ok);
        assert_eq!(f::exit_initialization_mode::<Counter>(c), Fmi2Status::Ok);
    }
    c
}

fn get_integer(c: Fmi2Component, vr: Fmi2ValueReference) -> Fmi2Integer {
    let mut value = 0;
    let status = unsafe { f::get_integer::<Counter>(c, &vr, 1, &mut value) };
    assert_eq!(status, Fmi2Status::Ok);
    value
}

mod lifecycle {
    use super::*;

    /// Three steps from count=1 give 4, and a reset brings the start value back.
    #[test]
    fn test_step_and_reset() {
        let c = initialized();
        unsafe {
            for i in 0..3 {
                let t = i as f64 * 0.1;
                assert_eq!(f::do_step::<Counter>(c, t, 0.1, FMI2_TRUE), Fmi2Status::Ok);
            }
            assert_eq!(get_integer(c, COUNT), 4);

            let mut last = 0.0;
            assert_eq!(
                f::get_real_status::<Counter>(c, FMI2_LAST_SUCCESSFUL_TIME, &mut last),
                Fmi2Status::Ok
            );
            assert!((last - 0.3).abs() < 1e-12);

            assert_eq!(f::terminate::<Counter>(c), Fmi2Status::Ok);
            assert_eq!(f::reset::<Counter>(c), Fmi2Status::Ok);
            assert_eq!(get_integer(c, COUNT), 1);
            f::free_instance::<Counter>(c);
        }
    }

    /// Model exchange instances are refused with a null handle.
    #[test]
    fn test_model_exchange_rejected() {
        assert!(instantiate(FMI2_MODEL_EXCHANGE).is_null());
    }

    #[test]
    fn test_step_before_initialization_is_an_error() {
        let c = instantiate(FMI2_CO_SIMULATION);
        unsafe {
            assert_eq!(f::do_step::<Counter>(c, 0.0, 0.1, FMI2_TRUE), Fmi2Status::Error);
            f::free_instance::<Counter>(c);
        }
    }

    /// A panic inside the slave is reported as fatal and the instance stays failed.
    #[test]
    fn test_panic_is_fatal() {
        let c = initialized();
        unsafe {
            let on = FMI2_TRUE;
            assert_eq!(
                f::set_boolean::<Counter>(c, &PANIC_ON_STEP, 1, &on),
                Fmi2Status::Ok
            );
            assert_eq!(f::do_step::<Counter>(c, 0.0, 0.1, FMI2_TRUE), Fmi2Status::Fatal);

            let mut value = 0;
            assert_eq!(
                f::get_integer::<Counter>(c, &COUNT, 1, &mut value),
                Fmi2Status::Error
            );
            assert_eq!(f::reset::<Counter>(c), Fmi2Status::Error);
            f::free_instance::<Counter>(c);
        }
    }

    #[test]
    fn test_null_component() {
        unsafe {
            assert_eq!(
                f::enter_initialization_mode::<Counter>(ptr::null_mut()),
                Fmi2Status::Error
            );
            // Freeing null is a no-op
            f::free_instance::<Counter>(ptr::null_mut());
        }
    }

    #[test]
    fn test_unsupported_function() {
        let c = initialized();
        unsafe {
            assert_eq!(
                f::unsupported::<Counter>(c, "fmi2CancelStep"),
                Fmi2Status::Error
            );
            let mut value = 0.0;
            assert_eq!(
                f::get_real_status::<Counter>(c, FMI2_DO_STEP_STATUS, &mut value),
                Fmi2Status::Error
            );
            f::free_instance::<Counter>(c);
        }
    }
}

mod values {
    use super::*;

    #[test]
    fn test_batch_set_and_get() {
        let c = initialized();
        unsafe {
            let refs = [STEP, COUNT];
            let mut out = [0; 2];
            assert_eq!(
                f::get_integer::<Counter>(c, refs.as_ptr(), 2, out.as_mut_ptr()),
                Fmi2Status::Ok
            );
            assert_eq!(out, [1, 1]);

            let step = 5;
            assert_eq!(f::set_integer::<Counter>(c, &STEP, 1, &step), Fmi2Status::Ok);
            assert_eq!(f::do_step::<Counter>(c, 0.0, 1.0, FMI2_TRUE), Fmi2Status::Ok);
            assert_eq!(get_integer(c, COUNT), 6);

            let mut ready = FMI2_FALSE;
            assert_eq!(
                f::get_boolean::<Counter>(c, &READY, 1, &mut ready),
                Fmi2Status::Ok
            );
            assert_eq!(ready, FMI2_TRUE);

            let gain = 2.5;
            let mut read = 0.0;
            assert_eq!(f::set_real::<Counter>(c, &GAIN, 1, &gain), Fmi2Status::Ok);
            assert_eq!(f::get_real::<Counter>(c, &GAIN, 1, &mut read), Fmi2Status::Ok);
            assert_eq!(read, 2.5);
            f::free_instance::<Counter>(c);
        }
    }

    /// Asking for a variable through the wrong typed getter is an error.
    #[test]
    fn test_wrong_type() {
        let c = initialized();
        unsafe {
            let mut value = 0.0;
            assert_eq!(
                f::get_real::<Counter>(c, &COUNT, 1, &mut value),
                Fmi2Status::Error
            );
            let unknown = 99;
            let mut int_value = 0;
            assert_eq!(
                f::get_integer::<Counter>(c, &unknown, 1, &mut int_value),
                Fmi2Status::Error
            );
            f::free_instance::<Counter>(c);
        }
    }

    /// Strings returned by `fmi2GetString` stay readable until the next call.
    #[test]
    fn test_strings() {
        let c = initialized();
        unsafe {
            let cat = CString::new("cat").unwrap();
            let values = [cat.as_ptr()];
            assert_eq!(
                f::set_string::<Counter>(c, &LABEL, 1, values.as_ptr()),
                Fmi2Status::Ok
            );

            let mut out: [Fmi2String; 1] = [ptr::null()];
            assert_eq!(
                f::get_string::<Counter>(c, &LABEL, 1, out.as_mut_ptr()),
                Fmi2Status::Ok
            );
            drop(cat);
            assert_eq!(CStr::from_ptr(out[0]).to_str().unwrap(), "cat");
            f::free_instance::<Counter>(c);
        }
    }
}

mod fmu_state {
    use super::*;

    #[test]
    fn test_get_set_and_serialize() {
        let c = initialized();
        unsafe {
            assert_eq!(f::do_step::<Counter>(c, 0.0, 0.1, FMI2_TRUE), Fmi2Status::Ok);

            let mut state: Fmi2FmuState = ptr::null_mut();
            assert_eq!(f::get_fmu_state::<Counter>(c, &mut state), Fmi2Status::Ok);
            assert!(!state.is_null());

            let mut size = 0;
            assert_eq!(
                f::serialized_fmu_state_size::<Counter>(c, state, &mut size),
                Fmi2Status::Ok
            );
            let mut buffer: Vec<Fmi2Byte> = vec![0; size];
            assert_eq!(
                f::serialize_fmu_state::<Counter>(c, state, buffer.as_mut_ptr(), size),
                Fmi2Status::Ok
            );
            assert_eq!(
                f::serialize_fmu_state::<Counter>(c, state, buffer.as_mut_ptr(), size - 1),
                Fmi2Status::Error
            );

            assert_eq!(f::do_step::<Counter>(c, 0.1, 0.1, FMI2_TRUE), Fmi2Status::Ok);
            assert_eq!(get_integer(c, COUNT), 3);

            let mut decoded: Fmi2FmuState = ptr::null_mut();
            assert_eq!(
                f::deserialize_fmu_state::<Counter>(c, buffer.as_ptr(), size, &mut decoded),
                Fmi2Status::Ok
            );
            assert_eq!(f::set_fmu_state::<Counter>(c, decoded), Fmi2Status::Ok);
            assert_eq!(get_integer(c, COUNT), 2);

            assert_eq!(f::free_fmu_state::<Counter>(c, &mut state), Fmi2Status::Ok);
            assert!(state.is_null());
            assert_eq!(f::free_fmu_state::<Counter>(c, &mut decoded), Fmi2Status::Ok);
            f::free_instance::<Counter>(c);
        }
    }

    #[test]
    fn test_malformed_bytes() {
        let c = initialized();
        unsafe {
            let garbage: Vec<Fmi2Byte> = b"not json".iter().map(|b| *b as Fmi2Byte).collect();
            let mut decoded: Fmi2FmuState = ptr::null_mut();
            assert_eq!(
                f::deserialize_fmu_state::<Counter>(
                    c,
                    garbage.as_ptr(),
                    garbage.len(),
                    &mut decoded
                ),
                Fmi2Status::Error
            );
            assert!(decoded.is_null());
            f::free_instance::<Counter>(c);
        }
    }
}
