//! Drives the exported FMI2 symbol table of the demonstration slave.
//!
//! These are the `#[no_mangle]` functions a master simulator resolves from the shared
//! library, called here through their Rust paths.
#![cfg(feature = "export-demo")]

use is_close::is_close;
use rustfmu::ffi::types::*;
use rustfmu::fmi2::*;
use rustfmu::prelude::*;
use std::ffi::{CStr, CString};
use std::ptr;

const INT_PARAM: Fmi2ValueReference = 0;
const REAL_IN: Fmi2ValueReference = 1;
const STRING_PARAMETER: Fmi2ValueReference = 3;
const REAL_OUT: Fmi2ValueReference = 5;
const BOOLEAN_VARIABLE: Fmi2ValueReference = 6;

struct Fmu {
    component: Fmi2Component,
}

impl Fmu {
    fn instantiate() -> Self {
        let name = CString::new("demo").unwrap();
        let guid = CString::new("").unwrap();
        let callbacks = Fmi2CallbackFunctions::default();
        let component = unsafe {
            fmi2Instantiate(
                name.as_ptr(),
                FMI2_CO_SIMULATION,
                guid.as_ptr(),
                ptr::null(),
                &callbacks,
                FMI2_FALSE,
                FMI2_TRUE,
            )
        };
        assert!(!component.is_null());
        Self { component }
    }

    fn initialize(&self, start_time: f64) {
        unsafe {
            assert_eq!(
                fmi2SetupExperiment(self.component, FMI2_FALSE, 0.0, start_time, FMI2_FALSE, 0.0),
                Fmi2Status::Ok
            );
            assert_eq!(fmi2EnterInitializationMode(self.component), Fmi2Status::Ok);
            assert_eq!(fmi2ExitInitializationMode(self.component), Fmi2Status::Ok);
        }
    }

    fn real(&self, vr: Fmi2ValueReference) -> f64 {
        let mut value = 0.0;
        assert_eq!(
            unsafe { fmi2GetReal(self.component, &vr, 1, &mut value) },
            Fmi2Status::Ok
        );
        value
    }
}

impl Drop for Fmu {
    fn drop(&mut self) {
        unsafe { fmi2FreeInstance(self.component) }
    }
}

mod platform {
    use super::*;

    #[test]
    fn test_version_and_platform() {
        let version = unsafe { CStr::from_ptr(fmi2GetVersion()) };
        let platform = unsafe { CStr::from_ptr(fmi2GetTypesPlatform()) };
        assert_eq!(version.to_str().unwrap(), "2.0");
        assert_eq!(platform.to_str().unwrap(), "default");
    }
}

mod simulation {
    use super::*;

    /// realOut holds the end time of the last step.
    #[test]
    fn test_simulate() {
        let fmu = Fmu::instantiate();
        fmu.initialize(1.0);

        let mut t = 1.0;
        for _ in 0..10 {
            assert_eq!(
                unsafe { fmi2DoStep(fmu.component, t, 0.1, FMI2_TRUE) },
                Fmi2Status::Ok
            );
            t += 0.1;
            assert!(is_close!(fmu.real(REAL_OUT), t));
        }

        unsafe {
            let mut last = 0.0;
            assert_eq!(
                fmi2GetRealStatus(fmu.component, FMI2_LAST_SUCCESSFUL_TIME, &mut last),
                Fmi2Status::Ok
            );
            assert!(is_close!(last, t));
            assert_eq!(fmi2Terminate(fmu.component), Fmi2Status::Ok);
        }
    }

    #[test]
    fn test_start_values() {
        let fmu = Fmu::instantiate();
        assert!(is_close!(fmu.real(REAL_IN), 2.0 / 3.0));

        unsafe {
            let mut int_param = 0;
            assert_eq!(
                fmi2GetInteger(fmu.component, &INT_PARAM, 1, &mut int_param),
                Fmi2Status::Ok
            );
            assert_eq!(int_param, 42);

            let mut flag = FMI2_FALSE;
            assert_eq!(
                fmi2GetBoolean(fmu.component, &BOOLEAN_VARIABLE, 1, &mut flag),
                Fmi2Status::Ok
            );
            assert_eq!(flag, FMI2_TRUE);

            let mut label: Fmi2String = ptr::null();
            assert_eq!(
                fmi2GetString(fmu.component, &STRING_PARAMETER, 1, &mut label),
                Fmi2Status::Ok
            );
            assert_eq!(CStr::from_ptr(label).to_str().unwrap(), "dog");
        }
    }

    #[test]
    fn test_reset_restores_start_values() {
        let fmu = Fmu::instantiate();
        fmu.initialize(0.0);
        unsafe {
            let value = 5.0;
            assert_eq!(
                fmi2SetReal(fmu.component, &REAL_IN, 1, &value),
                Fmi2Status::Ok
            );
            assert_eq!(fmi2DoStep(fmu.component, 0.0, 1.0, FMI2_TRUE), Fmi2Status::Ok);
            assert_eq!(fmi2Reset(fmu.component), Fmi2Status::Ok);
        }
        assert!(is_close!(fmu.real(REAL_IN), 2.0 / 3.0));
        assert!(is_close!(fmu.real(REAL_OUT), 3.0));
    }

    #[test]
    fn test_unsupported_functions() {
        let fmu = Fmu::instantiate();
        fmu.initialize(0.0);
        unsafe {
            assert_eq!(fmi2CancelStep(fmu.component), Fmi2Status::Error);
            let mut status = Fmi2Status::Ok;
            assert_eq!(
                fmi2GetStatus(fmu.component, FMI2_DO_STEP_STATUS, &mut status),
                Fmi2Status::Error
            );
            let mut derivative = 0.0;
            assert_eq!(
                fmi2GetDirectionalDerivative(
                    fmu.component,
                    &REAL_OUT,
                    1,
                    &REAL_IN,
                    1,
                    &1.0,
                    &mut derivative
                ),
                Fmi2Status::Error
            );
        }
    }

    #[test]
    fn test_debug_logging_categories() {
        let fmu = Fmu::instantiate();
        let category = CString::new("logStatusError").unwrap();
        let categories = [category.as_ptr()];
        unsafe {
            assert_eq!(
                fmi2SetDebugLogging(fmu.component, FMI2_TRUE, 1, categories.as_ptr()),
                Fmi2Status::Ok
            );
        }
    }
}

mod fmu_state {
    use super::*;

    #[test]
    fn test_round_trip_through_bytes() {
        let fmu = Fmu::instantiate();
        fmu.initialize(0.0);
        unsafe {
            assert_eq!(fmi2DoStep(fmu.component, 0.0, 0.5, FMI2_TRUE), Fmi2Status::Ok);

            let mut state: Fmi2FmuState = ptr::null_mut();
            assert_eq!(fmi2GetFMUstate(fmu.component, &mut state), Fmi2Status::Ok);

            let mut size = 0;
            assert_eq!(
                fmi2SerializedFMUstateSize(fmu.component, state, &mut size),
                Fmi2Status::Ok
            );
            let mut bytes: Vec<Fmi2Byte> = vec![0; size];
            assert_eq!(
                fmi2SerializeFMUstate(fmu.component, state, bytes.as_mut_ptr(), size),
                Fmi2Status::Ok
            );
            assert_eq!(fmi2FreeFMUstate(fmu.component, &mut state), Fmi2Status::Ok);

            assert_eq!(fmi2DoStep(fmu.component, 0.5, 0.5, FMI2_TRUE), Fmi2Status::Ok);
            assert!(is_close!(fmu.real(REAL_OUT), 1.0));

            let mut restored: Fmi2FmuState = ptr::null_mut();
            assert_eq!(
                fmi2DeSerializeFMUstate(fmu.component, bytes.as_ptr(), size, &mut restored),
                Fmi2Status::Ok
            );
            assert_eq!(fmi2SetFMUstate(fmu.component, restored), Fmi2Status::Ok);
            assert_eq!(fmi2FreeFMUstate(fmu.component, &mut restored), Fmi2Status::Ok);
        }
        assert!(is_close!(fmu.real(REAL_OUT), 0.5));
    }
}
