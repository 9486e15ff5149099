/// Export the FMI2 Co-Simulation C symbols for a slave type.
///
/// Expands to one `#[no_mangle] extern "C"` function per entry of the FMI2 function
/// table, each forwarding to the generic implementation in
/// [`ffi::functions`](crate::ffi::functions). The functions live in a module named `fmi2`
/// at the invocation site. Symbol names are fixed, so invoke it once per shared library:
///
/// ```ignore
/// rustfmu_core::export_fmi2!(Counter);
///
/// // Rust callers can reach the symbols as `fmi2::fmi2DoStep` etc.
/// ```
#[macro_export]
macro_rules! export_fmi2 {
    ($slave:ty) => {
        #[allow(non_snake_case, unused_imports, clippy::missing_safety_doc)]
        pub mod fmi2 {
            use super::*;
            use $crate::ffi::functions as f;
            use $crate::ffi::types::*;
            use $crate::status::Fmi2Status;
            use ::std::os::raw::c_char;

            type Slave = $slave;

            #[no_mangle]
            pub extern "C" fn fmi2GetTypesPlatform() -> *const c_char {
                f::get_types_platform()
            }

            #[no_mangle]
            pub extern "C" fn fmi2GetVersion() -> *const c_char {
                f::get_version()
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2SetDebugLogging(
                c: Fmi2Component,
                logging_on: Fmi2Boolean,
                n_categories: usize,
                categories: *const Fmi2String,
            ) -> Fmi2Status {
                f::set_debug_logging::<Slave>(c, logging_on, n_categories, categories)
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2Instantiate(
                instance_name: Fmi2String,
                fmu_type: Fmi2Type,
                fmu_guid: Fmi2String,
                fmu_resource_location: Fmi2String,
                functions: *const Fmi2CallbackFunctions,
                visible: Fmi2Boolean,
                logging_on: Fmi2Boolean,
            ) -> Fmi2Component {
                f::instantiate::<Slave>(
                    instance_name,
                    fmu_type,
                    fmu_guid,
                    fmu_resource_location,
                    functions,
                    visible,
                    logging_on,
                )
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2FreeInstance(c: Fmi2Component) {
                f::free_instance::<Slave>(c)
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2SetupExperiment(
                c: Fmi2Component,
                tolerance_defined: Fmi2Boolean,
                tolerance: Fmi2Real,
                start_time: Fmi2Real,
                stop_time_defined: Fmi2Boolean,
                stop_time: Fmi2Real,
            ) -> Fmi2Status {
                f::setup_experiment::<Slave>(
                    c,
                    tolerance_defined,
                    tolerance,
                    start_time,
                    stop_time_defined,
                    stop_time,
                )
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2EnterInitializationMode(c: Fmi2Component) -> Fmi2Status {
                f::enter_initialization_mode::<Slave>(c)
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2ExitInitializationMode(c: Fmi2Component) -> Fmi2Status {
                f::exit_initialization_mode::<Slave>(c)
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2Terminate(c: Fmi2Component) -> Fmi2Status {
                f::terminate::<Slave>(c)
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2Reset(c: Fmi2Component) -> Fmi2Status {
                f::reset::<Slave>(c)
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2GetReal(
                c: Fmi2Component,
                vr: *const Fmi2ValueReference,
                nvr: usize,
                value: *mut Fmi2Real,
            ) -> Fmi2Status {
                f::get_real::<Slave>(c, vr, nvr, value)
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2GetInteger(
                c: Fmi2Component,
                vr: *const Fmi2ValueReference,
                nvr: usize,
                value: *mut Fmi2Integer,
            ) -> Fmi2Status {
                f::get_integer::<Slave>(c, vr, nvr, value)
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2GetBoolean(
                c: Fmi2Component,
                vr: *const Fmi2ValueReference,
                nvr: usize,
                value: *mut Fmi2Boolean,
            ) -> Fmi2Status {
                f::get_boolean::<Slave>(c, vr, nvr, value)
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2GetString(
                c: Fmi2Component,
                vr: *const Fmi2ValueReference,
                nvr: usize,
                value: *mut Fmi2String,
            ) -> Fmi2Status {
                f::get_string::<Slave>(c, vr, nvr, value)
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2SetReal(
                c: Fmi2Component,
                vr: *const Fmi2ValueReference,
                nvr: usize,
                value: *const Fmi2Real,
            ) -> Fmi2Status {
                f::set_real::<Slave>(c, vr, nvr, value)
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2SetInteger(
                c: Fmi2Component,
                vr: *const Fmi2ValueReference,
                nvr: usize,
                value: *const Fmi2Integer,
            ) -> Fmi2Status {
                f::set_integer::<Slave>(c, vr, nvr, value)
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2SetBoolean(
                c: Fmi2Component,
                vr: *const Fmi2ValueReference,
                nvr: usize,
                value: *const Fmi2Boolean,
            ) -> Fmi2Status {
                f::set_boolean::<Slave>(c, vr, nvr, value)
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2SetString(
                c: Fmi2Component,
                vr: *const Fmi2ValueReference,
                nvr: usize,
                value: *const Fmi2String,
            ) -> Fmi2Status {
                f::set_string::<Slave>(c, vr, nvr, value)
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2GetFMUstate(
                c: Fmi2Component,
                state: *mut Fmi2FmuState,
            ) -> Fmi2Status {
                f::get_fmu_state::<Slave>(c, state)
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2SetFMUstate(
                c: Fmi2Component,
                state: Fmi2FmuState,
            ) -> Fmi2Status {
                f::set_fmu_state::<Slave>(c, state)
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2FreeFMUstate(
                c: Fmi2Component,
                state: *mut Fmi2FmuState,
            ) -> Fmi2Status {
                f::free_fmu_state::<Slave>(c, state)
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2SerializedFMUstateSize(
                c: Fmi2Component,
                state: Fmi2FmuState,
                size: *mut usize,
            ) -> Fmi2Status {
                f::serialized_fmu_state_size::<Slave>(c, state, size)
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2SerializeFMUstate(
                c: Fmi2Component,
                state: Fmi2FmuState,
                serialized_state: *mut Fmi2Byte,
                size: usize,
            ) -> Fmi2Status {
                f::serialize_fmu_state::<Slave>(c, state, serialized_state, size)
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2DeSerializeFMUstate(
                c: Fmi2Component,
                serialized_state: *const Fmi2Byte,
                size: usize,
                state: *mut Fmi2FmuState,
            ) -> Fmi2Status {
                f::deserialize_fmu_state::<Slave>(c, serialized_state, size, state)
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2GetDirectionalDerivative(
                c: Fmi2Component,
                _v_unknown_ref: *const Fmi2ValueReference,
                _n_unknown: usize,
                _v_known_ref: *const Fmi2ValueReference,
                _n_known: usize,
                _dv_known: *const Fmi2Real,
                _dv_unknown: *mut Fmi2Real,
            ) -> Fmi2Status {
                f::unsupported::<Slave>(c, "fmi2GetDirectionalDerivative")
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2SetRealInputDerivatives(
                c: Fmi2Component,
                _vr: *const Fmi2ValueReference,
                _nvr: usize,
                _order: *const Fmi2Integer,
                _value: *const Fmi2Real,
            ) -> Fmi2Status {
                f::unsupported::<Slave>(c, "fmi2SetRealInputDerivatives")
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2GetRealOutputDerivatives(
                c: Fmi2Component,
                _vr: *const Fmi2ValueReference,
                _nvr: usize,
                _order: *const Fmi2Integer,
                _value: *mut Fmi2Real,
            ) -> Fmi2Status {
                f::unsupported::<Slave>(c, "fmi2GetRealOutputDerivatives")
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2DoStep(
                c: Fmi2Component,
                current_communication_point: Fmi2Real,
                communication_step_size: Fmi2Real,
                no_set_fmu_state_prior_to_current_point: Fmi2Boolean,
            ) -> Fmi2Status {
                f::do_step::<Slave>(
                    c,
                    current_communication_point,
                    communication_step_size,
                    no_set_fmu_state_prior_to_current_point,
                )
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2CancelStep(c: Fmi2Component) -> Fmi2Status {
                f::unsupported::<Slave>(c, "fmi2CancelStep")
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2GetStatus(
                c: Fmi2Component,
                _kind: Fmi2StatusKind,
                _value: *mut Fmi2Status,
            ) -> Fmi2Status {
                f::unsupported::<Slave>(c, "fmi2GetStatus")
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2GetRealStatus(
                c: Fmi2Component,
                kind: Fmi2StatusKind,
                value: *mut Fmi2Real,
            ) -> Fmi2Status {
                f::get_real_status::<Slave>(c, kind, value)
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2GetIntegerStatus(
                c: Fmi2Component,
                _kind: Fmi2StatusKind,
                _value: *mut Fmi2Integer,
            ) -> Fmi2Status {
                f::unsupported::<Slave>(c, "fmi2GetIntegerStatus")
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2GetBooleanStatus(
                c: Fmi2Component,
                _kind: Fmi2StatusKind,
                _value: *mut Fmi2Boolean,
            ) -> Fmi2Status {
                f::unsupported::<Slave>(c, "fmi2GetBooleanStatus")
            }

            #[no_mangle]
            pub unsafe extern "C" fn fmi2GetStringStatus(
                c: Fmi2Component,
                _kind: Fmi2StatusKind,
                _value: *mut Fmi2String,
            ) -> Fmi2Status {
                f::unsupported::<Slave>(c, "fmi2GetStringStatus")
            }
        }
    };
}
