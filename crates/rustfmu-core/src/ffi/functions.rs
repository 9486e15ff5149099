//! Generic implementations of the FMI2 Co-Simulation function table.
//!
//! Every function here is generic over the slave type and is exported under its C name by
//! [`export_fmi2!`](crate::export_fmi2). Each call:
//!
//! 1. recovers the [`Component`] behind the `fmi2Component` handle,
//! 2. runs the operation with panics caught (a panic is reported as `fmi2Fatal` and
//!    fails the instance),
//! 3. logs any error with its status and flushes the instance log to the master.
//!
//! # Safety
//!
//! All functions are `unsafe`: the caller (the master simulator) must pass a component
//! handle obtained from [`instantiate`] for the same slave type and not yet freed, and
//! array arguments that are valid for the given lengths.

use crate::errors::{FmuError, FmuResult};
use crate::ffi::component::{emit, to_c_string, Component};
use crate::ffi::types::*;
use crate::instance::SlaveInstance;
use crate::logging::{derive_category, LogQueue};
use crate::slave::{Fmi2Slave, InstanceContext};
use crate::state::FmuState;
use crate::status::Fmi2Status;
use std::any::Any;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use tracing::{error, warn};

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run `operation` against the component behind `c`.
unsafe fn call<S, F>(c: Fmi2Component, name: &'static str, operation: F) -> Fmi2Status
where
    S: Fmi2Slave,
    F: FnOnce(&mut Component<S>) -> FmuResult<Fmi2Status>,
{
    let Some(component) = (c as *mut Component<S>).as_mut() else {
        error!(function = name, "Called with a null component");
        return Fmi2Status::Error;
    };

    match panic::catch_unwind(AssertUnwindSafe(|| operation(&mut *component))) {
        Ok(result) => component.report(result),
        Err(payload) => component.fail(&panic_message(payload)),
    }
}

unsafe fn read_str<'a>(ptr: Fmi2String, what: &str) -> FmuResult<&'a str> {
    if ptr.is_null() {
        return Err(FmuError::Error(format!("{} is a null pointer", what)));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|e| FmuError::Error(format!("{} is not valid UTF-8: {}", what, e)))
}

unsafe fn input<'a, T>(ptr: *const T, len: usize, what: &str) -> FmuResult<&'a [T]> {
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(FmuError::Error(format!("{} is a null pointer", what)));
    }
    Ok(std::slice::from_raw_parts(ptr, len))
}

unsafe fn output<'a, T>(ptr: *mut T, len: usize, what: &str) -> FmuResult<&'a mut [T]> {
    if len == 0 {
        return Ok(&mut []);
    }
    if ptr.is_null() {
        return Err(FmuError::Error(format!("{} is a null pointer", what)));
    }
    Ok(std::slice::from_raw_parts_mut(ptr, len))
}

unsafe fn fmu_state<'a>(state: Fmi2FmuState) -> FmuResult<&'a FmuState> {
    (state as *const FmuState)
        .as_ref()
        .ok_or_else(|| FmuError::Error("FMU state is a null pointer".to_string()))
}

/// Store `state` in the slot pointed to by `target`, reusing an existing allocation.
unsafe fn store_state(target: *mut Fmi2FmuState, state: FmuState) -> FmuResult<()> {
    let slot = target
        .as_mut()
        .ok_or_else(|| FmuError::Error("FMU state slot is a null pointer".to_string()))?;
    match (*slot as *mut FmuState).as_mut() {
        Some(existing) => *existing = state,
        None => *slot = Box::into_raw(Box::new(state)) as Fmi2FmuState,
    }
    Ok(())
}

/// Path of the `resources/` directory from the `fmuResourceLocation` URI.
fn resource_path(location: &str) -> PathBuf {
    let path = location
        .strip_prefix("file://")
        .or_else(|| location.strip_prefix("file:"))
        .unwrap_or(location);
    // `file:///C:/dir` on Windows
    let bytes = path.as_bytes();
    if bytes.len() > 2 && bytes[0] == b'/' && bytes[2] == b':' {
        PathBuf::from(&path[1..])
    } else {
        PathBuf::from(path)
    }
}

pub fn get_types_platform() -> *const c_char {
    c"default".as_ptr()
}

pub fn get_version() -> *const c_char {
    c"2.0".as_ptr()
}

/// `fmi2Instantiate`. Returns null if the slave cannot be created.
#[allow(clippy::too_many_arguments)]
pub unsafe fn instantiate<S: Fmi2Slave>(
    instance_name: Fmi2String,
    fmu_type: Fmi2Type,
    fmu_guid: Fmi2String,
    fmu_resource_location: Fmi2String,
    functions: *const Fmi2CallbackFunctions,
    visible: Fmi2Boolean,
    logging_on: Fmi2Boolean,
) -> Fmi2Component {
    let callbacks = functions.as_ref().copied().unwrap_or_default();
    let name = read_str(instance_name, "instanceName").unwrap_or_default();
    let c_name = to_c_string(name);
    let metadata = S::metadata();
    let reject = |status: Fmi2Status, message: &str| {
        error!(instance = name, "{}", message);
        emit(
            &callbacks,
            &c_name,
            status,
            &derive_category(status, &metadata.log_categories),
            message,
        );
        std::ptr::null_mut()
    };

    if fmu_type != FMI2_CO_SIMULATION {
        return reject(
            Fmi2Status::Error,
            "Unsupported FMU instance type requested (only co-simulation is supported)",
        );
    }

    let mut context = InstanceContext::new(name, LogQueue::new(metadata.log_categories.clone()))
        .with_visible(visible != FMI2_FALSE);
    if let Ok(location) = read_str(fmu_resource_location, "fmuResourceLocation") {
        context = context.with_resources(resource_path(location));
    }

    let instance =
        match panic::catch_unwind(AssertUnwindSafe(|| SlaveInstance::<S>::with_context(context))) {
            Ok(Ok(instance)) => instance,
            Ok(Err(err)) => return reject(err.status(), &err.to_string()),
            Err(payload) => {
                return reject(
                    Fmi2Status::Fatal,
                    &format!("Slave panicked: {}", panic_message(payload)),
                )
            }
        };

    let component = Component::new(instance, callbacks, logging_on != FMI2_FALSE);
    if let Ok(guid) = read_str(fmu_guid, "fmuGUID") {
        let expected = component.instance().guid();
        if guid != expected {
            warn!(instance = name, guid, expected = %expected, "GUID mismatch");
            component.instance().log(
                format!("GUID mismatch: expected {}, got {}", expected, guid),
                Fmi2Status::Warning,
                None,
            );
        }
    }
    component.flush_log();
    Box::into_raw(Box::new(component)) as Fmi2Component
}

/// `fmi2FreeInstance`.
pub unsafe fn free_instance<S: Fmi2Slave>(c: Fmi2Component) {
    if !c.is_null() {
        drop(Box::from_raw(c as *mut Component<S>));
    }
}

pub unsafe fn set_debug_logging<S: Fmi2Slave>(
    c: Fmi2Component,
    logging_on: Fmi2Boolean,
    n_categories: usize,
    categories: *const Fmi2String,
) -> Fmi2Status {
    call::<S, _>(c, "fmi2SetDebugLogging", |component| {
        let categories = input(categories, n_categories, "categories")?
            .iter()
            .map(|category| read_str(*category, "category").map(str::to_string))
            .collect::<FmuResult<Vec<_>>>()?;
        component.set_debug_logging(logging_on != FMI2_FALSE, categories);
        Ok(Fmi2Status::Ok)
    })
}

pub unsafe fn setup_experiment<S: Fmi2Slave>(
    c: Fmi2Component,
    tolerance_defined: Fmi2Boolean,
    tolerance: Fmi2Real,
    start_time: Fmi2Real,
    stop_time_defined: Fmi2Boolean,
    stop_time: Fmi2Real,
) -> Fmi2Status {
    call::<S, _>(c, "fmi2SetupExperiment", |component| {
        let tolerance = (tolerance_defined != FMI2_FALSE).then_some(tolerance);
        let stop_time = (stop_time_defined != FMI2_FALSE).then_some(stop_time);
        component
            .instance_mut()
            .setup_experiment(start_time, stop_time, tolerance)?;
        Ok(Fmi2Status::Ok)
    })
}

pub unsafe fn enter_initialization_mode<S: Fmi2Slave>(c: Fmi2Component) -> Fmi2Status {
    call::<S, _>(c, "fmi2EnterInitializationMode", |component| {
        component.instance_mut().enter_initialization_mode()?;
        Ok(Fmi2Status::Ok)
    })
}

pub unsafe fn exit_initialization_mode<S: Fmi2Slave>(c: Fmi2Component) -> Fmi2Status {
    call::<S, _>(c, "fmi2ExitInitializationMode", |component| {
        component.instance_mut().exit_initialization_mode()?;
        Ok(Fmi2Status::Ok)
    })
}

pub unsafe fn terminate<S: Fmi2Slave>(c: Fmi2Component) -> Fmi2Status {
    call::<S, _>(c, "fmi2Terminate", |component| {
        component.instance_mut().terminate()?;
        Ok(Fmi2Status::Ok)
    })
}

pub unsafe fn reset<S: Fmi2Slave>(c: Fmi2Component) -> Fmi2Status {
    call::<S, _>(c, "fmi2Reset", |component| {
        component.instance_mut().reset()?;
        Ok(Fmi2Status::Ok)
    })
}

pub unsafe fn get_real<S: Fmi2Slave>(
    c: Fmi2Component,
    vr: *const Fmi2ValueReference,
    nvr: usize,
    value: *mut Fmi2Real,
) -> Fmi2Status {
    call::<S, _>(c, "fmi2GetReal", |component| {
        let references = input(vr, nvr, "vr")?;
        let values = component.instance().get_real(references)?;
        output(value, nvr, "value")?.copy_from_slice(&values);
        Ok(Fmi2Status::Ok)
    })
}

pub unsafe fn get_integer<S: Fmi2Slave>(
    c: Fmi2Component,
    vr: *const Fmi2ValueReference,
    nvr: usize,
    value: *mut Fmi2Integer,
) -> Fmi2Status {
    call::<S, _>(c, "fmi2GetInteger", |component| {
        let references = input(vr, nvr, "vr")?;
        let values = component.instance().get_integer(references)?;
        output(value, nvr, "value")?.copy_from_slice(&values);
        Ok(Fmi2Status::Ok)
    })
}

pub unsafe fn get_boolean<S: Fmi2Slave>(
    c: Fmi2Component,
    vr: *const Fmi2ValueReference,
    nvr: usize,
    value: *mut Fmi2Boolean,
) -> Fmi2Status {
    call::<S, _>(c, "fmi2GetBoolean", |component| {
        let references = input(vr, nvr, "vr")?;
        let values = component.instance().get_boolean(references)?;
        for (target, v) in output(value, nvr, "value")?.iter_mut().zip(values) {
            *target = if v { FMI2_TRUE } else { FMI2_FALSE };
        }
        Ok(Fmi2Status::Ok)
    })
}

/// `fmi2GetString`. The returned strings stay valid until the next `fmi2GetString` call on
/// the same instance.
pub unsafe fn get_string<S: Fmi2Slave>(
    c: Fmi2Component,
    vr: *const Fmi2ValueReference,
    nvr: usize,
    value: *mut Fmi2String,
) -> Fmi2Status {
    call::<S, _>(c, "fmi2GetString", |component| {
        let references = input(vr, nvr, "vr")?;
        let values = component.instance().get_string(references)?;
        let pointers = component.hold_strings(values);
        output(value, nvr, "value")?.copy_from_slice(&pointers);
        Ok(Fmi2Status::Ok)
    })
}

pub unsafe fn set_real<S: Fmi2Slave>(
    c: Fmi2Component,
    vr: *const Fmi2ValueReference,
    nvr: usize,
    value: *const Fmi2Real,
) -> Fmi2Status {
    call::<S, _>(c, "fmi2SetReal", |component| {
        let references = input(vr, nvr, "vr")?;
        let values = input(value, nvr, "value")?;
        component.instance_mut().set_real(references, values)?;
        Ok(Fmi2Status::Ok)
    })
}

pub unsafe fn set_integer<S: Fmi2Slave>(
    c: Fmi2Component,
    vr: *const Fmi2ValueReference,
    nvr: usize,
    value: *const Fmi2Integer,
) -> Fmi2Status {
    call::<S, _>(c, "fmi2SetInteger", |component| {
        let references = input(vr, nvr, "vr")?;
        let values = input(value, nvr, "value")?;
        component.instance_mut().set_integer(references, values)?;
        Ok(Fmi2Status::Ok)
    })
}

pub unsafe fn set_boolean<S: Fmi2Slave>(
    c: Fmi2Component,
    vr: *const Fmi2ValueReference,
    nvr: usize,
    value: *const Fmi2Boolean,
) -> Fmi2Status {
    call::<S, _>(c, "fmi2SetBoolean", |component| {
        let references = input(vr, nvr, "vr")?;
        let values: Vec<bool> = input(value, nvr, "value")?
            .iter()
            .map(|v| *v != FMI2_FALSE)
            .collect();
        component.instance_mut().set_boolean(references, &values)?;
        Ok(Fmi2Status::Ok)
    })
}

pub unsafe fn set_string<S: Fmi2Slave>(
    c: Fmi2Component,
    vr: *const Fmi2ValueReference,
    nvr: usize,
    value: *const Fmi2String,
) -> Fmi2Status {
    call::<S, _>(c, "fmi2SetString", |component| {
        let references = input(vr, nvr, "vr")?;
        let values = input(value, nvr, "value")?
            .iter()
            .map(|v| read_str(*v, "value"))
            .collect::<FmuResult<Vec<_>>>()?;
        component.instance_mut().set_string(references, &values)?;
        Ok(Fmi2Status::Ok)
    })
}

/// `fmi2GetFMUstate`. Reuses the state behind `*state` when it is not null.
pub unsafe fn get_fmu_state<S: Fmi2Slave>(
    c: Fmi2Component,
    state: *mut Fmi2FmuState,
) -> Fmi2Status {
    call::<S, _>(c, "fmi2GetFMUstate", |component| {
        let snapshot = component.instance_mut().get_fmu_state()?;
        store_state(state, snapshot)?;
        Ok(Fmi2Status::Ok)
    })
}

pub unsafe fn set_fmu_state<S: Fmi2Slave>(c: Fmi2Component, state: Fmi2FmuState) -> Fmi2Status {
    call::<S, _>(c, "fmi2SetFMUstate", |component| {
        component.instance_mut().set_fmu_state(fmu_state(state)?)?;
        Ok(Fmi2Status::Ok)
    })
}

pub unsafe fn free_fmu_state<S: Fmi2Slave>(
    c: Fmi2Component,
    state: *mut Fmi2FmuState,
) -> Fmi2Status {
    call::<S, _>(c, "fmi2FreeFMUstate", |_| {
        if let Some(slot) = state.as_mut() {
            if !slot.is_null() {
                drop(Box::from_raw(*slot as *mut FmuState));
                *slot = std::ptr::null_mut();
            }
        }
        Ok(Fmi2Status::Ok)
    })
}

pub unsafe fn serialized_fmu_state_size<S: Fmi2Slave>(
    c: Fmi2Component,
    state: Fmi2FmuState,
    size: *mut usize,
) -> Fmi2Status {
    call::<S, _>(c, "fmi2SerializedFMUstateSize", |component| {
        let bytes = component.instance().state_to_bytes(fmu_state(state)?)?;
        *size
            .as_mut()
            .ok_or_else(|| FmuError::Error("size is a null pointer".to_string()))? = bytes.len();
        Ok(Fmi2Status::Ok)
    })
}

pub unsafe fn serialize_fmu_state<S: Fmi2Slave>(
    c: Fmi2Component,
    state: Fmi2FmuState,
    serialized_state: *mut Fmi2Byte,
    size: usize,
) -> Fmi2Status {
    call::<S, _>(c, "fmi2SerializeFMUstate", |component| {
        let bytes = component.instance().state_to_bytes(fmu_state(state)?)?;
        if size < bytes.len() {
            return Err(FmuError::Error(format!(
                "Buffer of {} bytes is too small for a serialized state of {} bytes",
                size,
                bytes.len()
            )));
        }
        let target = output(serialized_state, bytes.len(), "serializedState")?;
        for (dst, src) in target.iter_mut().zip(&bytes) {
            *dst = *src as Fmi2Byte;
        }
        Ok(Fmi2Status::Ok)
    })
}

pub unsafe fn deserialize_fmu_state<S: Fmi2Slave>(
    c: Fmi2Component,
    serialized_state: *const Fmi2Byte,
    size: usize,
    state: *mut Fmi2FmuState,
) -> Fmi2Status {
    call::<S, _>(c, "fmi2DeSerializeFMUstate", |component| {
        let bytes: Vec<u8> = input(serialized_state, size, "serializedState")?
            .iter()
            .map(|b| *b as u8)
            .collect();
        let decoded = component.instance().state_from_bytes(&bytes)?;
        store_state(state, decoded)?;
        Ok(Fmi2Status::Ok)
    })
}

pub unsafe fn do_step<S: Fmi2Slave>(
    c: Fmi2Component,
    current_communication_point: Fmi2Real,
    communication_step_size: Fmi2Real,
    _no_set_fmu_state_prior_to_current_point: Fmi2Boolean,
) -> Fmi2Status {
    call::<S, _>(c, "fmi2DoStep", |component| {
        let outcome = component
            .instance_mut()
            .do_step(current_communication_point, communication_step_size)?;
        Ok(outcome.status())
    })
}

pub unsafe fn get_real_status<S: Fmi2Slave>(
    c: Fmi2Component,
    kind: Fmi2StatusKind,
    value: *mut Fmi2Real,
) -> Fmi2Status {
    call::<S, _>(c, "fmi2GetRealStatus", |component| {
        if kind != FMI2_LAST_SUCCESSFUL_TIME {
            return Err(FmuError::Error(
                "Invalid status inquiry for fmi2GetRealStatus".to_string(),
            ));
        }
        let target = value
            .as_mut()
            .ok_or_else(|| FmuError::Error("value is a null pointer".to_string()))?;
        *target = component.instance().last_successful_time();
        Ok(Fmi2Status::Ok)
    })
}

/// Log and reject a function this framework does not implement.
pub unsafe fn unsupported<S: Fmi2Slave>(c: Fmi2Component, name: &'static str) -> Fmi2Status {
    call::<S, _>(c, name, |_| {
        Err(FmuError::Error(format!("FMI function not supported: {}", name)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_path() {
        assert_eq!(
            resource_path("file:///tmp/fmu/resources"),
            PathBuf::from("/tmp/fmu/resources")
        );
        assert_eq!(
            resource_path("file:/tmp/fmu/resources"),
            PathBuf::from("/tmp/fmu/resources")
        );
        assert_eq!(
            resource_path("file:///C:/fmu/resources"),
            PathBuf::from("C:/fmu/resources")
        );
        assert_eq!(resource_path("/plain/path"), PathBuf::from("/plain/path"));
    }

    #[test]
    fn test_panic_message() {
        let payload = panic::catch_unwind(|| panic!("boom {}", 1)).unwrap_err();
        assert_eq!(panic_message(payload), "boom 1");
        let payload = panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(payload), "static");
    }

    #[test]
    fn test_platform_strings() {
        let platform = unsafe { CStr::from_ptr(get_types_platform()) };
        let version = unsafe { CStr::from_ptr(get_version()) };
        assert_eq!(platform.to_str().unwrap(), FMI2_TYPES_PLATFORM);
        assert_eq!(version.to_str().unwrap(), FMI2_VERSION);
    }
}
