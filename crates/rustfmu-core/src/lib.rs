//! Variable registry, model description and FMI2 runtime binding for Rust co-simulation
//! slaves.
//!
//! A slave is a struct deriving [`Reflect`] and implementing [`slave::Fmi2Slave`]. Its
//! variables are registered into a per-instance [`registry::VariableRegistry`], which
//! assigns value references, resolves bindings once and serves type-checked batch get/set
//! calls. [`model_description::ModelDescriptionBuilder`] renders `modelDescription.xml` and
//! [`export_fmi2!`] exposes the slave through the FMI2 C ABI.

// The derive macro emits `::rustfmu_core` paths, which also have to resolve in here.
extern crate self as rustfmu_core;

pub mod binding;
pub mod config;
pub mod errors;
pub mod ffi;
pub mod instance;
pub mod logging;
pub mod model_description;
pub mod reflect;
pub mod registry;
pub mod slave;
pub mod state;
pub mod status;
pub mod value;
pub mod variable;

// Re-export derive macro for convenience
pub use reflect::Reflect;
pub use rustfmu_macros::Reflect;

pub mod prelude {
    pub use crate::binding::BindingSpec;
    pub use crate::errors::{FmuError, FmuResult};
    pub use crate::instance::{SlaveInstance, StepOutcome};
    pub use crate::logging::LogQueue;
    pub use crate::model_description::{DefaultExperiment, ModelMetadata};
    pub use crate::slave::{Fmi2Slave, InstanceContext, Registrar};
    pub use crate::state::FmuState;
    pub use crate::status::Fmi2Status;
    pub use crate::value::ScalarValue;
    pub use crate::variable::{Causality, Initial, ScalarVariable, Variability};
    pub use crate::Reflect;
}
