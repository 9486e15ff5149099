//! Package Rust simulation models as FMI 2.0 Co-Simulation units.
//!
//! This crate re-exports [`rustfmu_core`] and bundles two demonstration slaves in
//! [`models`]. With the `export-demo` feature (on by default) the shared library built from
//! this crate exports the FMI2 symbol table for [`models::DemoSlave`], so it can be packaged
//! into an FMU as-is.
//!
//! A model crate of its own depends on `rustfmu-core`, derives
//! [`Reflect`](rustfmu_core::Reflect) on its slave, implements
//! [`Fmi2Slave`](rustfmu_core::slave::Fmi2Slave) and invokes
//! [`export_fmi2!`](rustfmu_core::export_fmi2) once.

pub use rustfmu_core::*;

pub mod models;

pub use models::{Counter, DemoSlave};

#[cfg(feature = "export-demo")]
rustfmu_core::export_fmi2!(crate::models::DemoSlave);
