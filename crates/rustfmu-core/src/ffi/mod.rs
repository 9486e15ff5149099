//! FMI 2.0 C-ABI bridge.
//!
//! `types` mirrors the C headers, `functions` holds the generic implementation of every
//! entry point, and [`export_fmi2!`](crate::export_fmi2) stamps out the `#[no_mangle]`
//! symbols for a concrete slave type.

pub mod component;
mod export;
pub mod functions;
pub mod types;

pub use component::Component;
