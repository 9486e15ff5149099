//! Demonstration slaves.
//!
//! [`Counter`] is the smallest useful slave. [`DemoSlave`] registers a variable of every
//! type and causality, plus a nested owner and a computed variable.

mod counter;
mod demo;

pub use counter::Counter;
pub use demo::{DemoSlave, Filter};
