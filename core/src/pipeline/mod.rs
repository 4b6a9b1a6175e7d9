// wcpay_core/src/pipeline/mod.rs

//! Defines the `Pipeline<TData, Err>` used to run order transitions: its construction,
//! handler registration and execution.

pub mod definition;
pub mod execution;
pub mod hooks;

pub use definition::Pipeline;
