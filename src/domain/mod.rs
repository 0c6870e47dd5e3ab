//! Business types, the error taxonomy, and the port traits that separate the core pipelines
//! from their adapters.

pub mod error;
pub mod ports;
pub mod types;
