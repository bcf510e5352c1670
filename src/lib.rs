//! gaiabench library: attachment-aware model invocation over the GAIA
//! validation benchmark, plus the stores and reports around it.

pub mod backend;
pub mod blob;
pub mod config;
pub mod errors;
pub mod invoke;
pub mod store;
