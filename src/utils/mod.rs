// file: src/utils/mod.rs
// description: utility functions module exports
// reference: internal module structure

pub mod logging;
pub mod validation;

pub use logging::Verbosity;
pub use validation::Validator;
