// Utility functions
pub mod error;
pub mod pagination;
pub mod validation;

pub use error::*;
