//! Core definitions (error type, result alias and precondition checks), relied upon
//! by all slate-* crates.

pub mod error;
pub mod result;

pub use result::Result;
