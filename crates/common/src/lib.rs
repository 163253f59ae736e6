//! Shared addressing vocabulary for rusty-object-storage crates.
//!
//! This crate provides the types every other crate speaks in:
//! - Object references and directories (backend-neutral addressing)
//! - Key joining and splitting between references and backend keys
//! - Separator validation shared by all backends
//! - Shared constants and error types

pub mod constants;
pub mod error;
pub mod reference;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::ReferenceError;
pub use reference::{ObjectDirectory, ObjectReference};
