//! castellan - extracts a security-relevant fact index from a
//! web-application source tree.
//!
//! A static analyzer's job is to read code once and produce facts a
//! reasoning layer can check invariants against, not to reason about the
//! facts itself. This crate only extracts; it never scores or judges.

pub mod catalog;
pub mod cli;
pub mod core;
pub mod discover;
pub mod extract;
pub mod model;
pub mod patterns;

pub use core::config::ExtractionConfig;
pub use core::error::{Error, Result};
pub use model::artifact::Artifact;
