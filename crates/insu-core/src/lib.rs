//! insu-core
//!
//! Shared domain types, the error taxonomy, configuration and the insurer
//! registry used by every other crate in the workspace.

pub mod config;
pub mod error;
pub mod registry;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
