//! # scrubr common library
//!
//! Shared code for the scrubr sanitization client:
//! - Wire types exchanged with the sanitization backend
//! - Event types (ScrubEvent enum) and the EventBus
//! - Configuration loading
//! - Common error type

pub mod api;
pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
