//! scrubr-client library interface
//!
//! Client-side orchestration for the data sanitization wizard: the step
//! state machine, job progress monitoring, remote directory navigation and
//! uploads. Presentation layers (the `scrubr` CLI, tests) drive these types.

pub mod api;
pub mod config;
pub mod error;
pub mod pagination;
pub mod services;
pub mod store;
pub mod wizard;

pub use crate::error::{ClientError, ClientResult, ValidationError};
pub use crate::wizard::{Dashboard, WizardContext, WizardSession, WizardSettings};
