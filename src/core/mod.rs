//! Core domain models for a deployment run
//!
//! This module defines the pipeline, its stages, the run context and the
//! pure tag/environment derivations everything else builds on.

pub mod config;
pub mod context;
pub mod pipeline;
pub mod refs;
pub mod rules;
pub mod stage;
pub mod state;

pub use context::*;
pub use pipeline::*;
pub use refs::{BuildTags, GitRef, RefError, Trigger};
pub use rules::{resolve_environment, Environment, EnvironmentRule};
pub use stage::*;
pub use state::*;
