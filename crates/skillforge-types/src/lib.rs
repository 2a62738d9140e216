//! Shared domain types for skillforge.
//!
//! This crate contains the core domain types of the capability registry:
//! skill metadata, execution results, definitions, discovery projections,
//! configuration, and the associated error types.
//!
//! Zero infrastructure dependencies -- only serde, semver, thiserror.

pub mod config;
pub mod error;
pub mod skill;
