//! Business logic for skillforge.
//!
//! Everything that decides how skills are registered, ordered, composed and
//! executed lives here. This crate depends only on `skillforge-types`, never
//! on `skillforge-infra` or any filesystem code.

pub mod skill;
