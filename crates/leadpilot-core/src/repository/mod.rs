//! Repository trait definitions (ports).
//!
//! These traits define the durable storage interface that the infrastructure
//! layer (leadpilot-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod conversation;
pub mod lead;
