//! Per-visitor conversation state.
//!
//! Two tiers: a capped, expiring fast cache that feeds prompts, and the
//! durable conversation log that keeps everything. [`store::SessionStore`]
//! writes to both.

pub mod cache;
pub mod store;
