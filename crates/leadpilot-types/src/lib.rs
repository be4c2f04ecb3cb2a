//! Shared domain types for Leadpilot.
//!
//! This crate contains the plain data shapes used across the workspace:
//! conversation turns, leads, tool envelopes, round events, LLM request and
//! stream types, configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror, secrecy.

pub mod chat;
pub mod config;
pub mod error;
pub mod event;
pub mod lead;
pub mod llm;
pub mod tool;
