//! Conversation engine and port definitions for Leadpilot.
//!
//! This crate holds the round state machine, tools, scoring and the session
//! store, plus the traits ("ports") the infrastructure layer implements. It
//! depends only on `leadpilot-types`, never on `leadpilot-infra` or any
//! database/IO crate.

pub mod integration;
pub mod llm;
pub mod orchestrator;
pub mod prompt;
pub mod repository;
pub mod scoring;
pub mod session;
pub mod tools;

#[cfg(test)]
mod test_support;
