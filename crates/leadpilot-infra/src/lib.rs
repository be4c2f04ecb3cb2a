//! Infrastructure layer for Leadpilot.
//!
//! Implements the ports defined in `leadpilot-core`: SQLite conversation log
//! and lead store, the in-process session cache, the OpenAI-compatible
//! provider, and the calendar, SMTP and Slack collaborators.

pub mod alert;
pub mod cache;
pub mod calendar;
pub mod config;
pub mod llm;
pub mod mail;
pub mod sqlite;
