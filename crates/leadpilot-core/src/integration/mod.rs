//! Ports for the external systems tools act on.
//!
//! An unconfigured mailer or alert sink succeeds without doing anything.
//! An unconfigured calendar is represented by its absence; `book_meeting`
//! then runs in simulation mode.

pub mod alert;
pub mod calendar;
pub mod mail;
