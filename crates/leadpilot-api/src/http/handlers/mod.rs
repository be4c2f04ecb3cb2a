//! Request handlers, one module per resource.

pub mod chat;
pub mod session;
pub mod ws;
