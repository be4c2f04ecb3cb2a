//! HTTP and WebSocket surface for Leadpilot.
//!
//! Axum-based API at `/api/v1/` plus the `/ws/chat/{visitor_id}` socket, with
//! a JSON error body and permissive CORS.

pub mod error;
pub mod handlers;
pub mod router;
