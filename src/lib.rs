//! Study assistant proxy
//!
//! A single-endpoint proxy that forwards study requests to a chat-completion
//! gateway, plus the client that consumes its streamed replies.

pub mod api;
pub mod client;
pub mod core;
pub mod models;
