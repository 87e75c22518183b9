//! API data models
//!
//! This module contains data structures for the study endpoint and the
//! upstream chat-completion gateway.

pub mod study;
pub mod upstream;
