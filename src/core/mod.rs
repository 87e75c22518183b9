//! Core application modules
//!
//! This module contains configuration, constants, logging, the prompt
//! registry, the gateway client and the mode dispatcher.

pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod prompts;
pub mod subjects;
