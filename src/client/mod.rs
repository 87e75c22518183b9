//! Caller side of the study endpoint
//!
//! The chunk parser turns a streamed reply into text deltas; the chat client
//! issues requests and feeds the parser.

pub mod chat;
pub mod parser;

pub use chat::{AssistantReply, ClientError, StudyClient};
pub use parser::{ParserLimits, StreamEvent, StreamHandler};
