//! Constants for roles, modes, event-stream framing and HTTP headers
//!
//! String constants shared by the proxy and the client so both sides agree on
//! the wire vocabulary.

/// Message role constants
pub mod role {
    /// User role identifier
    pub const USER: &str = "user";

    /// Assistant role identifier
    pub const ASSISTANT: &str = "assistant";

    /// System role identifier
    pub const SYSTEM: &str = "system";
}

/// Mode name constants
pub mod mode {
    pub const SIMPLE: &str = "simple";
    pub const STEP_BY_STEP: &str = "step-by-step";
    pub const REAL_WORLD: &str = "real-world";
    pub const PROBLEM: &str = "problem";
    pub const QUIZ: &str = "quiz";
    pub const NOTES: &str = "notes";
    pub const PLANNER: &str = "planner";
}

/// Event-stream framing constants
pub mod sse {
    /// Prefix of a payload-carrying line
    pub const DATA_PREFIX: &str = "data: ";

    /// Prefix of a comment line
    pub const COMMENT_PREFIX: char = ':';

    /// Sentinel payload marking the normal end of a stream
    pub const DONE: &str = "[DONE]";

    /// Content type of a streamed response
    pub const CONTENT_TYPE: &str = "text/event-stream";
}

/// Cross-origin header values
pub mod cors {
    pub const ALLOW_ORIGIN: &str = "*";

    pub const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type, \
        x-supabase-client-platform, x-supabase-client-platform-version, \
        x-supabase-client-runtime, x-supabase-client-runtime-version";
}

/// Error taxonomy tags carried in error bodies
pub mod error_kind {
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const QUOTA_EXCEEDED: &str = "quota_exceeded";
    pub const UPSTREAM_ERROR: &str = "upstream_error";
    pub const MALFORMED_UPSTREAM_PAYLOAD: &str = "malformed_upstream_payload";
    pub const MISSING_BODY: &str = "missing_body";
    pub const INTERNAL_ERROR: &str = "internal_error";
}
