//! Error taxonomy shared by the proxy and the client

use crate::core::constants::error_kind;
use std::fmt;

/// Caller-facing classification of a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RateLimited,
    QuotaExceeded,
    UpstreamError,
    MalformedUpstreamPayload,
    MissingBody,
    InternalError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RateLimited => error_kind::RATE_LIMITED,
            ErrorKind::QuotaExceeded => error_kind::QUOTA_EXCEEDED,
            ErrorKind::UpstreamError => error_kind::UPSTREAM_ERROR,
            ErrorKind::MalformedUpstreamPayload => error_kind::MALFORMED_UPSTREAM_PAYLOAD,
            ErrorKind::MissingBody => error_kind::MISSING_BODY,
            ErrorKind::InternalError => error_kind::INTERNAL_ERROR,
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            error_kind::RATE_LIMITED => Some(ErrorKind::RateLimited),
            error_kind::QUOTA_EXCEEDED => Some(ErrorKind::QuotaExceeded),
            error_kind::UPSTREAM_ERROR => Some(ErrorKind::UpstreamError),
            error_kind::MALFORMED_UPSTREAM_PAYLOAD => Some(ErrorKind::MalformedUpstreamPayload),
            error_kind::MISSING_BODY => Some(ErrorKind::MissingBody),
            error_kind::INTERNAL_ERROR => Some(ErrorKind::InternalError),
            _ => None,
        }
    }

    /// HTTP status the proxy answers with for this kind
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::RateLimited => 429,
            ErrorKind::QuotaExceeded => 402,
            ErrorKind::UpstreamError
            | ErrorKind::MalformedUpstreamPayload
            | ErrorKind::MissingBody
            | ErrorKind::InternalError => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip_and_status() {
        for kind in [
            ErrorKind::RateLimited,
            ErrorKind::QuotaExceeded,
            ErrorKind::UpstreamError,
            ErrorKind::MalformedUpstreamPayload,
            ErrorKind::MissingBody,
            ErrorKind::InternalError,
        ] {
            assert_eq!(ErrorKind::from_tag(kind.as_str()), Some(kind));
        }
        assert_eq!(ErrorKind::RateLimited.http_status(), 429);
        assert_eq!(ErrorKind::QuotaExceeded.http_status(), 402);
        assert_eq!(ErrorKind::MalformedUpstreamPayload.http_status(), 500);
        assert_eq!(ErrorKind::from_tag("teapot"), None);
    }
}
