use std::fmt::{Display, Formatter};

use crate::http_client::HttpError;

/// Failure category of a provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    NotFound,
    InvalidResponse,
    Internal,
}

/// Structured provider error consumed by the fetcher's retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    status: Option<u16>,
    transport: Option<HttpError>,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::with_kind(SourceErrorKind::Unavailable, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::with_kind(SourceErrorKind::RateLimited, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_kind(SourceErrorKind::NotFound, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::with_kind(SourceErrorKind::InvalidResponse, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_kind(SourceErrorKind::Internal, message)
    }

    /// Non-success HTTP status from the provider.
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            404 => SourceErrorKind::NotFound,
            429 => SourceErrorKind::RateLimited,
            408 | 500..=599 => SourceErrorKind::Unavailable,
            _ => SourceErrorKind::Internal,
        };
        Self {
            status: Some(status),
            ..Self::with_kind(kind, message)
        }
    }

    /// The request never produced a response.
    pub fn transport(error: HttpError) -> Self {
        Self {
            transport: Some(error.clone()),
            ..Self::with_kind(
                SourceErrorKind::Unavailable,
                format!("transport error: {}", error.message()),
            )
        }
    }

    fn with_kind(kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            transport: None,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn transport_error(&self) -> Option<&HttpError> {
        self.transport.as_ref()
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::InvalidResponse => "source.invalid_response",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}
