//! Response types returned by a `RestClient`.

use std::borrow::Cow;

use url::Url;

/// How far the exchange got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseStatus {
    /// Nothing was sent.
    #[default]
    None,
    /// A response was received (any HTTP status code).
    Completed,
    /// Transport failure, or deserialization failure when configured to fail.
    Error,
    /// The request timed out.
    TimedOut,
    /// The request was cancelled by the caller.
    Aborted,
}

impl std::fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
            Self::TimedOut => write!(f, "timed-out"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Result of executing a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestResponse {
    /// HTTP status code; `0` if no response was received.
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub response_uri: Option<Url>,
    pub response_status: ResponseStatus,
    pub error_message: Option<String>,
}

impl RestResponse {
    /// A response that never reached the server.
    pub fn failed(response_status: ResponseStatus, message: impl Into<String>) -> Self {
        Self {
            response_status,
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    /// `true` for a completed exchange with a 2xx status.
    pub fn is_successful(&self) -> bool {
        self.response_status == ResponseStatus::Completed && (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// First header value with the given (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `(name, value)` pairs from every `Set-Cookie` header.
    pub fn cookies(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("set-cookie"))
            .filter_map(|(_, v)| {
                let pair = v.split(';').next()?;
                let (name, value) = pair.split_once('=')?;
                Some((name.trim().to_string(), value.trim().to_string()))
            })
            .collect()
    }
}

/// A response together with its deserialized body.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedResponse<T> {
    pub response: RestResponse,
    /// `None` when the body was empty or could not be deserialized.
    pub data: Option<T>,
}

impl<T> TypedResponse<T> {
    pub fn into_data(self) -> Option<T> {
        self.data
    }
}
