use crate::codec::{Content, decode_body};
use crate::error::UhrError;
use crate::transport::RawResponse;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

/// Response status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub code: u16,
    /// Canonical reason phrase; empty for unregistered codes
    pub text: String,
}

impl From<StatusCode> for Status {
    fn from(status: StatusCode) -> Self {
        Self {
            code: status.as_u16(),
            text: status.canonical_reason().unwrap_or_default().to_owned(),
        }
    }
}

impl Status {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

/// Result of a call that received a status line
///
/// Any status resolves here, including 4xx and 5xx; check
/// [`Status::is_success`] when the caller cares.
#[derive(Debug, Clone)]
pub struct UhrResponse {
    pub status: Status,
    pub headers: HeaderMap,
    pub content: Content,
}

impl UhrResponse {
    /// Decode a raw exchange into the unified result.
    ///
    /// # Errors
    /// Whatever [`decode_body`] reports: decompression failure, an oversized
    /// inflated body, or malformed JSON.
    pub fn from_raw(raw: RawResponse, max_body_size: usize) -> Result<Self, UhrError> {
        let content = decode_body(&raw.body, &raw.headers, max_body_size)?;
        Ok(Self {
            status: Status::from(raw.status),
            headers: raw.headers,
            content,
        })
    }

    /// Header value as text, if present and printable.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Deserialize a JSON body into `T`.
    ///
    /// # Errors
    /// `Decode` if the content does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, UhrError> {
        self.content.deserialize()
    }
}
