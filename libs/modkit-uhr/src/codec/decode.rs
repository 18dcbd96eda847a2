use super::{ContentEncoding, MediaKind, charset_encoding, parse_mime};
use crate::error::UhrError;
use encoding_rs::UTF_8;
use http::HeaderMap;
use mime::Mime;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

/// Decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Body of any non-structured media type, or an empty body
    Text(String),
    /// Parsed `application/json` (or `+json`) body
    Json(Value),
    /// Parsed `application/x-www-form-urlencoded` body; values stay strings
    Form(BTreeMap<String, String>),
}

impl Content {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_form(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::Form(fields) => Some(fields),
            _ => None,
        }
    }

    /// Whether the body was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(text) if text.is_empty())
    }

    /// Deserialize a JSON body into a typed value.
    ///
    /// # Errors
    /// `Decode` if the content is not JSON or does not match `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, UhrError> {
        let value = match self {
            Self::Json(value) => value.clone(),
            Self::Text(text) => {
                serde_json::from_str(text).map_err(|source| UhrError::Decode {
                    content_type: "text".to_owned(),
                    source,
                })?
            }
            Self::Form(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
        };
        serde_json::from_value(value).map_err(|source| UhrError::Decode {
            content_type: "application/json".to_owned(),
            source,
        })
    }
}

/// Decode a raw response body according to its headers.
///
/// Steps: undo `Content-Encoding`, decode text with the declared charset,
/// then parse by media type. Only malformed JSON is an error; a form body
/// that cannot be parsed is returned as text.
///
/// # Errors
/// - `Transport` (`Decompression`) or `BodyTooLarge` from decompression
/// - `Decode` for malformed JSON
pub fn decode_body(raw: &[u8], headers: &HeaderMap, limit: usize) -> Result<Content, UhrError> {
    if raw.is_empty() {
        return Ok(Content::Text(String::new()));
    }

    let bytes = ContentEncoding::from_headers(headers).decode(raw, limit)?;
    if bytes.is_empty() {
        return Ok(Content::Text(String::new()));
    }

    let content_type = headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let mime = parse_mime(content_type);
    let text = decode_text(&bytes, mime.as_ref());

    match mime.as_ref().map_or(MediaKind::Text, MediaKind::from_mime) {
        MediaKind::Json => serde_json::from_str(&text)
            .map(Content::Json)
            .map_err(|source| UhrError::Decode {
                content_type: content_type.to_owned(),
                source,
            }),
        MediaKind::Form => match serde_urlencoded::from_str::<Vec<(String, String)>>(&text) {
            Ok(pairs) => Ok(Content::Form(pairs.into_iter().collect())),
            Err(e) => {
                tracing::warn!(error = %e, "form body could not be parsed, returning raw text");
                Ok(Content::Text(text))
            }
        },
        MediaKind::Text => Ok(Content::Text(text)),
    }
}

/// Bytes to text using the declared charset.
///
/// Without a charset the body is read as UTF-8. A byte-order mark overrides
/// the declared charset. Invalid sequences become replacement characters.
fn decode_text(bytes: &[u8], mime: Option<&Mime>) -> String {
    let encoding = match mime.map(charset_encoding) {
        None | Some(Ok(None)) => UTF_8,
        Some(Ok(Some(encoding))) => encoding,
        Some(Err(label)) => {
            tracing::warn!(charset = %label, "unknown charset, decoding as UTF-8");
            UTF_8
        }
    };

    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::debug!(
            charset = used.name(),
            "body contained malformed sequences, replaced"
        );
    }
    text.into_owned()
}
