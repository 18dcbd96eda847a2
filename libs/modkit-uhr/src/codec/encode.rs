use super::{FORM_URLENCODED_UTF8, MediaKind, TEXT_PLAIN_UTF8};
use crate::error::{UhrError, ValidationKind};
use crate::request::RequestData;
use bytes::Bytes;
use serde_json::{Map, Value};

/// Serialized request body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    pub bytes: Bytes,
    /// `Content-Type` to send when the caller did not set one
    pub default_content_type: &'static str,
}

/// Serialize request data for a body-carrying method.
///
/// `content_type` is the caller's `Content-Type`, if any. It picks the
/// serializer for structured data: JSON for JSON media types, form encoding
/// otherwise. Text is always sent verbatim.
///
/// # Errors
/// `Validation` if structured data cannot be serialized.
pub fn encode_body(
    data: Option<&RequestData>,
    content_type: Option<&str>,
) -> Result<EncodedBody, UhrError> {
    let Some(data) = data.filter(|data| !data.is_empty()) else {
        return Ok(EncodedBody {
            bytes: Bytes::new(),
            default_content_type: TEXT_PLAIN_UTF8,
        });
    };

    match data {
        RequestData::Text(text) => Ok(EncodedBody {
            bytes: Bytes::from(text.clone()),
            default_content_type: TEXT_PLAIN_UTF8,
        }),
        RequestData::Fields(fields) => {
            let kind = content_type.map_or(MediaKind::Form, MediaKind::from_content_type);
            let bytes = match kind {
                MediaKind::Json => serde_json::to_vec(fields).map_err(|e| {
                    UhrError::validation_detail(ValidationKind::DataInvalid, e)
                })?,
                MediaKind::Form | MediaKind::Text => form_encode(fields)?.into_bytes(),
            };
            Ok(EncodedBody {
                bytes: Bytes::from(bytes),
                default_content_type: FORM_URLENCODED_UTF8,
            })
        }
    }
}

/// Serialize request data as a query string (without the leading `?`).
///
/// Text is taken as an already-encoded query.
///
/// # Errors
/// `Validation` if structured data cannot be serialized.
pub fn encode_query(data: &RequestData) -> Result<String, UhrError> {
    match data {
        RequestData::Text(text) => Ok(text.trim_start_matches(['?', '&']).to_owned()),
        RequestData::Fields(fields) => form_encode(fields),
    }
}

/// `key=value&...` with form percent-encoding.
///
/// Nested values are flattened: arrays of scalars repeat the key, objects and
/// nested arrays are sent as compact JSON text, `null` as an empty value.
fn form_encode(fields: &Map<String, Value>) -> Result<String, UhrError> {
    let mut pairs: Vec<(&str, String)> = Vec::with_capacity(fields.len());
    for (key, value) in fields {
        match value {
            Value::Array(items) => {
                pairs.extend(items.iter().map(|item| (key.as_str(), form_value(item))));
            }
            other => pairs.push((key.as_str(), form_value(other))),
        }
    }

    serde_urlencoded::to_string(&pairs)
        .map_err(|e| UhrError::validation_detail(ValidationKind::DataInvalid, e))
}

fn form_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
