//! Content negotiation: request-body encoding and response-body decoding.
//!
//! Both directions dispatch on a closed set of media categories
//! ([`MediaKind`]) and content codings ([`ContentEncoding`]) so that every
//! content type maps to exactly one code path.

mod compression;
mod decode;
mod encode;

use encoding_rs::Encoding;
use mime::Mime;

pub use compression::ContentEncoding;
pub use decode::{Content, decode_body};
pub use encode::{EncodedBody, encode_body, encode_query};

/// Default content type for text bodies
pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=UTF-8";

/// Default content type for structured bodies
pub const FORM_URLENCODED_UTF8: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// Media category a `Content-Type` selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// `application/json` and any `+json` structured syntax suffix
    Json,
    /// `application/x-www-form-urlencoded`
    Form,
    /// Everything else, treated as opaque text
    Text,
}

impl MediaKind {
    /// Select the category from a `Content-Type` value (parameters ignored).
    ///
    /// A value that does not parse as a media type selects [`MediaKind::Text`].
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Self {
        parse_mime(content_type).map_or(Self::Text, |mime| Self::from_mime(&mime))
    }

    #[must_use]
    pub fn from_mime(mime: &Mime) -> Self {
        if (mime.type_() == mime::APPLICATION && mime.subtype() == mime::JSON)
            || mime.suffix().is_some_and(|suffix| suffix == mime::JSON)
        {
            Self::Json
        } else if mime.type_() == mime::APPLICATION && mime.subtype() == mime::WWW_FORM_URLENCODED
        {
            Self::Form
        } else {
            Self::Text
        }
    }
}

pub(crate) fn parse_mime(content_type: &str) -> Option<Mime> {
    content_type.trim().parse().ok()
}

/// Encoding named by the `charset` parameter.
///
/// `Ok(None)` when no charset is declared, `Err(label)` when the label is
/// not one `encoding_rs` knows.
pub(crate) fn charset_encoding(mime: &Mime) -> Result<Option<&'static Encoding>, String> {
    match mime.get_param(mime::CHARSET) {
        None => Ok(None),
        Some(label) => Encoding::for_label(label.as_str().as_bytes())
            .map(Some)
            .ok_or_else(|| label.as_str().to_owned()),
    }
}
