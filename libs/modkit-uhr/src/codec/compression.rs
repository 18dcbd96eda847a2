use crate::error::UhrError;
use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use http::HeaderMap;
use std::borrow::Cow;
use std::io::Read;

/// `Content-Encoding` of a response body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Gzip,
    Deflate,
    /// No coding, or a coding this client does not undo
    Identity,
}

impl ContentEncoding {
    /// Coding applied last, which is the one to undo.
    ///
    /// `Content-Encoding` lists codings in the order they were applied,
    /// possibly across several header lines; `identity` entries are no-ops.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get_all(http::header::CONTENT_ENCODING)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|token| !token.is_empty() && !token.eq_ignore_ascii_case("identity"))
            .next_back()
            .map_or(Self::Identity, Self::from_token)
    }

    #[must_use]
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "gzip" | "x-gzip" => Self::Gzip,
            "deflate" => Self::Deflate,
            _ => Self::Identity,
        }
    }

    /// Undo the coding, refusing to inflate beyond `limit` bytes.
    ///
    /// `deflate` is tried as zlib-wrapped data first (what servers send in
    /// practice), then as a raw deflate stream.
    ///
    /// # Errors
    /// `Transport` with code `Decompression` for corrupt input,
    /// `BodyTooLarge` when the inflated body exceeds `limit`.
    pub fn decode<'a>(self, raw: &'a [u8], limit: usize) -> Result<Cow<'a, [u8]>, UhrError> {
        match self {
            Self::Identity => Ok(Cow::Borrowed(raw)),
            Self::Gzip => inflate(GzDecoder::new(raw), limit).map(Cow::Owned),
            Self::Deflate => match inflate(ZlibDecoder::new(raw), limit) {
                Ok(bytes) => Ok(Cow::Owned(bytes)),
                Err(UhrError::BodyTooLarge { limit }) => Err(UhrError::BodyTooLarge { limit }),
                Err(_) => inflate(DeflateDecoder::new(raw), limit).map(Cow::Owned),
            },
        }
    }
}

fn inflate(decoder: impl Read, limit: usize) -> Result<Vec<u8>, UhrError> {
    let mut out = Vec::new();
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    decoder
        .take(cap)
        .read_to_end(&mut out)
        .map_err(UhrError::decompression)?;

    if out.len() > limit {
        return Err(UhrError::BodyTooLarge { limit });
    }
    Ok(out)
}
