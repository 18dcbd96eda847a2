#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Unified HTTP request client for `ModKit`
//!
//! One call shape for every outbound HTTP(S) request:
//! - Parameter validation before any network activity
//! - Request data folded into the query (GET, HEAD, OPTIONS, DELETE) or
//!   encoded as the body (POST, PUT, PATCH) according to `Content-Type`
//! - Default `Accept`, `Accept-Charset` and `User-Agent` headers, each
//!   overridable or suppressible per call
//! - Transparent gzip/deflate decompression, bounded by `max_body_size`
//! - Response bodies decoded into JSON, form fields or text
//! - Classified errors ([`ErrorKind`]) with native socket codes preserved
//!
//! Every received status resolves to an [`UhrResponse`]; a 404 or 500 is a
//! response, not an error. Redirects are returned, not followed.
//!
//! # Example
//!
//! ```ignore
//! use modkit_uhr::{Content, RequestOptions, Uhr};
//! use std::time::Duration;
//!
//! let uhr = Uhr::builder()
//!     .timeout(Duration::from_secs(10))
//!     .user_agent("my-app/1.0")
//!     .build()?;
//!
//! let resp = uhr
//!     .get(
//!         "https://example.com/api/items?page=1",
//!         RequestOptions::new().without_header("accept-charset"),
//!     )
//!     .await?;
//!
//! match resp.content {
//!     Content::Json(value) => println!("{value}"),
//!     other => println!("{other:?}"),
//! }
//! ```

mod builder;
mod client;
pub mod codec;
mod config;
mod error;
mod prepare;
mod request;
mod response;
mod tls;
mod transport;

pub use builder::UhrBuilder;
pub use client::Uhr;
pub use codec::{Content, ContentEncoding, MediaKind};
pub use config::{
    DEFAULT_ACCEPT, DEFAULT_ACCEPT_CHARSET, DEFAULT_USER_AGENT, TlsRootConfig, UhrConfig,
};
pub use error::{BoxError, ErrorKind, TransportCode, UhrError, ValidationKind};
pub use prepare::{PreparedRequest, Protocol, prepare};
pub use request::{Method, RequestData, RequestOptions, RequestSpec};
pub use response::{Status, UhrResponse};
pub use transport::{RawResponse, ResponseBody, TransportService, execute};
