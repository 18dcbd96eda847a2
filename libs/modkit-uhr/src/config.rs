use std::time::Duration;

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = concat!("modkit-uhr/", env!("CARGO_PKG_VERSION"));

/// Default `Accept` header: every media type the decoder understands, then anything
pub const DEFAULT_ACCEPT: &str = "application/json, application/x-www-form-urlencoded;q=0.9, \
     text/plain;q=0.8, text/html;q=0.7, */*;q=0.5";

/// Default `Accept-Charset` header
pub const DEFAULT_ACCEPT_CHARSET: &str = "UTF-8";

/// TLS root certificate configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TlsRootConfig {
    /// Mozilla's root certificates bundled via webpki-roots
    #[default]
    WebPki,
    /// OS native root certificate store
    Native,
}

/// Client configuration
///
/// Holds only defaults; no per-request state lives here. Several clients with
/// different configurations can coexist.
#[derive(Debug, Clone)]
pub struct UhrConfig {
    /// Timeout applied when a request does not specify one (default: none)
    ///
    /// A per-request timeout of `0` disables the limit for that request even
    /// when a default is configured.
    pub default_timeout: Option<Duration>,

    /// `User-Agent` header injected unless the caller sets or suppresses it
    pub user_agent: String,

    /// `Accept` header injected unless the caller sets or suppresses it
    pub accept: String,

    /// `Accept-Charset` header injected unless the caller sets or suppresses it
    pub accept_charset: String,

    /// Additional default headers, injected with the same rules as the built-in ones
    pub headers: Vec<(String, String)>,

    /// Maximum response body size in bytes, enforced on both the received and
    /// the decompressed body (default: 10 MB)
    pub max_body_size: usize,

    /// TLS root certificate strategy (default: `WebPki`)
    pub tls_roots: TlsRootConfig,

    /// Idle connection timeout for the pool (default: 90 seconds)
    pub pool_idle_timeout: Option<Duration>,

    /// Maximum idle connections kept per host (default: 32)
    pub pool_max_idle_per_host: usize,
}

impl Default for UhrConfig {
    fn default() -> Self {
        Self {
            default_timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            accept: DEFAULT_ACCEPT.to_owned(),
            accept_charset: DEFAULT_ACCEPT_CHARSET.to_owned(),
            headers: Vec::new(),
            max_body_size: 10 * 1024 * 1024, // 10 MB
            tls_roots: TlsRootConfig::default(),
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
        }
    }
}

impl UhrConfig {
    /// Configuration for tests against local mock servers
    ///
    /// Short default timeout and no connection reuse, so a server that closes
    /// sockets in one test cannot leak a stale pooled connection into another.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            default_timeout: Some(Duration::from_secs(10)),
            max_body_size: 1024 * 1024, // 1 MB
            pool_idle_timeout: Some(Duration::from_secs(10)),
            pool_max_idle_per_host: 0,
            ..Self::default()
        }
    }

    /// Built-in and configured default headers, in injection order.
    pub(crate) fn default_headers(&self) -> impl Iterator<Item = (&str, &str)> {
        [
            ("accept", self.accept.as_str()),
            ("accept-charset", self.accept_charset.as_str()),
            ("user-agent", self.user_agent.as_str()),
        ]
        .into_iter()
        .chain(
            self.headers
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str())),
        )
    }
}
