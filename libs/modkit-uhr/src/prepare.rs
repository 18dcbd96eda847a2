use crate::codec::{encode_body, encode_query};
use crate::config::UhrConfig;
use crate::error::{UhrError, ValidationKind};
use crate::request::{Method, RequestSpec};
use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::uri::InvalidUri;
use http::{HeaderMap, Request, Uri};
use http_body_util::Full;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

/// URL scheme handled by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully validated request, ready for the transport
///
/// Headers are final: caller headers merged over the defaults, suppressed
/// names removed. Request data has been folded into either the body or the
/// URL query.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    method: Method,
    protocol: Protocol,
    host: String,
    port: u16,
    path: String,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    timeout: Option<Duration>,
}

impl PreparedRequest {
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    #[must_use]
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Host without brackets or port.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port, or the protocol default.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Path with the merged query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// `None` means the call has no deadline.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn into_http_request(self) -> Request<Full<Bytes>> {
        let mut request = Request::new(Full::new(self.body));
        *request.method_mut() = self.method.to_http();
        *request.uri_mut() = self.uri;
        *request.headers_mut() = self.headers;
        request
    }
}

/// Validate a [`RequestSpec`] and build the wire-ready request.
///
/// Checks run in a fixed order and the first failure wins: method, URL
/// structure, timeout, protocol, then headers and data. Nothing here touches
/// the network.
///
/// # Errors
/// - `Validation` for a missing or malformed parameter
/// - `UnsupportedProtocol` for a scheme other than `http`/`https`
pub fn prepare(spec: &RequestSpec, config: &UhrConfig) -> Result<PreparedRequest, UhrError> {
    let method: Method = match spec.method.as_deref() {
        None => return Err(UhrError::validation(ValidationKind::MethodRequired)),
        Some(method) => method.parse()?,
    };

    let url = match spec.url.as_deref().map(str::trim) {
        None | Some("") => return Err(UhrError::validation(ValidationKind::UrlRequired)),
        Some(url) => url,
    };
    let parts = ParsedUrl::parse(url)?;

    let timeout = match spec.timeout {
        None => config.default_timeout,
        Some(0) => None,
        Some(ms) => {
            let ms = u64::try_from(ms)
                .map_err(|_| UhrError::validation_detail(ValidationKind::TimeoutInvalid, ms))?;
            Some(Duration::from_millis(ms))
        }
    };

    let protocol = match parts.scheme.as_str() {
        "http" => Protocol::Http,
        "https" => Protocol::Https,
        _ => {
            return Err(UhrError::UnsupportedProtocol {
                scheme: parts.scheme.clone(),
            });
        }
    };

    let (mut headers, suppressed) = normalize_headers(&spec.headers, config)?;

    let data = spec.data.as_ref().filter(|data| !data.is_empty());
    let mut query = parts.query.clone();
    let body = if method.has_body() {
        let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
        let encoded = encode_body(data, content_type)?;
        if !headers.contains_key(CONTENT_TYPE) && !suppressed.contains(&CONTENT_TYPE) {
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static(encoded.default_content_type),
            );
        }
        encoded.bytes
    } else {
        if let Some(data) = data {
            let extra = encode_query(data)?;
            if !extra.is_empty() {
                query = Some(match query {
                    Some(existing) => format!("{existing}&{extra}"),
                    None => extra,
                });
            }
        }
        Bytes::new()
    };

    let path = match query {
        Some(query) => format!("{}?{query}", parts.path),
        None => parts.path.clone(),
    };

    let authority = match parts.port {
        Some(port) => format!("{}:{port}", parts.host),
        None => parts.host.clone(),
    };
    let uri = Uri::builder()
        .scheme(protocol.as_str())
        .authority(authority.as_str())
        .path_and_query(path.as_str())
        .build()
        .map_err(|e| UhrError::validation_detail(ValidationKind::UrlInvalid, e))?;

    Ok(PreparedRequest {
        method,
        protocol,
        host: parts.bare_host().to_owned(),
        port: parts.port.unwrap_or(protocol.default_port()),
        path,
        uri,
        headers,
        body,
        timeout,
    })
}

/// Merge caller headers over the configured defaults.
///
/// Caller entries apply in order, so the last one for a name wins. A `None`
/// value removes the name and keeps the default from being injected. Returns
/// the merged map and the names that stay suppressed.
fn normalize_headers(
    caller: &[(String, Option<String>)],
    config: &UhrConfig,
) -> Result<(HeaderMap, HashSet<HeaderName>), UhrError> {
    let mut headers = HeaderMap::new();
    let mut suppressed: HashSet<HeaderName> = HashSet::new();

    for (name, value) in caller {
        let name = header_name(name)?;
        match value {
            Some(value) => {
                headers.insert(name.clone(), header_value(&name, value)?);
                suppressed.remove(&name);
            }
            None => {
                headers.remove(&name);
                suppressed.insert(name);
            }
        }
    }

    for (name, value) in config.default_headers() {
        let name = header_name(name)?;
        if headers.contains_key(&name) || suppressed.contains(&name) {
            continue;
        }
        let value = header_value(&name, value)?;
        headers.insert(name, value);
    }

    Ok((headers, suppressed))
}

pub(crate) fn header_name(name: &str) -> Result<HeaderName, UhrError> {
    HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|_| UhrError::validation_detail(ValidationKind::HeaderInvalid, name))
}

pub(crate) fn header_value(name: &HeaderName, value: &str) -> Result<HeaderValue, UhrError> {
    HeaderValue::from_str(value)
        .map_err(|_| UhrError::validation_detail(ValidationKind::HeaderInvalid, name))
}

/// Absolute URL, before the protocol is known to be supported
#[derive(Debug, PartialEq, Eq)]
struct ParsedUrl {
    scheme: String,
    /// Host as written in the authority; IPv6 literals keep their brackets
    host: String,
    port: Option<u16>,
    path: String,
    query: Option<String>,
}

impl ParsedUrl {
    /// Parse `scheme://[userinfo@]host[:port][/path][?query][#fragment]`.
    ///
    /// The fragment and userinfo are dropped; an empty path becomes `/` and
    /// an empty query counts as none.
    fn parse(url: &str) -> Result<Self, UhrError> {
        let url = url.split_once('#').map_or(url, |(before, _)| before);
        check_scheme_and_host(url)?;

        let uri: Uri = url.parse().map_err(|e: InvalidUri| {
            UhrError::validation_detail(ValidationKind::UrlInvalid, format!("{url}: {e}"))
        })?;

        let (Some(scheme), Some(authority)) = (uri.scheme_str(), uri.authority()) else {
            return Err(UhrError::validation_detail(ValidationKind::HostRequired, url));
        };
        let host = authority.host();
        if host.is_empty() || host == "[]" {
            return Err(UhrError::validation_detail(ValidationKind::HostRequired, url));
        }

        // `Authority::port_u16` yields `None` both for "no port" and for a
        // malformed one; only the former is acceptable.
        let host_port = authority
            .as_str()
            .rsplit_once('@')
            .map_or(authority.as_str(), |(_, host_port)| host_port);
        let port = match host_port.strip_prefix(host) {
            None | Some("" | ":") => None,
            Some(_) => Some(authority.port_u16().ok_or_else(|| {
                UhrError::validation_detail(ValidationKind::UrlInvalid, url)
            })?),
        };

        let path = match uri.path() {
            "" => "/",
            path => path,
        };

        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            host: host.to_owned(),
            port,
            path: path.to_owned(),
            query: uri.query().filter(|q| !q.is_empty()).map(str::to_owned),
        })
    }

    /// Host without IPv6 brackets.
    fn bare_host(&self) -> &str {
        self.host
            .strip_prefix('[')
            .and_then(|host| host.strip_suffix(']'))
            .unwrap_or(&self.host)
    }
}

/// Tell a missing scheme apart from a missing host before full parsing.
fn check_scheme_and_host(url: &str) -> Result<(), UhrError> {
    let Some((_, rest)) = url
        .split_once(':')
        .filter(|(scheme, _)| is_valid_scheme(scheme))
    else {
        return Err(UhrError::validation_detail(
            ValidationKind::SchemeRequired,
            url,
        ));
    };

    let authority = rest.strip_prefix("//").map(|after| {
        let end = after.find(['/', '?']).unwrap_or(after.len());
        let authority = &after[..end];
        authority
            .rsplit_once('@')
            .map_or(authority, |(_, host_port)| host_port)
    });
    match authority {
        Some(host_port) if !host_port.is_empty() => Ok(()),
        _ => Err(UhrError::validation_detail(ValidationKind::HostRequired, url)),
    }
}

/// `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`
fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
