use crate::error::{UhrError, ValidationKind};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Recognized request methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Options,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Whether request data goes into the body.
    ///
    /// For the other methods data is folded into the URL query and the body
    /// stays empty.
    #[must_use]
    pub const fn has_body(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }

    pub(crate) fn to_http(self) -> http::Method {
        match self {
            Self::Get => http::Method::GET,
            Self::Head => http::Method::HEAD,
            Self::Options => http::Method::OPTIONS,
            Self::Post => http::Method::POST,
            Self::Put => http::Method::PUT,
            Self::Patch => http::Method::PATCH,
            Self::Delete => http::Method::DELETE,
        }
    }
}

impl FromStr for Method {
    type Err = UhrError;

    /// Case-insensitive parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let method = match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "PATCH" => Self::Patch,
            "DELETE" => Self::Delete,
            "" => return Err(UhrError::validation(ValidationKind::MethodRequired)),
            _ => {
                return Err(UhrError::validation_detail(
                    ValidationKind::MethodUnsupported,
                    s,
                ));
            }
        };
        Ok(method)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data sent with a request
///
/// For body-carrying methods it becomes the body; otherwise it is appended to
/// the URL query string.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestData {
    /// Sent verbatim
    Text(String),
    /// Serialized according to the effective `Content-Type`
    Fields(Map<String, Value>),
}

impl RequestData {
    /// Whether there is nothing to send.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Fields(fields) => fields.is_empty(),
        }
    }
}

impl From<String> for RequestData {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for RequestData {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Map<String, Value>> for RequestData {
    fn from(fields: Map<String, Value>) -> Self {
        Self::Fields(fields)
    }
}

impl TryFrom<Value> for RequestData {
    type Error = UhrError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(text) => Ok(Self::Text(text)),
            Value::Object(fields) => Ok(Self::Fields(fields)),
            Value::Number(n) => Ok(Self::Text(n.to_string())),
            Value::Bool(b) => Ok(Self::Text(b.to_string())),
            Value::Null | Value::Array(_) => Err(UhrError::validation_detail(
                ValidationKind::DataInvalid,
                "expected a string or an object",
            )),
        }
    }
}

/// Caller-supplied description of one HTTP call
///
/// Headers keep their insertion order; a `None` value suppresses the header
/// (including a default one) instead of sending it empty.
///
/// # Example
///
/// ```ignore
/// let spec = RequestSpec::new("POST", "https://api.example.com/users")
///     .header("content-type", "application/json")
///     .without_header("accept-charset")
///     .data(fields)
///     .timeout_ms(5_000);
/// let resp = uhr.request(spec).await?;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestSpec {
    pub method: Option<String>,
    pub url: Option<String>,
    pub headers: Vec<(String, Option<String>)>,
    pub data: Option<RequestData>,
    /// Milliseconds; `0` means no limit
    pub timeout: Option<i64>,
}

impl RequestSpec {
    #[must_use]
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: Some(method.into()),
            url: Some(url.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), Some(value.into())));
        self
    }

    /// Suppress a header, default or previously set.
    #[must_use]
    pub fn without_header(mut self, name: impl Into<String>) -> Self {
        self.headers.push((name.into(), None));
        self
    }

    #[must_use]
    pub fn data(mut self, data: impl Into<RequestData>) -> Self {
        self.data = Some(data.into());
        self
    }

    #[must_use]
    pub fn timeout_ms(mut self, timeout: i64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Combine a fixed method and URL with per-call options.
    pub(crate) fn from_options(method: Method, url: &str, options: RequestOptions) -> Self {
        Self {
            method: Some(method.as_str().to_owned()),
            url: Some(url.to_owned()),
            headers: options.headers,
            data: options.data,
            timeout: options.timeout,
        }
    }
}

/// Build a [`RequestSpec`] from loosely typed JSON parameters.
///
/// Accepted shape:
/// `{"method": string, "url": string, "headers": {name: string|null},
///   "data": string|object|null, "timeout": integer}`.
impl TryFrom<Value> for RequestSpec {
    type Error = UhrError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(mut params) = value else {
            return Err(UhrError::validation(ValidationKind::ParametersRequired));
        };

        let method = match params.remove("method") {
            None | Some(Value::Null) => None,
            Some(Value::String(method)) => Some(method),
            Some(other) => {
                return Err(UhrError::validation_detail(
                    ValidationKind::MethodUnsupported,
                    other,
                ));
            }
        };

        let url = match params.remove("url") {
            None | Some(Value::Null) => None,
            Some(Value::String(url)) => Some(url),
            Some(other) => {
                return Err(UhrError::validation_detail(
                    ValidationKind::UrlInvalid,
                    other,
                ));
            }
        };

        let headers: Vec<(String, Option<String>)> = match params.remove("headers") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Object(headers)) => headers
                .into_iter()
                .map(|(name, value)| match value {
                    Value::Null => Ok((name, None)),
                    Value::String(value) => Ok((name, Some(value))),
                    Value::Number(n) => Ok((name, Some(n.to_string()))),
                    Value::Bool(b) => Ok((name, Some(b.to_string()))),
                    Value::Array(_) | Value::Object(_) => Err(UhrError::validation_detail(
                        ValidationKind::HeaderInvalid,
                        name,
                    )),
                })
                .collect::<Result<_, _>>()?,
            Some(_) => {
                return Err(UhrError::validation_detail(
                    ValidationKind::HeaderInvalid,
                    "headers must be an object",
                ));
            }
        };

        let data = match params.remove("data") {
            None | Some(Value::Null) => None,
            Some(data) => Some(RequestData::try_from(data)?),
        };

        let timeout = match params.remove("timeout") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => Some(n.as_i64().ok_or_else(|| {
                UhrError::validation_detail(ValidationKind::TimeoutInvalid, &n)
            })?),
            Some(other) => {
                return Err(UhrError::validation_detail(
                    ValidationKind::TimeoutInvalid,
                    other,
                ));
            }
        };

        Ok(Self {
            method,
            url,
            headers,
            data,
            timeout,
        })
    }
}

/// Per-call options for the convenience verbs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub headers: Vec<(String, Option<String>)>,
    pub data: Option<RequestData>,
    /// Milliseconds; `0` means no limit
    pub timeout: Option<i64>,
}

impl RequestOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), Some(value.into())));
        self
    }

    #[must_use]
    pub fn without_header(mut self, name: impl Into<String>) -> Self {
        self.headers.push((name.into(), None));
        self
    }

    #[must_use]
    pub fn data(mut self, data: impl Into<RequestData>) -> Self {
        self.data = Some(data.into());
        self
    }

    #[must_use]
    pub fn timeout_ms(mut self, timeout: i64) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
