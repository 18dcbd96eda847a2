use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Boxed error used as the underlying cause of transport failures.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Top-level classification of a failed call.
///
/// Every [`UhrError`] maps to exactly one kind. Callers branch on the kind
/// rather than on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Malformed or missing request parameters; never reaches the network
    Validation,
    /// URL scheme is not handled by the transport
    UnsupportedProtocol,
    /// Connection-level failure (reset, refused, premature close, bad encoding)
    Transport,
    /// No complete response within the configured timeout
    Timeout,
    /// Response body does not match its declared content type
    Decode,
}

impl ErrorKind {
    /// Stable identifier for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::UnsupportedProtocol => "unsupported_protocol",
            Self::Transport => "transport",
            Self::Timeout => "timeout",
            Self::Decode => "decode",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which request parameter failed validation.
///
/// # Example
///
/// ```ignore
/// match &err {
///     UhrError::Validation { kind: ValidationKind::HostRequired, .. } => { /* fix the URL */ }
///     UhrError::Validation { kind, .. } => println!("bad request: {kind}"),
///     _ => {}
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ValidationKind {
    /// Parameters are not an object/mapping
    ParametersRequired,
    /// No method given
    MethodRequired,
    /// Method is not one of the recognized verbs
    MethodUnsupported,
    /// No URL given
    UrlRequired,
    /// URL has no scheme (e.g. `//host/path`)
    SchemeRequired,
    /// URL has no host (e.g. `http:///path`)
    HostRequired,
    /// URL could not be assembled into a valid URI
    UrlInvalid,
    /// Timeout is not a non-negative integer
    TimeoutInvalid,
    /// Header name or value is not valid HTTP
    HeaderInvalid,
    /// Request data has an unsupported shape
    DataInvalid,
}

impl ValidationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ParametersRequired => "parameters required",
            Self::MethodRequired => "method required",
            Self::MethodUnsupported => "method unsupported",
            Self::UrlRequired => "url required",
            Self::SchemeRequired => "scheme required",
            Self::HostRequired => "host required",
            Self::UrlInvalid => "url invalid",
            Self::TimeoutInvalid => "timeout invalid",
            Self::HeaderInvalid => "header invalid",
            Self::DataInvalid => "data invalid",
        }
    }
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Native diagnostic code of a transport failure.
///
/// Codes follow the libc errno names where one exists (`ECONNRESET`, ...),
/// so callers can branch on the same identifiers the OS reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum TransportCode {
    /// Peer reset the connection or closed it before the response completed
    ConnectionReset,
    /// Nothing listening on the target address
    ConnectionRefused,
    /// Connection aborted locally
    ConnectionAborted,
    /// Write to a closed socket
    BrokenPipe,
    /// Socket-level timeout reported by the OS
    TimedOut,
    /// Host name could not be resolved or the address is unavailable
    AddressUnavailable,
    /// Connection could not be established for another reason
    ConnectFailed,
    /// Response body could not be decompressed
    Decompression,
    /// Anything else
    Other,
}

impl TransportCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConnectionReset => "ECONNRESET",
            Self::ConnectionRefused => "ECONNREFUSED",
            Self::ConnectionAborted => "ECONNABORTED",
            Self::BrokenPipe => "EPIPE",
            Self::TimedOut => "ETIMEDOUT",
            Self::AddressUnavailable => "EADDRNOTAVAIL",
            Self::ConnectFailed => "ECONNECT",
            Self::Decompression => "Z_DATA_ERROR",
            Self::Other => "EUNKNOWN",
        }
    }

    fn from_io_kind(kind: std::io::ErrorKind) -> Option<Self> {
        use std::io::ErrorKind as Io;
        let code = match kind {
            Io::ConnectionReset | Io::UnexpectedEof => Self::ConnectionReset,
            Io::ConnectionRefused => Self::ConnectionRefused,
            Io::ConnectionAborted => Self::ConnectionAborted,
            Io::BrokenPipe => Self::BrokenPipe,
            Io::TimedOut => Self::TimedOut,
            Io::AddrNotAvailable => Self::AddressUnavailable,
            _ => return None,
        };
        Some(code)
    }
}

impl fmt::Display for TransportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified HTTP request error
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum UhrError {
    /// Request parameters failed validation
    ///
    /// The `reason` field is a diagnostic message; match on `kind` instead.
    #[error("Invalid request: {reason}")]
    Validation {
        kind: ValidationKind,
        reason: String,
    },

    /// URL scheme is neither `http` nor `https`
    #[error("Protocol is unsupported: '{scheme}'")]
    UnsupportedProtocol { scheme: String },

    /// Socket-level failure
    #[error("Transport error ({code}): {source}")]
    Transport {
        code: TransportCode,
        /// Raw OS error number, when the failure came from the socket
        os_code: Option<i32>,
        #[source]
        source: BoxError,
    },

    /// No complete response before the deadline
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Response body exceeded the configured limit (raw or decompressed)
    #[error("Response body too large: limit {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// Response body is not valid for its declared content type
    #[error("Failed to decode '{content_type}' response body: {source}")]
    Decode {
        content_type: String,
        #[source]
        source: serde_json::Error,
    },

    /// TLS initialization failed while building the client
    #[error("TLS error: {0}")]
    Tls(#[source] BoxError),
}

impl UhrError {
    pub(crate) fn validation(kind: ValidationKind) -> Self {
        Self::Validation {
            kind,
            reason: kind.as_str().to_owned(),
        }
    }

    pub(crate) fn validation_detail(kind: ValidationKind, detail: impl fmt::Display) -> Self {
        Self::Validation {
            kind,
            reason: format!("{kind}: {detail}"),
        }
    }

    /// Build a transport error, deriving its diagnostic code from the cause chain.
    pub(crate) fn transport(source: BoxError) -> Self {
        let (code, os_code) = classify(source.as_ref());
        Self::Transport {
            code,
            os_code,
            source,
        }
    }

    pub(crate) fn decompression(source: std::io::Error) -> Self {
        Self::Transport {
            code: TransportCode::Decompression,
            os_code: None,
            source: Box::new(source),
        }
    }

    /// Classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::UnsupportedProtocol { .. } => ErrorKind::UnsupportedProtocol,
            Self::Transport { .. } | Self::BodyTooLarge { .. } | Self::Tls(_) => {
                ErrorKind::Transport
            }
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Decode { .. } => ErrorKind::Decode,
        }
    }

    /// Transport diagnostic code, if this is a transport failure.
    #[must_use]
    pub fn code(&self) -> Option<TransportCode> {
        match self {
            Self::Transport { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Raw OS error number preserved from the socket, if any.
    #[must_use]
    pub fn os_code(&self) -> Option<i32> {
        match self {
            Self::Transport { os_code, .. } => *os_code,
            _ => None,
        }
    }
}

impl From<hyper::Error> for UhrError {
    fn from(err: hyper::Error) -> Self {
        UhrError::transport(Box::new(err))
    }
}

impl From<hyper_util::client::legacy::Error> for UhrError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        UhrError::transport(Box::new(err))
    }
}

/// Walk the cause chain looking for the most specific diagnostic.
///
/// An `io::Error` anywhere in the chain wins. A hyper "incomplete message"
/// (peer closed before the response completed) is reported as a reset, and a
/// failed connect with no socket detail becomes `ConnectFailed`.
fn classify(err: &(dyn StdError + 'static)) -> (TransportCode, Option<i32>) {
    let mut fallback = TransportCode::Other;
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);

    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if let Some(code) = TransportCode::from_io_kind(io.kind()) {
                return (code, io.raw_os_error());
            }
            if io.raw_os_error().is_some() {
                return (fallback, io.raw_os_error());
            }
        }
        if let Some(hyper_err) = e.downcast_ref::<hyper::Error>()
            && (hyper_err.is_incomplete_message() || hyper_err.is_canceled())
        {
            fallback = TransportCode::ConnectionReset;
        }
        if let Some(client_err) = e.downcast_ref::<hyper_util::client::legacy::Error>()
            && client_err.is_connect()
            && fallback == TransportCode::Other
        {
            fallback = TransportCode::ConnectFailed;
        }
        current = e.source();
    }

    (fallback, None)
}
