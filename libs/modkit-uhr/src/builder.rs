use crate::client::Uhr;
use crate::config::{TlsRootConfig, UhrConfig};
use crate::error::UhrError;
use crate::prepare::{header_name, header_value};
use crate::tls;
use crate::transport::{TransportService, box_response};
use bytes::Bytes;
use http_body_util::Full;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Builder for [`Uhr`]
pub struct UhrBuilder {
    config: UhrConfig,
    transport: Option<TransportService>,
}

impl UhrBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(UhrConfig::default())
    }

    #[must_use]
    pub fn with_config(config: UhrConfig) -> Self {
        Self {
            config,
            transport: None,
        }
    }

    /// Timeout for calls that do not set their own
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.config.accept = accept.into();
        self
    }

    #[must_use]
    pub fn accept_charset(mut self, accept_charset: impl Into<String>) -> Self {
        self.config.accept_charset = accept_charset.into();
        self
    }

    /// Add a header sent on every call unless the call overrides or suppresses it
    #[must_use]
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    #[must_use]
    pub fn tls_roots(mut self, roots: TlsRootConfig) -> Self {
        self.config.tls_roots = roots;
        self
    }

    /// `None` keeps idle connections indefinitely
    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.pool_idle_timeout = timeout;
        self
    }

    /// `0` disables connection reuse
    #[must_use]
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.config.pool_max_idle_per_host = max;
        self
    }

    /// Replace the pooled hyper client with a custom transport.
    ///
    /// TLS and pool settings are ignored when a transport is supplied.
    #[must_use]
    pub fn transport(mut self, service: TransportService) -> Self {
        self.transport = Some(service);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    /// - `Validation` if a default header name or value is not valid HTTP
    /// - `Tls` if the requested root store cannot be loaded
    pub fn build(self) -> Result<Uhr, UhrError> {
        for (name, value) in self.config.default_headers() {
            header_value(&header_name(name)?, value)?;
        }

        let service = match self.transport {
            Some(service) => service,
            None => hyper_transport(&self.config)?,
        };

        Ok(Uhr {
            service,
            config: Arc::new(self.config),
        })
    }
}

impl Default for UhrBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Pooled hyper client over a rustls connector, boxed into the transport seam.
fn hyper_transport(config: &UhrConfig) -> Result<TransportService, UhrError> {
    let https = tls::https_connector(config.tls_roots)?;

    let mut client_builder = Client::builder(TokioExecutor::new());
    // pool_idle_timeout needs a timer to take effect
    client_builder
        .pool_timer(TokioTimer::new())
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .http2_only(false);
    if let Some(idle_timeout) = config.pool_idle_timeout {
        client_builder.pool_idle_timeout(idle_timeout);
    }
    let client = client_builder.build::<_, Full<Bytes>>(https);

    let service = client.map_response(box_response).map_err(UhrError::from);
    Ok(TransportService::new(service))
}
