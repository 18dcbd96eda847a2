use crate::builder::UhrBuilder;
use crate::config::UhrConfig;
use crate::error::UhrError;
use crate::prepare::prepare;
use crate::request::{Method, RequestOptions, RequestSpec};
use crate::response::UhrResponse;
use crate::transport::{TransportService, execute};
use std::fmt;
use std::sync::Arc;

/// Unified HTTP request client
///
/// Validates a [`RequestSpec`], encodes its data, performs the exchange and
/// decodes the body by content type. Any received status resolves to
/// [`UhrResponse`]; only validation, transport, timeout and decoding
/// failures are errors.
///
/// # Thread Safety
///
/// `Uhr` is `Clone + Send + Sync`. Clones share the connection pool and the
/// read-only configuration; calls never share mutable state.
///
/// # Example
///
/// ```ignore
/// let uhr = Uhr::builder().timeout(Duration::from_secs(5)).build()?;
///
/// let resp = uhr
///     .post(
///         "https://api.example.com/users",
///         RequestOptions::new()
///             .header("content-type", "application/json")
///             .data(fields),
///     )
///     .await?;
///
/// if resp.status.is_success() {
///     let user: User = resp.json()?;
/// }
/// ```
#[derive(Clone)]
pub struct Uhr {
    pub(crate) service: TransportService,
    pub(crate) config: Arc<UhrConfig>,
}

impl fmt::Debug for Uhr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Uhr")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Uhr {
    /// Client with the default configuration.
    ///
    /// # Errors
    /// Returns an error if TLS initialization fails
    pub fn new() -> Result<Self, UhrError> {
        UhrBuilder::new().build()
    }

    #[must_use]
    pub fn builder() -> UhrBuilder {
        UhrBuilder::new()
    }

    #[must_use]
    pub fn config(&self) -> &UhrConfig {
        &self.config
    }

    /// Perform one call.
    ///
    /// # Errors
    /// - `Validation` / `UnsupportedProtocol` before any network activity
    /// - `Transport` for socket failures (see [`UhrError::code`])
    /// - `Timeout` when the call outlives its timeout
    /// - `Decode` when the body does not match its content type
    pub async fn request(&self, spec: RequestSpec) -> Result<UhrResponse, UhrError> {
        let prepared = prepare(&spec, &self.config).inspect_err(|e| {
            tracing::debug!(error = %e, "request rejected before sending");
        })?;

        let method = prepared.method();
        let uri = prepared.uri().clone();
        tracing::debug!(method = %method, url = %uri, "sending request");

        let max_body_size = self.config.max_body_size;
        let result = execute(self.service.clone(), prepared, max_body_size)
            .await
            .and_then(|raw| UhrResponse::from_raw(raw, max_body_size));

        match &result {
            Ok(response) => tracing::debug!(
                method = %method,
                url = %uri,
                status = response.status.code,
                "request completed"
            ),
            Err(e) => tracing::warn!(
                method = %method,
                url = %uri,
                kind = %e.kind(),
                error = %e,
                "request failed"
            ),
        }
        result
    }

    /// # Errors
    /// See [`Uhr::request`].
    pub async fn get(&self, url: &str, options: RequestOptions) -> Result<UhrResponse, UhrError> {
        self.request(RequestSpec::from_options(Method::Get, url, options))
            .await
    }

    /// # Errors
    /// See [`Uhr::request`].
    pub async fn post(&self, url: &str, options: RequestOptions) -> Result<UhrResponse, UhrError> {
        self.request(RequestSpec::from_options(Method::Post, url, options))
            .await
    }

    /// # Errors
    /// See [`Uhr::request`].
    pub async fn put(&self, url: &str, options: RequestOptions) -> Result<UhrResponse, UhrError> {
        self.request(RequestSpec::from_options(Method::Put, url, options))
            .await
    }

    /// # Errors
    /// See [`Uhr::request`].
    pub async fn patch(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<UhrResponse, UhrError> {
        self.request(RequestSpec::from_options(Method::Patch, url, options))
            .await
    }

    /// # Errors
    /// See [`Uhr::request`].
    pub async fn delete(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<UhrResponse, UhrError> {
        self.request(RequestSpec::from_options(Method::Delete, url, options))
            .await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::codec::Content;
    use crate::error::{ErrorKind, ValidationKind};
    use crate::request::RequestData;
    use flate2::Compression;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use httpmock::prelude::*;
    use serde_json::{Value, json};
    use std::io::Write;
    use std::time::Duration;

    fn test_client() -> Uhr {
        UhrBuilder::with_config(UhrConfig::for_testing())
            .build()
            .unwrap()
    }

    fn fields(value: Value) -> RequestData {
        RequestData::try_from(value).unwrap()
    }

    #[tokio::test]
    async fn test_get_text() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/page")
                .header_exists("accept")
                .header_exists("user-agent")
                .header("accept-charset", "UTF-8");
            then.status(200)
                .header("content-type", "text/plain")
                .body("test");
        });

        let resp = test_client()
            .get(&server.url("/page"), RequestOptions::new())
            .await
            .unwrap();

        mock.assert();
        assert_eq!(resp.status.code, 200);
        assert_eq!(resp.status.text, "OK");
        assert_eq!(resp.content, Content::Text("test".to_owned()));
    }

    #[tokio::test]
    async fn test_get_data_goes_to_query() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/page")
                .query_param("a", "1")
                .query_param("field", "test")
                .query_param("field2", "true");
            then.status(200);
        });

        let resp = test_client()
            .get(
                &server.url("/page?a=1"),
                RequestOptions::new().data(fields(json!({"field": "test", "field2": true}))),
            )
            .await
            .unwrap();

        mock.assert();
        assert!(resp.content.is_empty());
    }

    #[tokio::test]
    async fn test_delete_data_goes_to_query() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(DELETE)
                .path("/item")
                .query_param("id", "42")
                .header_missing("content-type");
            then.status(204);
        });

        let resp = test_client()
            .delete(
                &server.url("/item"),
                RequestOptions::new().data(fields(json!({"id": 42}))),
            )
            .await
            .unwrap();

        mock.assert();
        assert_eq!(resp.status.code, 204);
    }

    #[tokio::test]
    async fn test_post_form_roundtrip() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/form")
                .header(
                    "content-type",
                    "application/x-www-form-urlencoded; charset=UTF-8",
                )
                .body("boolean=true&test=hello+world&test2=100500");
            then.status(200)
                .header("content-type", "application/x-www-form-urlencoded")
                .body("boolean=true&test=hello+world&test2=100500");
        });

        let resp = test_client()
            .post(
                &server.url("/form"),
                RequestOptions::new().data(fields(json!({
                    "test": "hello world",
                    "test2": 100_500,
                    "boolean": true
                }))),
            )
            .await
            .unwrap();

        mock.assert();
        let form = resp.content.as_form().unwrap();
        assert_eq!(form["test"], "hello world");
        assert_eq!(form["test2"], "100500");
        assert_eq!(form["boolean"], "true");
    }

    #[tokio::test]
    async fn test_put_json_roundtrip() {
        let payload = json!({"test": "hello world", "test2": 100_500, "boolean": true});
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/json")
                .header("content-type", "application/json")
                .json_body(payload.clone());
            then.status(200).json_body(payload.clone());
        });

        let resp = test_client()
            .put(
                &server.url("/json"),
                RequestOptions::new()
                    .header("Content-Type", "application/json")
                    .data(fields(payload.clone())),
            )
            .await
            .unwrap();

        mock.assert();
        assert_eq!(resp.content, Content::Json(payload));
    }

    #[tokio::test]
    async fn test_patch_text_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(PATCH)
                .path("/text")
                .header("content-type", "text/plain; charset=UTF-8")
                .body("test entity text");
            then.status(200).body("ok");
        });

        let resp = test_client()
            .patch(
                &server.url("/text"),
                RequestOptions::new().data("test entity text"),
            )
            .await
            .unwrap();

        mock.assert();
        assert_eq!(resp.content.as_text(), Some("ok"));
    }

    #[tokio::test]
    async fn test_null_header_suppresses_default() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/headers")
                .header_missing("accept-charset")
                .header_exists("accept")
                .header_exists("user-agent")
                .header_exists("host");
            then.status(200);
        });

        test_client()
            .get(
                &server.url("/headers"),
                RequestOptions::new().without_header("Accept-Charset"),
            )
            .await
            .unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn test_gzip_response() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"test gzip").unwrap();
        let compressed = encoder.finish().unwrap();

        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/gzip");
            then.status(200)
                .header("content-type", "text/plain")
                .header("content-encoding", "gzip")
                .body(compressed);
        });

        let resp = test_client()
            .get(&server.url("/gzip"), RequestOptions::new())
            .await
            .unwrap();
        assert_eq!(resp.content.as_text(), Some("test gzip"));
    }

    #[tokio::test]
    async fn test_deflate_response() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"test inflate").unwrap();
        let compressed = encoder.finish().unwrap();

        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/deflate");
            then.status(200)
                .header("content-type", "text/plain")
                .header("content-encoding", "deflate")
                .body(compressed);
        });

        let resp = test_client()
            .get(&server.url("/deflate"), RequestOptions::new())
            .await
            .unwrap();
        assert_eq!(resp.content.as_text(), Some("test inflate"));
    }

    #[tokio::test]
    async fn test_error_status_resolves() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/bad");
            then.status(400)
                .header("content-type", "text/plain")
                .body("Error: Bad Request");
        });

        let resp = test_client()
            .get(&server.url("/bad"), RequestOptions::new())
            .await
            .unwrap();
        assert_eq!(resp.status.code, 400);
        assert_eq!(resp.status.text, "Bad Request");
        assert_eq!(resp.content.as_text(), Some("Error: Bad Request"));
    }

    #[tokio::test]
    async fn test_redirect_not_followed() {
        let server = MockServer::start();
        let target = server.mock(|when, then| {
            when.method(GET).path("/target");
            then.status(200);
        });
        server.mock(|when, then| {
            when.method(GET).path("/moved");
            then.status(302).header("location", "/target");
        });

        let resp = test_client()
            .get(&server.url("/moved"), RequestOptions::new())
            .await
            .unwrap();
        assert_eq!(resp.status.code, 302);
        assert_eq!(resp.header("location"), Some("/target"));
        assert_eq!(target.calls(), 0);
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/slow");
            then.status(200).delay(Duration::from_secs(2)).body("late");
        });

        let err = test_client()
            .get(&server.url("/slow"), RequestOptions::new().timeout_ms(100))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_body_limit() {
        let server = MockServer::start();
        let large_body = "x".repeat(64 * 1024);
        server.mock(|when, then| {
            when.method(GET).path("/large");
            then.status(200).body(&large_body);
        });

        let client = UhrBuilder::with_config(UhrConfig::for_testing())
            .max_body_size(1024)
            .build()
            .unwrap();
        let err = client
            .get(&server.url("/large"), RequestOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, UhrError::BodyTooLarge { limit: 1024 }));
    }

    #[tokio::test]
    async fn test_unsupported_protocol_never_connects() {
        let err = test_client()
            .get("ftp://localhost:21/file", RequestOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedProtocol);
    }

    #[tokio::test]
    async fn test_validation_before_network() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.any_request();
            then.status(200);
        });

        let err = test_client()
            .request(RequestSpec::new("WRONG", server.url("/page")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            UhrError::Validation {
                kind: ValidationKind::MethodUnsupported,
                ..
            }
        ));

        let err = test_client()
            .request(RequestSpec::new("GET", server.url("/page")).timeout_ms(-5))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_request_from_json_params() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/params")
                .header_missing("accept-charset")
                .body("field=value");
            then.status(201);
        });

        let spec = RequestSpec::try_from(json!({
            "method": "post",
            "url": server.url("/params"),
            "headers": {"Accept-Charset": null},
            "data": {"field": "value"},
            "timeout": 5000
        }))
        .unwrap();
        let resp = test_client().request(spec).await.unwrap();

        mock.assert();
        assert_eq!(resp.status.code, 201);
    }

    #[tokio::test]
    async fn test_client_default_header() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/tenant").header("x-tenant", "t1");
            then.status(200);
        });

        let client = UhrBuilder::with_config(UhrConfig::for_testing())
            .default_header("X-Tenant", "t1")
            .build()
            .unwrap();
        client
            .get(&server.url("/tenant"), RequestOptions::new())
            .await
            .unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = test_client()
            .get(&format!("http://127.0.0.1:{port}/"), RequestOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.code().is_some());
    }

    #[tokio::test]
    async fn test_client_is_clone_and_concurrent() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/concurrent");
            then.status(200).body("ok");
        });

        let client = test_client();
        let url = server.url("/concurrent");
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let client = client.clone();
                let url = url.clone();
                tokio::spawn(async move { client.get(&url, RequestOptions::new()).await })
            })
            .collect();

        for handle in handles {
            let resp = handle.await.unwrap().unwrap();
            assert_eq!(resp.content.as_text(), Some("ok"));
        }
        assert_eq!(mock.calls(), 10);
    }
}
