use crate::error::{BoxError, UhrError};
use crate::prepare::PreparedRequest;
use bytes::Bytes;
use http::{HeaderMap, Request, Response, StatusCode};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Collected, Full, LengthLimitError, Limited};
use std::future::Future;
use std::pin::Pin;
use tower::ServiceExt;
use tower::util::BoxCloneSyncService;

/// Type-erased response body produced by the transport.
pub type ResponseBody = BoxBody<Bytes, BoxError>;

/// The transport seam: any `tower` service that turns a request into a
/// streamed response.
///
/// The default is the pooled hyper client built by [`UhrBuilder`]; tests
/// swap in a mock service.
///
/// [`UhrBuilder`]: crate::UhrBuilder
pub type TransportService =
    BoxCloneSyncService<Request<Full<Bytes>>, Response<ResponseBody>, UhrError>;

/// Status, headers and the complete raw body of one exchange
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Run one exchange to completion.
///
/// The deadline covers connecting, sending, and receiving the whole body.
/// When it fires the in-flight future is dropped, which aborts the
/// connection.
///
/// # Errors
/// - `Transport` for socket failures, with the native code preserved
/// - `Timeout` when the deadline passes first
/// - `BodyTooLarge` when the received body exceeds `max_body_size`
pub async fn execute(
    service: TransportService,
    prepared: PreparedRequest,
    max_body_size: usize,
) -> Result<RawResponse, UhrError> {
    let timeout = prepared.timeout();
    let in_flight = exchange(service, prepared.into_http_request(), max_body_size);

    match timeout {
        Some(limit) => tokio::time::timeout(limit, in_flight)
            .await
            .map_err(|_| UhrError::Timeout(limit))?,
        None => in_flight.await,
    }
}

async fn exchange(
    service: TransportService,
    request: Request<Full<Bytes>>,
    max_body_size: usize,
) -> Result<RawResponse, UhrError> {
    let response = service.oneshot(request).await?;
    let (parts, body) = response.into_parts();

    // Boxed as `dyn Future + Send` so the enclosing future stays provably
    // `Send` (works around rustc's higher-ranked lifetime erasure).
    let collect: Pin<Box<dyn Future<Output = Result<Collected<Bytes>, BoxError>> + Send>> =
        Box::pin(Limited::new(body, max_body_size).collect());
    let body = collect
        .await
        .map_err(|e: BoxError| {
            if e.is::<LengthLimitError>() {
                UhrError::BodyTooLarge {
                    limit: max_body_size,
                }
            } else {
                UhrError::transport(e)
            }
        })?
        .to_bytes();

    Ok(RawResponse {
        status: parts.status,
        headers: parts.headers,
        body,
    })
}

/// Box a concrete response body into [`ResponseBody`].
pub(crate) fn box_response<B>(response: Response<B>) -> Response<ResponseBody>
where
    B: hyper::body::Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<BoxError>,
{
    let (parts, body) = response.into_parts();
    Response::from_parts(parts, body.map_err(Into::into).boxed())
}
