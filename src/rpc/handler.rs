//! Innermost layer: protocol conformance and dispatch.
//!
//! # Responsibilities
//! - Answer bare `GET` liveness probes
//! - Reject disallowed methods, oversized bodies and non-JSON payloads
//! - Hand the capped body and the response writer to the dispatcher
//!
//! # Design Decisions
//! - The dispatcher runs in its own task and streams into the response body
//! - The body reader is capped even when `Content-Length` lies or is absent
//! - The stream is shut down on every exit path of the dispatcher task

use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, HttpBody as _},
    extract::State,
    http::{header, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::TryStreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::{ReaderStream, StreamReader};

use crate::observability::{Gate, SharedObserver};
use crate::rpc::stream::{InvocationMode, RpcDispatcher, RpcStream};
use crate::security::identity::request_client_ip;

/// Only accepted request media type; also set on every dispatched response.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Largest request body accepted, in bytes.
pub const MAX_REQUEST_CONTENT_LENGTH: u64 = 128 * 1024;

/// In-flight response bytes buffered between dispatcher and client.
const RESPONSE_BUFFER: usize = 64 * 1024;

/// State for the base RPC handler.
#[derive(Clone)]
pub struct RpcState {
    pub dispatcher: Arc<dyn RpcDispatcher>,
    pub behind_reverse_proxy: bool,
    pub observer: SharedObserver,
    /// Upper bound on one dispatch, including streaming the response.
    pub request_timeout: Duration,
}

/// A conformance failure, rendered as a plain-text error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

/// Body length as declared by `Content-Length`, or known from the body itself.
pub fn declared_content_length(request: &Request<Body>) -> Option<u64> {
    request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .or_else(|| request.body().size_hint().exact())
}

/// Empty `GET` without a query string, as sent by load balancer health checks.
pub fn is_liveness_probe(request: &Request<Body>) -> bool {
    request.method() == Method::GET
        && declared_content_length(request) == Some(0)
        && request.uri().query().map_or(true, str::is_empty)
}

/// Essence (`type/subtype`) of a `Content-Type` value, lower-cased.
///
/// `None` unless the whole value, parameters included, is a valid media type.
fn media_type(value: &HeaderValue) -> Option<String> {
    let parsed: mime::Mime = value.to_str().ok()?.parse().ok()?;
    if parsed.subtype().as_str().is_empty() {
        return None;
    }
    Some(parsed.essence_str().to_ascii_lowercase())
}

/// Check method, size and content type, in that order.
pub fn validate_request(request: &Request<Body>) -> Result<(), Rejection> {
    let method = request.method();
    if method == Method::PUT || method == Method::DELETE {
        return Err(Rejection {
            status: StatusCode::METHOD_NOT_ALLOWED,
            message: "method not allowed".to_string(),
        });
    }

    if let Some(length) = declared_content_length(request) {
        if length > MAX_REQUEST_CONTENT_LENGTH {
            return Err(Rejection {
                status: StatusCode::PAYLOAD_TOO_LARGE,
                message: format!(
                    "content length too large ({}>{})",
                    length, MAX_REQUEST_CONTENT_LENGTH
                ),
            });
        }
    }

    if method != Method::OPTIONS {
        let media = request.headers().get(header::CONTENT_TYPE).and_then(media_type);
        if media.as_deref() != Some(CONTENT_TYPE_JSON) {
            return Err(Rejection {
                status: StatusCode::UNSUPPORTED_MEDIA_TYPE,
                message: format!("invalid content type, only {} is supported", CONTENT_TYPE_JSON),
            });
        }
    }

    Ok(())
}

/// Base handler behind all admission gates.
pub async fn rpc_handler(State(state): State<RpcState>, request: Request<Body>) -> Response {
    if is_liveness_probe(&request) {
        return StatusCode::OK.into_response();
    }

    let client = request_client_ip(&request, state.behind_reverse_proxy);
    tracing::debug!(
        client = ?client,
        method = %request.method(),
        path = %request.uri().path(),
        host = ?request.headers().get(header::HOST),
        user_agent = ?request.headers().get(header::USER_AGENT),
        size = ?declared_content_length(&request),
        "Handling RPC request"
    );

    if let Err(rejection) = validate_request(&request) {
        state.observer.denied(Gate::Protocol, client, &rejection.message);
        return rejection.into_response();
    }
    state.observer.granted(Gate::Protocol, client);

    let body = request
        .into_body()
        .into_data_stream()
        .map_err(io::Error::other);
    let reader = StreamReader::new(body).take(MAX_REQUEST_CONTENT_LENGTH);
    let (writer, response_reader) = tokio::io::duplex(RESPONSE_BUFFER);
    let stream = RpcStream::new(Box::pin(reader), writer);

    tokio::spawn(dispatch(state.dispatcher.clone(), stream, state.request_timeout));

    (
        [(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON))],
        Body::from_stream(ReaderStream::new(response_reader)),
    )
        .into_response()
}

/// Run one request through the dispatcher and close the stream afterwards.
async fn dispatch(dispatcher: Arc<dyn RpcDispatcher>, mut stream: RpcStream, limit: Duration) {
    let served = tokio::time::timeout(
        limit,
        dispatcher.serve_single_request(&mut stream, InvocationMode::MethodInvocation),
    )
    .await;
    match served {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "RPC dispatch failed"),
        Err(_) => tracing::warn!(timeout_secs = limit.as_secs_f64(), "RPC dispatch timed out"),
    }
    if let Err(e) = stream.shutdown().await {
        tracing::debug!(error = %e, "Response stream already closed");
    }
}
