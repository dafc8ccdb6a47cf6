//! Dispatcher that relays admitted requests to the node's internal endpoint.

use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request, Uri},
};
use futures_util::TryStreamExt;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::config::UpstreamConfig;
use crate::rpc::handler::CONTENT_TYPE_JSON;
use crate::rpc::stream::{DispatchError, InvocationMode, RpcDispatcher, RpcStream};
use crate::rpc::BuildError;

/// Forwards one JSON-RPC payload per call and streams the reply back.
pub struct ForwardingDispatcher {
    client: Client<HttpConnector, Body>,
    upstream: Uri,
    timeout: Duration,
}

impl ForwardingDispatcher {
    pub fn new(config: &UpstreamConfig) -> Result<Self, BuildError> {
        let upstream: Uri = config.url.parse()?;
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Ok(Self {
            client,
            upstream,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    async fn forward(&self, stream: &mut RpcStream) -> Result<(), DispatchError> {
        let mut payload = Vec::new();
        stream.read_to_end(&mut payload).await?;

        let request = Request::builder()
            .method(Method::POST)
            .uri(self.upstream.clone())
            .header(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON))
            .body(Body::from(payload))
            .map_err(|e| DispatchError::Upstream(e.to_string()))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| DispatchError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(upstream = %self.upstream, status = %status, "Upstream returned error status");
        }

        let mut body = Body::new(response.into_body()).into_data_stream();
        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| DispatchError::Upstream(e.to_string()))?
        {
            stream.write_all(&chunk).await?;
        }
        stream.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl RpcDispatcher for ForwardingDispatcher {
    async fn serve_single_request(
        &self,
        stream: &mut RpcStream,
        _mode: InvocationMode,
    ) -> Result<(), DispatchError> {
        tokio::time::timeout(self.timeout, self.forward(stream))
            .await
            .map_err(|_| DispatchError::Timeout)?
    }
}
