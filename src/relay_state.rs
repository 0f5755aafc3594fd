use std::pin::Pin;

use anyhow::Context;
use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::config::RelayConfig;
use crate::io_struct::{ChatRequest, UpstreamRequest, build_outbound_messages};
use crate::sse::DeltaDecoder;

/// Fixed sampling temperature for every upstream call.
pub const TEMPERATURE: f32 = 0.3;

pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<Bytes, actix_web::Error>>>>;

/// What came back from the upstream call. The server layer turns this into
/// the HTTP response; transport-level failures propagate as errors and
/// surface as the generic server error instead.
pub enum RelayOutcome {
    /// Upstream accepted the request; relay its deltas as they arrive.
    Stream(DeltaStream),
    /// Upstream rejected the request; its raw error payload, verbatim.
    UpstreamError { detail: String },
}

#[derive(Debug, Clone)]
pub struct RelayState {
    pub config: RelayConfig,
    pub client: reqwest::Client,
}

impl RelayState {
    pub fn new(config: RelayConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()?;
        Ok(Self { config, client })
    }

    /// Issue the single streaming completion call. The returned stream owns
    /// the upstream body reader, so dropping the response (caller
    /// disconnect included) releases the upstream connection.
    pub async fn open_stream(&self, request: ChatRequest) -> anyhow::Result<RelayOutcome> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .context("upstream credential not configured")?;
        let payload = UpstreamRequest {
            model: &self.config.model,
            messages: build_outbound_messages(request.messages),
            temperature: TEMPERATURE,
            stream: true,
        };

        let upstream = self
            .client
            .post(&self.config.upstream_url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .context("upstream request failed")?;

        if !upstream.status().is_success() {
            let detail = upstream
                .text()
                .await
                .context("failed to read upstream error payload")?;
            return Ok(RelayOutcome::UpstreamError { detail });
        }

        let mut decoder = DeltaDecoder::new();
        let deltas = upstream.bytes_stream().filter_map(move |chunk| {
            let item = match chunk {
                Ok(bytes) => {
                    let text = decoder.feed(&bytes);
                    if text.is_empty() {
                        None
                    } else {
                        Some(Ok(Bytes::from(text)))
                    }
                }
                Err(e) => Some(Err(actix_web::error::ErrorBadGateway(e))),
            };
            futures::future::ready(item)
        });
        Ok(RelayOutcome::Stream(Box::pin(deltas)))
    }
}
