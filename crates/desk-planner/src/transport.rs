//! Plan stream transports

use crate::decode::{self, Decoder, JsonLinesDecoder, SseDecoder};
use crate::error::{PlanError, Result};
use crate::types::{PlanOutcome, PlanRequest};
use async_trait::async_trait;
use desk_utils::DeskConfig;
use futures::stream::BoxStream;
use reqwest::header::ACCEPT;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Message payloads of one open plan stream, in arrival order
///
/// Dropping the stream closes the connection.
pub type MessageStream = BoxStream<'static, Result<String>>;

/// Opens plan streams
#[async_trait]
pub trait PlanTransport: Send + Sync {
    async fn open(&self, request: &PlanRequest) -> Result<MessageStream>;
}

/// Wire framing used by [`HttpPlanTransport`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamFraming {
    /// `GET /orchestrate/plan-sse` as server-sent events
    #[default]
    Sse,
    /// `POST /orchestrate/plan-stream` as newline-delimited JSON
    JsonLines,
}

/// Planner endpoints of the tradedesk backend
#[derive(Debug, Clone)]
pub struct HttpPlanTransport {
    client: Client,
    api_base: String,
    framing: StreamFraming,
    request_timeout: Option<Duration>,
}

impl HttpPlanTransport {
    pub fn new(api_base: &str) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            framing: StreamFraming::default(),
            request_timeout: None,
        }
    }

    /// Build from the shared desk configuration
    ///
    /// Streams get a connect timeout only; `run_plan` also gets the request timeout.
    pub fn from_config(config: &DeskConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder().connect_timeout(config.request_timeout()).build()?;
        Ok(Self {
            client,
            api_base: config.api_base().to_string(),
            framing: StreamFraming::default(),
            request_timeout: Some(config.request_timeout()),
        })
    }

    pub fn with_framing(mut self, framing: StreamFraming) -> Self {
        self.framing = framing;
        self
    }

    pub fn framing(&self) -> StreamFraming {
        self.framing
    }

    /// URL of the SSE endpoint for `request`
    pub fn sse_url(&self, request: &PlanRequest) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/orchestrate/plan-sse", self.api_base))?;
        url.query_pairs_mut().extend_pairs(request.query_pairs());
        Ok(url)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/orchestrate/{path}", self.api_base)
    }

    fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(PlanError::Api(format!("Planner API returned {}", status.as_u16())))
        }
    }

    /// Run a plan to completion without streaming
    pub async fn run_plan(&self, request: &PlanRequest) -> Result<PlanOutcome> {
        let request = request.normalized()?;
        let mut builder = self.client.post(self.endpoint("plan")).json(&request);
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }

        let response = Self::check_status(builder.send().await?)?;
        let outcome = response.json::<PlanOutcome>().await?;
        if outcome.final_answer.is_none() {
            return Err(PlanError::Incomplete);
        }
        Ok(outcome)
    }
}

#[async_trait]
impl PlanTransport for HttpPlanTransport {
    async fn open(&self, request: &PlanRequest) -> Result<MessageStream> {
        let (response, decoder) = match self.framing {
            StreamFraming::Sse => {
                let url = self.sse_url(request)?;
                debug!(%url, "opening plan SSE stream");
                let response = self.client.get(url).header(ACCEPT, "text/event-stream").send().await?;
                (response, Decoder::Sse(SseDecoder::new()))
            },
            StreamFraming::JsonLines => {
                let url = self.endpoint("plan-stream");
                debug!(%url, "opening plan JSON-lines stream");
                let response = self.client.post(url).json(request).send().await?;
                (response, Decoder::JsonLines(JsonLinesDecoder::new()))
            },
        };

        let response = Self::check_status(response)?;
        Ok(decode::frames(response.bytes_stream(), decoder))
    }
}
