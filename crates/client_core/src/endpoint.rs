//! Outbound call to the agent service and classification of its reply.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared::{
    domain::AgentId,
    error::QueryError,
    protocol::{ErrorBody, QueryRequest, QueryResult},
};
use url::Url;

use crate::config::{Settings, SettingsError};

pub const UNEXPECTED_RESPONSE_MESSAGE: &str = "Agent returned an unexpected response.";

#[async_trait]
pub trait AgentEndpoint: Send + Sync {
    fn agent_id(&self) -> AgentId;

    /// Performs exactly one request. Every failure comes back as a
    /// transport or domain `QueryError`.
    async fn query(&self, token: &str, request: &QueryRequest) -> Result<QueryResult, QueryError>;
}

pub struct HttpAgentEndpoint {
    http: Client,
    base_url: Url,
    agent_id: AgentId,
}

impl HttpAgentEndpoint {
    pub fn new(base_url: Url, agent_id: AgentId, timeout: Duration) -> Result<Self, SettingsError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| SettingsError::HttpClient(err.to_string()))?;
        Ok(Self {
            http,
            base_url,
            agent_id,
        })
    }

    /// Returns `Ok(None)` when no API URL is configured.
    pub fn from_settings(
        settings: &Settings,
        agent_id: AgentId,
    ) -> Result<Option<Self>, SettingsError> {
        let Some(base_url) = settings.api_base_url()? else {
            return Ok(None);
        };
        Self::new(base_url, agent_id, settings.request_timeout()).map(Some)
    }

    pub fn query_url(&self) -> String {
        format!(
            "{}/agents/{}/query",
            self.base_url.as_str().trim_end_matches('/'),
            self.agent_id
        )
    }
}

#[async_trait]
impl AgentEndpoint for HttpAgentEndpoint {
    fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    async fn query(&self, token: &str, request: &QueryRequest) -> Result<QueryResult, QueryError> {
        let response = self
            .http
            .post(self.query_url())
            .bearer_auth(token)
            .json(request)
            .send()
            .await
            .map_err(|err| transport_error(&err))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| transport_error(&err).with_status(status.as_u16()))?;

        classify_response(status, &body)
    }
}

fn transport_error(err: &reqwest::Error) -> QueryError {
    if err.is_timeout() {
        QueryError::transport("Request to the agent timed out.")
    } else if err.is_connect() {
        QueryError::transport(format!("Failed to reach the agent service: {err}"))
    } else {
        QueryError::transport(format!("Failed to get a response from the agent: {err}"))
    }
}

/// Maps a received status and body onto the query outcome.
pub fn classify_response(status: StatusCode, body: &[u8]) -> Result<QueryResult, QueryError> {
    let code = status.as_u16();

    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|body| body.message)
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| format!("Request failed with status {code}"));
        return Err(QueryError::domain(code, message));
    }

    let value: serde_json::Value = serde_json::from_slice(body).map_err(|err| {
        QueryError::transport(format!("Agent returned a malformed response body: {err}"))
            .with_status(code)
    })?;

    serde_json::from_value::<QueryResult>(value)
        .map_err(|_| QueryError::domain(code, UNEXPECTED_RESPONSE_MESSAGE))
}

#[cfg(test)]
#[path = "tests/endpoint_tests.rs"]
mod tests;
