//! Query session controller: owns the query, loading flag and outcome, and
//! runs one agent request at a time.

use std::sync::{Arc, Weak};

use shared::{
    error::{ErrorKind, QueryError},
    protocol::{QueryRequest, QueryResult},
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{endpoint::AgentEndpoint, session::SessionProvider};

pub const EMPTY_QUERY_MESSAGE: &str = "Please enter a query.";
pub const AUTH_REQUIRED_MESSAGE: &str = "Authentication required.";
pub const API_URL_MISSING_MESSAGE: &str = "API URL is not configured.";

const EVENT_CAPACITY: usize = 64;

/// At most one of `result`/`error` is set, and neither while `is_loading`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerState {
    pub query: String,
    pub is_loading: bool,
    pub result: Option<QueryResult>,
    pub error: Option<QueryError>,
}

impl ControllerState {
    pub fn status(&self) -> SubmissionStatus {
        if self.is_loading {
            SubmissionStatus::Submitting
        } else if self.error.is_some() {
            SubmissionStatus::Error
        } else if self.result.is_some() {
            SubmissionStatus::Success
        } else {
            SubmissionStatus::Idle
        }
    }

    fn start(&mut self) {
        self.is_loading = true;
        self.result = None;
        self.error = None;
    }

    fn succeed(&mut self, result: QueryResult) {
        self.is_loading = false;
        self.result = Some(result);
        self.error = None;
    }

    fn fail(&mut self, error: QueryError) {
        self.is_loading = false;
        self.result = None;
        self.error = Some(error);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Idle,
    Submitting,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    InFlight,
    SessionLoading,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Completed,
    Failed(ErrorKind),
    Skipped(SkipReason),
    /// A reply arrived after the controller was closed or dropped.
    Discarded,
}

#[derive(Debug, Clone)]
pub enum ControllerEvent {
    SubmissionStarted { query: String },
    SubmissionFinished { outcome: SubmitOutcome },
}

struct ControllerInner {
    state: ControllerState,
    closed: bool,
}

struct Submission {
    endpoint: Arc<dyn AgentEndpoint>,
    token: String,
    request: QueryRequest,
}

pub struct QueryController {
    inner: Arc<Mutex<ControllerInner>>,
    session: Arc<dyn SessionProvider>,
    endpoint: Option<Arc<dyn AgentEndpoint>>,
    events: broadcast::Sender<ControllerEvent>,
}

impl QueryController {
    /// `endpoint` is `None` when no API URL is configured; submissions then
    /// fail before any request is made.
    pub fn new(
        session: Arc<dyn SessionProvider>,
        endpoint: Option<Arc<dyn AgentEndpoint>>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(ControllerInner {
                state: ControllerState::default(),
                closed: false,
            })),
            session,
            endpoint,
            events,
        }
    }

    /// Replaces the query text verbatim.
    pub async fn set_query(&self, text: impl Into<String>) {
        let mut inner = self.inner.lock().await;
        if !inner.closed {
            inner.state.query = text.into();
        }
    }

    pub async fn state(&self) -> ControllerState {
        self.inner.lock().await.state.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub async fn submit(&self) -> SubmitOutcome {
        self.runner().run().await
    }

    /// Runs the submission on a background task that only holds a weak
    /// reference to the controller state.
    pub fn spawn_submit(&self) -> JoinHandle<SubmitOutcome> {
        tokio::spawn(self.runner().run())
    }

    /// Tears down the controller. Replies still in flight are dropped.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        inner.closed = true;
    }

    fn runner(&self) -> SubmissionRunner {
        SubmissionRunner {
            inner: Arc::downgrade(&self.inner),
            session: Arc::clone(&self.session),
            endpoint: self.endpoint.clone(),
            events: self.events.clone(),
        }
    }
}

struct SubmissionRunner {
    inner: Weak<Mutex<ControllerInner>>,
    session: Arc<dyn SessionProvider>,
    endpoint: Option<Arc<dyn AgentEndpoint>>,
    events: broadcast::Sender<ControllerEvent>,
}

impl SubmissionRunner {
    async fn run(self) -> SubmitOutcome {
        let submission = match self.begin().await {
            Ok(submission) => submission,
            Err(outcome) => {
                if let SubmitOutcome::Failed(_) = outcome {
                    self.emit(ControllerEvent::SubmissionFinished { outcome });
                }
                return outcome;
            }
        };

        self.emit(ControllerEvent::SubmissionStarted {
            query: submission.request.query.clone(),
        });
        let agent_id = submission.endpoint.agent_id();
        info!(
            %agent_id,
            query_len = submission.request.query.len(),
            "agent: submitting query"
        );

        let reply = submission
            .endpoint
            .query(&submission.token, &submission.request)
            .await;

        let outcome = self.finish(reply).await;
        if outcome != SubmitOutcome::Discarded {
            self.emit(ControllerEvent::SubmissionFinished { outcome });
        }
        outcome
    }

    async fn begin(&self) -> Result<Submission, SubmitOutcome> {
        let Some(inner) = self.inner.upgrade() else {
            return Err(SubmitOutcome::Skipped(SkipReason::Closed));
        };
        let mut inner = inner.lock().await;

        if inner.closed {
            return Err(SubmitOutcome::Skipped(SkipReason::Closed));
        }
        if inner.state.is_loading {
            debug!("agent: submission already in flight; ignoring");
            return Err(SubmitOutcome::Skipped(SkipReason::InFlight));
        }

        let query = inner.state.query.trim().to_string();
        if query.is_empty() {
            inner.state.fail(QueryError::precondition(EMPTY_QUERY_MESSAGE));
            return Err(SubmitOutcome::Failed(ErrorKind::Precondition));
        }

        let session = self.session.current();
        if session.is_loading() {
            debug!("agent: session still loading; ignoring submission");
            return Err(SubmitOutcome::Skipped(SkipReason::SessionLoading));
        }
        let Some(token) = session.bearer_token() else {
            inner.state.fail(QueryError::precondition(AUTH_REQUIRED_MESSAGE));
            return Err(SubmitOutcome::Failed(ErrorKind::Precondition));
        };
        let Some(endpoint) = self.endpoint.clone() else {
            inner.state.fail(QueryError::precondition(API_URL_MISSING_MESSAGE));
            return Err(SubmitOutcome::Failed(ErrorKind::Precondition));
        };

        inner.state.start();
        Ok(Submission {
            endpoint,
            token: token.to_string(),
            request: QueryRequest { query },
        })
    }

    async fn finish(&self, reply: Result<QueryResult, QueryError>) -> SubmitOutcome {
        let Some(inner) = self.inner.upgrade() else {
            debug!("agent: controller dropped before reply arrived; discarding");
            return SubmitOutcome::Discarded;
        };
        let mut inner = inner.lock().await;
        if inner.closed {
            debug!("agent: controller closed before reply arrived; discarding");
            return SubmitOutcome::Discarded;
        }

        match reply {
            Ok(result) => {
                info!(response_len = result.response.len(), "agent: query completed");
                inner.state.succeed(result);
                SubmitOutcome::Completed
            }
            Err(err) => {
                warn!(
                    kind = ?err.kind,
                    status = err.status,
                    "agent: query failed: {}",
                    err.message
                );
                let kind = err.kind;
                inner.state.fail(err);
                SubmitOutcome::Failed(kind)
            }
        }
    }

    fn emit(&self, event: ControllerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
