use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::{uuid, Uuid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The location agent every query is routed to.
pub const DEFAULT_AGENT_ID: AgentId = AgentId(uuid!("9a538196-899a-4a3e-a6d8-361bd5d0bf9c"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserIdentity {
    Email(String),
    Id(String),
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email(email) => f.write_str(email),
            Self::Id(id) => f.write_str(id),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub user: UserIdentity,
    access_token: String,
}

impl Session {
    pub fn new(user: UserIdentity, access_token: impl Into<String>) -> Self {
        Self {
            user,
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

// Tokens stay out of logs and panic messages.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Authentication status as reported by the session collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Loading,
    Unauthenticated,
    Authenticated(Session),
}

impl SessionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Bearer token for the current session, if any.
    ///
    /// A blank token is treated the same as no session.
    pub fn bearer_token(&self) -> Option<&str> {
        match self {
            Self::Authenticated(session) if !session.access_token().trim().is_empty() => {
                Some(session.access_token())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_agent_id_renders_as_hyphenated_uuid() {
        assert_eq!(
            DEFAULT_AGENT_ID.to_string(),
            "9a538196-899a-4a3e-a6d8-361bd5d0bf9c"
        );
    }

    #[test]
    fn bearer_token_requires_authenticated_non_blank_session() {
        assert_eq!(SessionState::Loading.bearer_token(), None);
        assert_eq!(SessionState::Unauthenticated.bearer_token(), None);

        let blank = SessionState::Authenticated(Session::new(
            UserIdentity::Email("a@example.com".into()),
            "  ",
        ));
        assert_eq!(blank.bearer_token(), None);

        let ok = SessionState::Authenticated(Session::new(
            UserIdentity::Id("42".into()),
            "tok-123",
        ));
        assert_eq!(ok.bearer_token(), Some("tok-123"));
    }

    #[test]
    fn session_debug_redacts_token() {
        let session = Session::new(UserIdentity::Email("a@example.com".into()), "secret-token");
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("redacted"));
    }
}
