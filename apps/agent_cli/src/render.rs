//! Text view over the controller state. Holds no state of its own.

use client_core::ControllerState;
use shared::domain::SessionState;

pub const LOADING_SESSION: &str = "Loading session...";
pub const AUTH_WARNING: &str = "Authentication Required: Please log in to use the agent.";
pub const SEARCHING: &str = "Searching...";
pub const EMPTY_PROMPT: &str = "Enter a query above to see results here.";

pub fn render(state: &ControllerState, session: &SessionState) -> Vec<String> {
    if session.is_loading() {
        return vec![LOADING_SESSION.to_string()];
    }

    let mut lines = Vec::new();
    if matches!(session, SessionState::Unauthenticated) {
        lines.push(AUTH_WARNING.to_string());
    }

    if state.is_loading {
        lines.push(SEARCHING.to_string());
    } else if let Some(error) = &state.error {
        if error.has_status() {
            lines.push(format!("Error: {} (Status: {})", error.message, error.status));
        } else {
            lines.push(format!("Error: {}", error.message));
        }
    } else if let Some(result) = &state.result {
        lines.push("Results".to_string());
        // Printed verbatim; any markup is left to the reader.
        lines.push(result.response.clone());
        lines.push(format!("Query: \"{}\"", result.query));
    } else if session.bearer_token().is_some() {
        lines.push(EMPTY_PROMPT.to_string());
    }

    lines
}

#[cfg(test)]
mod tests {
    use shared::{
        domain::{Session, UserIdentity},
        error::QueryError,
        protocol::QueryResult,
    };

    use super::*;

    fn signed_in() -> SessionState {
        SessionState::Authenticated(Session::new(UserIdentity::Id("7".into()), "tok"))
    }

    #[test]
    fn loading_session_hides_everything_else() {
        let state = ControllerState {
            error: Some(QueryError::domain(500, "boom")),
            ..ControllerState::default()
        };
        assert_eq!(render(&state, &SessionState::Loading), vec![LOADING_SESSION]);
    }

    #[test]
    fn idle_authenticated_view_prompts_for_query() {
        assert_eq!(
            render(&ControllerState::default(), &signed_in()),
            vec![EMPTY_PROMPT]
        );
    }

    #[test]
    fn unauthenticated_view_warns_and_shows_error() {
        let state = ControllerState {
            error: Some(QueryError::precondition("Authentication required.")),
            ..ControllerState::default()
        };
        assert_eq!(
            render(&state, &SessionState::Unauthenticated),
            vec![AUTH_WARNING, "Error: Authentication required."]
        );
    }

    #[test]
    fn error_with_status_includes_code() {
        let state = ControllerState {
            error: Some(QueryError::domain(401, "Token expired")),
            ..ControllerState::default()
        };
        assert_eq!(
            render(&state, &signed_in()),
            vec!["Error: Token expired (Status: 401)"]
        );
    }

    #[test]
    fn result_shows_response_and_echoed_query() {
        let state = ControllerState {
            query: "pizza near me".into(),
            result: Some(QueryResult {
                query: "pizza near me".into(),
                response: "<b>Found 3 results</b>".into(),
            }),
            ..ControllerState::default()
        };
        assert_eq!(
            render(&state, &signed_in()),
            vec!["Results", "<b>Found 3 results</b>", "Query: \"pizza near me\""]
        );
    }

    #[test]
    fn in_flight_request_shows_progress() {
        let state = ControllerState {
            is_loading: true,
            ..ControllerState::default()
        };
        assert_eq!(render(&state, &signed_in()), vec![SEARCHING]);
    }
}
