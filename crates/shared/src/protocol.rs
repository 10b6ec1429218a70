use serde::{Deserialize, Serialize};

/// Body of `POST /agents/{agent_id}/query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// Successful agent reply. `response` is opaque text and may carry markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub query: String,
    pub response: String,
}

/// Failure body returned with a non-2xx status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_result_requires_both_fields() {
        let ok: QueryResult =
            serde_json::from_str(r#"{"query":"pizza near me","response":"Found 3 results"}"#)
                .expect("full body");
        assert_eq!(ok.response, "Found 3 results");

        assert!(serde_json::from_str::<QueryResult>(r#"{"query":"pizza"}"#).is_err());
    }

    #[test]
    fn error_body_tolerates_missing_or_extra_fields() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"message":"Token expired","code":"auth"}"#).expect("body");
        assert_eq!(body.message.as_deref(), Some("Token expired"));

        let empty: ErrorBody = serde_json::from_str("{}").expect("empty body");
        assert!(empty.message.is_none());
    }
}
