//! Wire shapes for the unary and streaming endpoints a transport layer
//! would expose over [`crate::Orchestrator`]. No HTTP/WebSocket server
//! lives in this crate; these are the serde types such a server would
//! serialize/deserialize at its boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use orchestra_core::{ProgressEvent, QueryResult};

/// Body of the unary query endpoint's request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub text: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Body of the unary query endpoint's response. A thin re-export of
/// [`QueryResult`] under the name the wire contract uses, kept distinct so
/// a transport layer can evolve the envelope independently of the core
/// type.
pub type QueryResponse = QueryResult;

/// Phases reported by `agent:status` frames on the streaming endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryPhase {
    Analyzing,
    Planning,
    Executing,
    Synthesizing,
}

/// Client-to-server frames on the streaming endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    #[serde(rename = "agent:query")]
    Query {
        #[serde(flatten)]
        request: QueryRequest,
    },
    #[serde(rename = "agent:cancel")]
    Cancel { query_id: String },
}

/// Server-to-client frames on the streaming endpoint, emitted in order
/// per query: `Status(Analyzing)`, `Status(Planning)`,
/// `Status(Executing)` interleaved with `Progress` frames,
/// `Status(Synthesizing)`, then one terminal `Response` or `Error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    #[serde(rename = "agent:status")]
    Status { phase: QueryPhase },
    #[serde(rename = "agent:progress")]
    Progress {
        step_id: String,
        state: orchestra_core::StepStatus,
        seq: u64,
    },
    #[serde(rename = "agent:response")]
    Response { result: QueryResponse },
    #[serde(rename = "agent:error")]
    Error { error_type: String, message: String },
}

impl ServerFrame {
    pub fn progress(event: &ProgressEvent) -> Self {
        ServerFrame::Progress {
            step_id: event.step_id.clone(),
            state: event.state,
            seq: event.seq,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_request_deserializes_without_optional_fields() {
        let req: QueryRequest = serde_json::from_str(r#"{"text": "hello"}"#).unwrap();
        assert_eq!(req.text, "hello");
        assert!(req.session_id.is_none());
    }

    #[test]
    fn client_frame_cancel_round_trips() {
        let frame = ClientFrame::Cancel {
            query_id: "q1".to_string(),
        };
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("agent:cancel"));
        let back: ClientFrame = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, ClientFrame::Cancel { query_id } if query_id == "q1"));
    }

    #[test]
    fn server_frame_status_uses_snake_case_phase() {
        let frame = ServerFrame::Status {
            phase: QueryPhase::Executing,
        };
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"executing\""));
    }
}
