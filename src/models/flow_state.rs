use serde::{Deserialize, Serialize};

/// Authorization-flow state, stored at `oauth:state:{state}` with a 5 minute
/// TTL. Created at `/authorize`, consumed exactly once (via `take`) at
/// `/callback`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowState {
    pub client_id: String,
    pub redirect_uri: String,
    pub code_challenge: String,
    pub code_challenge_method: String,
    pub scope: Option<String>,
    /// The client's original `state` value, echoed back at `/callback`.
    pub client_state: Option<String>,
    pub created_at: i64,
}

impl FlowState {
    pub const TTL_SECONDS: i64 = 300;

    pub fn key(state: &str) -> String {
        format!("oauth:state:{state}")
    }
}
