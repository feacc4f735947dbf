/// Clients for the external model and agent services.
///
/// Both are thin pass-throughs: no retries, no response reshaping. A
/// timeout, connection failure, and bad payload each map to a distinct
/// `UpstreamError` so the boundary can answer 504 vs 502.
mod agent;
mod video;

pub use agent::AgentClient;
pub use video::VideoAnalyzer;

use crate::error::UpstreamError;

/// Map a reqwest transport failure onto the upstream taxonomy
fn classify(err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout
    } else if err.is_connect() {
        UpstreamError::Unreachable
    } else {
        UpstreamError::BadResponse(err.to_string())
    }
}
