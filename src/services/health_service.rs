use crate::{dto::health::HealthResponse, state::SharedState};

/// Respond with a static health payload.
///
/// The engine has no external runtime dependency to probe: the store is
/// in-process and the durable repository is only touched on demand, so a
/// responsive process is a healthy one.
pub async fn health_status(_state: &SharedState) -> HealthResponse {
    HealthResponse::ok()
}
