use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for the quiz backend.
#[openapi(
    info(
        title = "quiz-back",
        description = "Real-time quiz and party session engine. The game \
                       itself is played over the `/ws` WebSocket; the schemas \
                       below describe its message contract."
    ),
    paths(
        crate::routes::health::healthcheck,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::ServerMessage,
            crate::dto::ws::ParticipantRole,
            crate::dto::room::RoomSnapshot,
            crate::dto::room::QuestionSnapshot,
            crate::dto::room::LeaderboardEntry,
            crate::dto::room::QuestionStats,
            crate::dto::party::SessionSnapshot,
            crate::plugins::scoring::ScoreBreakdown,
            crate::state::room::RoomStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "WebSocket operations for quiz rooms"),
    )
)]
pub struct ApiDoc;
