/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Party-game action orchestration.
pub mod party_service;
/// Room event broadcast helpers.
pub mod room_events;
/// Quiz-flow orchestration: joins, lifecycle, answers, timers.
pub mod room_service;
/// Per-room scheduled work.
pub mod timer_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
