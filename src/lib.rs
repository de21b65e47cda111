//! Real-time quiz room engine: WebSocket event handling, plugin-based
//! question types, scoring, and TTL-backed room and session state.

/// Runtime configuration loading.
pub mod config;
/// Durable-store and authentication collaborator traits.
pub mod dao;
/// Wire DTOs for the WebSocket contract and HTTP surface.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// Game type plugins and scoring.
pub mod plugins;
/// HTTP and WebSocket route trees.
pub mod routes;
/// Orchestration services.
pub mod services;
/// Shared application state and room/party models.
pub mod state;
/// TTL-backed key/value stores.
pub mod store;
