//! External collaborator interfaces: durable game definitions, final results,
//! and caller identity. The engine consumes these through traits only; the
//! in-memory implementations exist for single-process wiring and tests.

/// Identity resolution for joining callers.
pub mod auth;
/// Record types exchanged with the durable store.
pub mod models;
/// Durable game/room repository trait and in-memory implementation.
pub mod repository;
