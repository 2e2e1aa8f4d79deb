/// Health check HTTP endpoints for the hosting platform
pub mod health;
/// The subscription lifecycle state machine
pub mod lifecycle;
/// Cron wiring for the periodic sweeps
pub mod sweeps;
