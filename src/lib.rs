//! # Club Membership Bot
//!
//! A Telegram bot operating a paid community membership: members pay for a
//! recurring period, get a reminder before expiry, are removed after a grace
//! period if unpaid, and receive scheduled campaign broadcasts targeted at
//! their funnel state.
//!
//! ## Features
//! - Subscription lifecycle: 30-day periods, day-27 reminders, 3-day grace,
//!   automatic removal from the paid channel on expiry
//! - Campaign broadcasts from declarative JSON descriptors with computed
//!   audiences and per-message idempotency markers
//! - Rate-limited fan-out that tolerates blocked recipients and transient
//!   send errors without re-sending or losing progress
//! - Persistent storage with SQLite

/// Campaign descriptors, audiences, and broadcast dispatch
pub mod campaigns;
/// Outbound messaging transport (Telegram)
pub mod channel;
/// Configuration management and environment variables
pub mod config;
/// Database models, connections, and migrations
pub mod database;
/// Background services: lifecycle sweeps, cron wiring, health checks
pub mod services;
/// Utility functions for timestamps and validation
pub mod utils;
