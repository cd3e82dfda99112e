/// Marketplace moderation
///
/// Admin-driven status changes for marketplace listings and user accounts,
/// with bulk actions and an append-only audit trail.

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod moderation;
pub mod server;
pub mod service;
pub mod store;

pub use context::AppContext;
pub use error::{ModerationError, ModerationResult};
