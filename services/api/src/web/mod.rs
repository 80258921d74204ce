pub mod announcements;
pub mod auth;
pub mod catalog;
pub mod community;
pub mod middleware;
pub mod moderation;
pub mod notifications;
pub mod rest;
pub mod router;
pub mod settings;
pub mod state;
pub mod users;

// Re-export the router builder so the binary and the integration tests
// assemble the same application.
pub use middleware::{require_admin, require_auth};
pub use router::build_router;
