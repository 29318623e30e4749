//! Tubely backend service

#![deny(clippy::all, clippy::pedantic, clippy::nursery, dead_code)]

/// Access token verification and issuance
pub mod jwt;

/// Video inspection and faststart normalization
pub mod media;

/// Request middleware
pub mod middleware;

/// Where uploaded assets are stored
pub mod placement;

/// HTTP routes
pub mod routes;

/// Server startup
pub mod server;

/// Shared types
pub mod types;

/// Upload flows
pub mod upload;

/// In-memory fakes of external capabilities
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
