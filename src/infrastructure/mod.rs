//! Infrastructure layer - Framework implementations
//!
//! This layer contains:
//! - Database connection and migrations (db)
//! - HTTP server setup (server)
//! - Configuration loading (config)
//! - Application state (state)

pub mod config;
pub mod db;
pub mod server;
pub mod state;

pub use state::AppState;
