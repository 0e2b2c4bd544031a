//! Shared types, errors, and configuration for Tally.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - The ambient request context (tenant, environment, acting user)
//! - Pagination types for list operations
//! - Application-wide error types
//! - Configuration management
//! - Tracing bootstrap for binaries

pub mod config;
pub mod context;
pub mod error;
pub mod telemetry;
pub mod types;

pub use config::{AppConfig, DatabaseConfig, LoggingConfig, WalletConfig};
pub use context::RequestContext;
pub use error::{AppError, AppResult};
