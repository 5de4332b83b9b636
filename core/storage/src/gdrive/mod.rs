//! Google Drive backend.
//!
//! This module provides:
//! - Service-account authentication backed by the vendor OAuth2 library
//! - Resumable, chunked uploads read straight from disk
//! - Escaped name searches, optionally scoped to a folder
//! - Media downloads buffered in memory and written in one go

pub mod auth;
pub mod client;
pub mod config;
pub mod query;

pub use auth::ServiceAccountAuth;
pub use client::{DriveClient, DriveFile};
pub use config::GDriveConfig;
pub use query::DriveQuery;
