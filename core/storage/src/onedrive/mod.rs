//! Microsoft Graph backend for OneDrive and SharePoint document libraries.
//!
//! All calls are plain HTTPS requests against Graph v1.0 carrying an
//! app-only bearer token from the client-credentials grant.

pub mod auth;
pub mod client;
pub mod config;
pub mod item;

pub use auth::ClientCredentialsAuth;
pub use client::GraphClient;
pub use config::{DriveTarget, OneDriveConfig};
pub use item::DriveItem;
