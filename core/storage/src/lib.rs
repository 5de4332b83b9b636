//! Cloud storage clients for cloudbridge.
//!
//! Two independent backends live here:
//! - [`gdrive`]: Google Drive, authenticated with a service-account key
//! - [`onedrive`]: Microsoft Graph (OneDrive and SharePoint), authenticated
//!   with the client-credentials grant
//!
//! Every operation follows the same shape: obtain a bearer token from the
//! client's [`TokenSource`], issue the request(s), and map the response into
//! a [`FileRecord`](cloudbridge_common::FileRecord) or write bytes to disk.
//! Nothing is cached between operations and nothing is retried.

pub mod gdrive;
pub mod onedrive;
pub mod token;

mod http;

pub use gdrive::{DriveClient, GDriveConfig, ServiceAccountAuth};
pub use onedrive::{ClientCredentialsAuth, DriveTarget, GraphClient, OneDriveConfig};
pub use token::{AccessToken, StaticToken, TokenSource};
