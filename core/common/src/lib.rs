//! Common utilities and types shared across cloudbridge modules.
//!
//! Both storage backends report failures through the same [`Error`] and
//! describe remote entries with the same [`FileRecord`].

pub mod error;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use types::{DownloadRequest, FileRecord, UploadRequest};
