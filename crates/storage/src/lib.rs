//! pa-storage: storage backends for publish-artifacts
//!
//! Each backend implements [`pa_core::Uploader`].

pub mod s3;
pub mod signed_url;

pub use s3::{S3Options, S3Uploader};
pub use signed_url::SignedUrlUploader;
