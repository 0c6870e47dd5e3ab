//! [`crate::domain::ports::object_store::ObjectStoreProvider`] implementations.

mod filesystem;

#[cfg(feature = "objectstore-s3")]
mod s3;

pub use filesystem::FilesystemObjectStoreProvider;

#[cfg(feature = "objectstore-s3")]
pub use s3::{S3ObjectStoreConfig, S3ObjectStoreProvider};
