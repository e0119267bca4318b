//! Storage module
//!
//! Provides blob storage for binary payloads (images, audio, PDF pages).

pub mod blob_store;

pub use blob_store::{hash_payload, BlobStore};
