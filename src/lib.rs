pub mod adapters;
pub mod client;
pub mod model;
pub mod readat;

pub use client::{ClientConfig, CloudStorage, StorageClient};
pub use model::error::StorageError;
pub use model::request::FileRequest;
