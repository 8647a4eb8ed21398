use std::pin::Pin;
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::model::error::AdapterError;

pub mod gcs;
pub mod mock;
pub mod s3;

/// Forward-only stream of object bytes. Supports sequential consumption
/// only; dropping it releases the underlying connection.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, AdapterError>> + Send>>;

/// Provider-neutral object metadata.
#[derive(Clone, Debug)]
pub struct ObjectAttrs {
    pub key: String,
    pub size: i64,
    pub created: SystemTime,
    pub updated: SystemTime,
}

/// One page of a bucket listing. `next_page_token` is `None` on the last
/// page.
#[derive(Debug, Default)]
pub struct ObjectPage {
    pub objects: Vec<ObjectAttrs>,
    pub next_page_token: Option<String>,
}

/// Capability interface consumed from a remote object-storage backend.
/// Method names carry a `cs_` prefix to stay clear of the provider
/// clients' own inherent builder methods.
#[async_trait]
pub trait ObjectAdapter: Send + Sync {
    /// Create or replace the object at `key`. The write is committed when
    /// the call returns.
    async fn cs_put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), AdapterError>;

    async fn cs_object_attrs(&self, bucket: &str, key: &str)
        -> Result<ObjectAttrs, AdapterError>;

    /// Open a forward-only read stream over the full object.
    async fn cs_open_read_stream(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<ChunkStream, AdapterError>;

    async fn cs_delete_object(&self, bucket: &str, key: &str) -> Result<(), AdapterError>;

    async fn cs_list_page(
        &self,
        bucket: &str,
        page_token: Option<String>,
    ) -> Result<ObjectPage, AdapterError>;

    async fn cs_close(&self) -> Result<(), AdapterError> {
        Ok(())
    }
}

#[async_trait]
impl<T: ObjectAdapter + ?Sized> ObjectAdapter for std::sync::Arc<T> {
    async fn cs_put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), AdapterError> {
        (**self).cs_put_object(bucket, key, body).await
    }

    async fn cs_object_attrs(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<ObjectAttrs, AdapterError> {
        (**self).cs_object_attrs(bucket, key).await
    }

    async fn cs_open_read_stream(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<ChunkStream, AdapterError> {
        (**self).cs_open_read_stream(bucket, key).await
    }

    async fn cs_delete_object(&self, bucket: &str, key: &str) -> Result<(), AdapterError> {
        (**self).cs_delete_object(bucket, key).await
    }

    async fn cs_list_page(
        &self,
        bucket: &str,
        page_token: Option<String>,
    ) -> Result<ObjectPage, AdapterError> {
        (**self).cs_list_page(bucket, page_token).await
    }

    async fn cs_close(&self) -> Result<(), AdapterError> {
        (**self).cs_close().await
    }
}
