use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;

use crate::adapters::{self, ChunkStream, ObjectAttrs, ObjectPage};
use crate::model::error::AdapterError;

/// In-memory adapter standing in for a remote bucket. `calls` counts every
/// backend operation, so tests can assert that validation failures never
/// reach the network. Chunk and page sizes of zero mean "everything at
/// once".
#[derive(Default)]
pub struct MockAdapter {
    store: Mutex<BTreeMap<(String, String), Vec<u8>>>,
    pub calls: AtomicUsize,
    pub closed: AtomicBool,
    chunk_size: usize,
    page_size: usize,
    fail_delete_key: Option<String>,
    fail_list_offset: Option<usize>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Deleting `key` will fail with an injected service error.
    pub fn fail_delete_of(mut self, key: &str) -> Self {
        self.fail_delete_key = Some(key.to_string());
        self
    }

    /// Listing fails once the page starting at `offset` is requested.
    pub fn fail_list_at(mut self, offset: usize) -> Self {
        self.fail_list_offset = Some(offset);
        self
    }

    pub fn insert(&self, bucket: &str, key: &str, body: Vec<u8>) {
        self.store
            .lock()
            .expect("failed to acquire `store` guard")
            .insert((bucket.to_string(), key.to_string()), body);
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.store
            .lock()
            .expect("failed to acquire `store` guard")
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl adapters::ObjectAdapter for MockAdapter {
    async fn cs_put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), AdapterError> {
        self.record_call();
        self.insert(bucket, key, body);

        Ok(())
    }

    async fn cs_object_attrs(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<ObjectAttrs, AdapterError> {
        self.record_call();

        let store = self.store.lock().expect("failed to acquire `store` guard");
        let body = store
            .get(&(bucket.to_string(), key.to_string()))
            .ok_or_else(|| AdapterError::NotFound(key.to_string()))?;

        Ok(ObjectAttrs {
            key: key.to_string(),
            size: body.len() as i64,
            created: SystemTime::UNIX_EPOCH,
            updated: SystemTime::UNIX_EPOCH,
        })
    }

    async fn cs_open_read_stream(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<ChunkStream, AdapterError> {
        self.record_call();

        let store = self.store.lock().expect("failed to acquire `store` guard");
        let body = store
            .get(&(bucket.to_string(), key.to_string()))
            .ok_or_else(|| AdapterError::NotFound(key.to_string()))?;

        let chunk_size = if self.chunk_size == 0 {
            body.len().max(1)
        } else {
            self.chunk_size
        };

        let chunks: Vec<Result<Bytes, AdapterError>> = body
            .chunks(chunk_size)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();

        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn cs_delete_object(&self, bucket: &str, key: &str) -> Result<(), AdapterError> {
        self.record_call();

        if self.fail_delete_key.as_deref() == Some(key) {
            return Err(AdapterError::Service("injected delete failure".to_string()));
        }

        let mut store = self.store.lock().expect("failed to acquire `store` guard");
        store
            .remove(&(bucket.to_string(), key.to_string()))
            .ok_or_else(|| AdapterError::NotFound(key.to_string()))?;

        Ok(())
    }

    async fn cs_list_page(
        &self,
        bucket: &str,
        page_token: Option<String>,
    ) -> Result<ObjectPage, AdapterError> {
        self.record_call();

        let start: usize = page_token.as_deref().unwrap_or("0").parse().unwrap_or(0);

        if let Some(fail_at) = self.fail_list_offset {
            if start >= fail_at {
                return Err(AdapterError::Service("injected list failure".to_string()));
            }
        }

        let store = self.store.lock().expect("failed to acquire `store` guard");
        let entries: Vec<(String, i64)> = store
            .iter()
            .filter(|((b, _), _)| b == bucket)
            .map(|((_, key), body)| (key.clone(), body.len() as i64))
            .collect();

        let page_size = if self.page_size == 0 {
            entries.len().max(1)
        } else {
            self.page_size
        };

        let objects = entries
            .iter()
            .skip(start)
            .take(page_size)
            .map(|(key, size)| ObjectAttrs {
                key: key.clone(),
                size: *size,
                created: SystemTime::UNIX_EPOCH,
                updated: SystemTime::UNIX_EPOCH,
            })
            .collect();

        let next = start + page_size;
        let next_page_token = if next < entries.len() {
            Some(next.to_string())
        } else {
            None
        };

        Ok(ObjectPage {
            objects,
            next_page_token,
        })
    }

    async fn cs_close(&self) -> Result<(), AdapterError> {
        self.closed.store(true, Ordering::SeqCst);

        Ok(())
    }
}
