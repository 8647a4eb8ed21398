use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::adapters::{self, ObjectAdapter};
use crate::model::error::{AdapterError, StorageError};
use crate::model::request::FileRequest;
use crate::readat::ReadAtAdapter;

/// Upper time budget for a single upload or download. Composes with caller
/// cancellation; whichever fires first wins.
pub const TRANSFER_TIMEOUT: Duration = Duration::from_secs(50);

#[derive(Clone, Debug, Default)]
pub struct ClientConfig {
    /// Service-account JSON file for the GCS backend. `None` falls back to
    /// the provider's default credential chain. Passed explicitly into the
    /// client constructor, never through process environment.
    pub credentials: Option<PathBuf>,
}

/// File-like operations against a bucket of a remote object-storage
/// service. Implemented by [`StorageClient`] over any
/// [`ObjectAdapter`](crate::adapters::ObjectAdapter) backend.
#[async_trait]
pub trait CloudStorage: Send + Sync {
    /// Uploads the source to the request's object key, creating a new
    /// object or replacing an existing one. Returns bytes written.
    async fn upload_file(
        &self,
        src: &mut (dyn AsyncRead + Send + Unpin),
        req: &FileRequest,
    ) -> Result<u64, StorageError>;

    /// Copies the object's content into the sink. Returns bytes read.
    async fn download_file(
        &self,
        dst: &mut (dyn AsyncWrite + Send + Unpin),
        req: &FileRequest,
    ) -> Result<u64, StorageError>;

    /// Reads up to `buf.len()` bytes of the object starting at `offset`.
    async fn read_at(
        &self,
        req: &FileRequest,
        buf: &mut [u8],
        offset: u64,
    ) -> Result<usize, StorageError>;

    /// Names of all objects in the request's bucket, in the order the
    /// service returns them.
    async fn list_objects(&self, req: &FileRequest) -> Result<Vec<String>, StorageError>;

    /// Deletes the single object at `path + "/" + file`.
    async fn delete_object(&self, req: &FileRequest) -> Result<(), StorageError>;

    /// Deletes every object in the request's bucket. The first failure
    /// aborts the remaining deletions; already-deleted objects stay gone.
    async fn delete_objects(&self, req: &FileRequest) -> Result<(), StorageError>;

    /// Releases the backend connection. Operations after close fail with
    /// [`StorageError::ClientClosed`].
    async fn close(&self) -> Result<(), StorageError>;
}

/// Long-lived handle over one backend connection. Safe for concurrent use;
/// each operation scopes its own stream to the call.
pub struct StorageClient {
    adapter: Box<dyn ObjectAdapter>,
    config: ClientConfig,
    closed: AtomicBool,
}

impl StorageClient {
    pub fn new(adapter: Box<dyn ObjectAdapter>, config: ClientConfig) -> Self {
        Self {
            adapter,
            config,
            closed: AtomicBool::new(false),
        }
    }

    /// Connects to Google Cloud Storage with the configured credentials.
    pub async fn connect_gcs(config: ClientConfig) -> Result<Self, StorageError> {
        let client = adapters::gcs::connect(config.credentials.as_deref())
            .await
            .map_err(|source| {
                error!(error = %source, "error creating storage client");
                StorageError::CreateClient { source }
            })?;

        Ok(Self::new(Box::new(client), config))
    }

    /// Connects to S3 using the ambient AWS environment.
    pub async fn connect_s3(config: ClientConfig) -> Result<Self, StorageError> {
        let client = adapters::s3::connect().await;

        Ok(Self::new(Box::new(client), config))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StorageError::ClientClosed);
        }

        Ok(())
    }
}

fn deadline_exceeded() -> AdapterError {
    AdapterError::Service("deadline exceeded".to_string())
}

#[async_trait]
impl CloudStorage for StorageClient {
    async fn upload_file(
        &self,
        src: &mut (dyn AsyncRead + Send + Unpin),
        req: &FileRequest,
    ) -> Result<u64, StorageError> {
        self.ensure_open()?;

        if req.file().is_empty() {
            return Err(StorageError::MissingFileName);
        }
        if req.bucket().is_empty() {
            return Err(StorageError::MissingBucketName);
        }

        let key = req.object_key();

        let transfer = async {
            // probe is purely diagnostic; an absent object is the common case
            match self.adapter.cs_object_attrs(req.bucket(), &key).await {
                Ok(attrs) => debug!(
                    key = %key,
                    created = ?attrs.created,
                    updated = ?attrs.updated,
                    "cloud file exists"
                ),
                Err(_) => debug!(key = %key, "cloud file doesn't exist, will create new"),
            }

            let mut body = Vec::new();
            src.read_to_end(&mut body)
                .await
                .map_err(|err| StorageError::Upload {
                    key: key.clone(),
                    source: AdapterError::Service(err.to_string()),
                })?;
            let written = body.len() as u64;

            self.adapter
                .cs_put_object(req.bucket(), &key, body)
                .await
                .map_err(|source| {
                    error!(error = %source, key = %key, "error uploading file");
                    StorageError::Upload {
                        key: key.clone(),
                        source,
                    }
                })?;

            debug!(key = %key, "cloud file created/updated");
            Ok(written)
        };

        let result = timeout(TRANSFER_TIMEOUT, transfer).await;
        match result {
            Ok(result) => result,
            Err(_) => {
                error!(key = %key, "upload timed out");
                Err(StorageError::Upload {
                    key,
                    source: deadline_exceeded(),
                })
            }
        }
    }

    async fn download_file(
        &self,
        dst: &mut (dyn AsyncWrite + Send + Unpin),
        req: &FileRequest,
    ) -> Result<u64, StorageError> {
        self.ensure_open()?;

        if req.file().is_empty() {
            return Err(StorageError::MissingFileName);
        }
        if req.bucket().is_empty() {
            return Err(StorageError::MissingBucketName);
        }

        let key = req.object_key();

        let transfer = async {
            let attrs = self
                .adapter
                .cs_object_attrs(req.bucket(), &key)
                .await
                .map_err(|source| {
                    error!(error = %source, key = %key, "cloud file inaccessible");
                    StorageError::Inaccessible {
                        key: key.clone(),
                        source,
                    }
                })?;
            debug!(
                key = %key,
                created = ?attrs.created,
                updated = ?attrs.updated,
                "downloading cloud file"
            );

            let mut stream = self
                .adapter
                .cs_open_read_stream(req.bucket(), &key)
                .await
                .map_err(|source| {
                    error!(error = %source, key = %key, "error reading cloud file");
                    StorageError::Download {
                        key: key.clone(),
                        source,
                    }
                })?;

            let mut read = 0u64;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|source| StorageError::Download {
                    key: key.clone(),
                    source,
                })?;

                dst.write_all(&chunk)
                    .await
                    .map_err(|err| StorageError::Download {
                        key: key.clone(),
                        source: AdapterError::Service(err.to_string()),
                    })?;
                read += chunk.len() as u64;
            }

            dst.flush().await.map_err(|err| StorageError::Download {
                key: key.clone(),
                source: AdapterError::Service(err.to_string()),
            })?;

            Ok(read)
        };

        let result = timeout(TRANSFER_TIMEOUT, transfer).await;
        match result {
            Ok(result) => result,
            Err(_) => {
                error!(key = %key, "download timed out");
                Err(StorageError::Download {
                    key,
                    source: deadline_exceeded(),
                })
            }
        }
    }

    async fn read_at(
        &self,
        req: &FileRequest,
        buf: &mut [u8],
        offset: u64,
    ) -> Result<usize, StorageError> {
        self.ensure_open()?;

        if req.file().is_empty() {
            return Err(StorageError::MissingFileName);
        }
        if req.bucket().is_empty() {
            return Err(StorageError::MissingBucketName);
        }

        let key = req.object_key();

        let attrs = self
            .adapter
            .cs_object_attrs(req.bucket(), &key)
            .await
            .map_err(|source| {
                error!(error = %source, key = %key, "cloud file inaccessible");
                StorageError::Inaccessible {
                    key: key.clone(),
                    source,
                }
            })?;
        debug!(
            key = %key,
            created = ?attrs.created,
            updated = ?attrs.updated,
            offset = offset,
            "reading cloud file chunk"
        );

        let stream = self
            .adapter
            .cs_open_read_stream(req.bucket(), &key)
            .await
            .map_err(|source| {
                error!(error = %source, key = %key, "error reading cloud file");
                StorageError::Read {
                    key: key.clone(),
                    source,
                }
            })?;

        let mut adapter = ReadAtAdapter::new(stream);
        adapter
            .read_at(buf, offset)
            .await
            .map_err(|source| StorageError::Read { key, source })
    }

    async fn list_objects(&self, req: &FileRequest) -> Result<Vec<String>, StorageError> {
        self.ensure_open()?;

        if req.bucket().is_empty() {
            return Err(StorageError::MissingBucketName);
        }

        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = match self.adapter.cs_list_page(req.bucket(), page_token).await {
                Ok(page) => page,
                Err(source) => {
                    error!(error = %source, bucket = req.bucket(), "error listing storage bucket objects");
                    return Err(StorageError::List {
                        collected: names,
                        source,
                    });
                }
            };

            for obj in page.objects {
                names.push(obj.key);
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        Ok(names)
    }

    async fn delete_object(&self, req: &FileRequest) -> Result<(), StorageError> {
        self.ensure_open()?;

        if req.bucket().is_empty() {
            return Err(StorageError::MissingBucketName);
        }
        if req.path().is_empty() {
            return Err(StorageError::MissingFilePath);
        }
        if req.file().is_empty() {
            return Err(StorageError::MissingFileName);
        }

        // unconditional join, unlike object_key(); path is required here
        let key = format!("{}/{}", req.path(), req.file());

        self.adapter
            .cs_delete_object(req.bucket(), &key)
            .await
            .map_err(|source| {
                error!(error = %source, key = %key, "error deleting storage bucket object");
                StorageError::Delete { key, source }
            })
    }

    async fn delete_objects(&self, req: &FileRequest) -> Result<(), StorageError> {
        self.ensure_open()?;

        if req.bucket().is_empty() {
            return Err(StorageError::MissingBucketName);
        }

        let mut deleted = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = match self.adapter.cs_list_page(req.bucket(), page_token).await {
                Ok(page) => page,
                Err(source) => {
                    error!(error = %source, bucket = req.bucket(), "error listing storage bucket objects");
                    return Err(StorageError::List {
                        collected: deleted,
                        source,
                    });
                }
            };

            for obj in page.objects {
                info!(key = %obj.key, size = obj.size, "deleting object");

                self.adapter
                    .cs_delete_object(req.bucket(), &obj.key)
                    .await
                    .map_err(|source| {
                        error!(error = %source, key = %obj.key, "error deleting storage bucket objects");
                        StorageError::Delete {
                            key: obj.key.clone(),
                            source,
                        }
                    })?;
                deleted.push(obj.key);
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.closed.store(true, Ordering::SeqCst);

        self.adapter.cs_close().await.map_err(|source| {
            error!(error = %source, "error closing storage client");
            StorageError::Close { source }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use super::*;
    use crate::adapters::mock::MockAdapter;

    fn request(bucket: &str, file: &str, path: &str) -> FileRequest {
        FileRequest {
            bucket: bucket.to_string(),
            file: file.to_string(),
            path: path.to_string(),
            mod_time: 0,
        }
    }

    fn client_over(adapter: Arc<MockAdapter>) -> StorageClient {
        StorageClient::new(Box::new(adapter), ClientConfig::default())
    }

    #[tokio::test]
    async fn test_validation_before_network() {
        let adapter = Arc::new(MockAdapter::new());
        let client = client_over(adapter.clone());

        let no_bucket = request("", "c.txt", "a");
        let no_file = request("bucket", "", "a");

        let mut src: &[u8] = b"data";
        let result = client.upload_file(&mut src, &no_file).await;
        assert!(matches!(result, Err(StorageError::MissingFileName)));

        let mut src: &[u8] = b"data";
        let result = client.upload_file(&mut src, &no_bucket).await;
        assert!(matches!(result, Err(StorageError::MissingBucketName)));

        let mut sink = Cursor::new(Vec::new());
        let result = client.download_file(&mut sink, &no_file).await;
        assert!(matches!(result, Err(StorageError::MissingFileName)));

        let mut buf = [0u8; 8];
        let result = client.read_at(&no_file, &mut buf, 0).await;
        assert!(matches!(result, Err(StorageError::MissingFileName)));
        let result = client.read_at(&no_bucket, &mut buf, 0).await;
        assert!(matches!(result, Err(StorageError::MissingBucketName)));

        let result = client.list_objects(&no_bucket).await;
        assert!(matches!(result, Err(StorageError::MissingBucketName)));

        let result = client.delete_object(&no_bucket).await;
        assert!(matches!(result, Err(StorageError::MissingBucketName)));

        let result = client.delete_objects(&no_bucket).await;
        assert!(matches!(result, Err(StorageError::MissingBucketName)));

        assert_eq!(
            adapter.calls.load(Ordering::SeqCst),
            0,
            "validation errors must not reach the backend"
        );
    }

    #[tokio::test]
    async fn test_upload_download_round_trip() {
        let adapter = Arc::new(MockAdapter::new());
        let client = client_over(adapter.clone());

        let content = b"the quick brown fox jumps over the lazy dog".to_vec();
        let req = request("bucket", "c.txt", "a/b");

        let mut src: &[u8] = &content;
        let written = client
            .upload_file(&mut src, &req)
            .await
            .expect("upload failed");
        assert_eq!(written, content.len() as u64);
        assert!(adapter.contains("bucket", "a/b/c.txt"));

        let mut sink = Cursor::new(Vec::new());
        let read = client
            .download_file(&mut sink, &req)
            .await
            .expect("download failed");
        assert_eq!(read, content.len() as u64);
        assert_eq!(sink.into_inner(), content);
    }

    #[tokio::test]
    async fn test_upload_without_path() {
        let adapter = Arc::new(MockAdapter::new());
        let client = client_over(adapter.clone());

        let mut src: &[u8] = b"x";
        client
            .upload_file(&mut src, &request("bucket", "c.txt", ""))
            .await
            .expect("upload failed");

        assert!(adapter.contains("bucket", "c.txt"));
    }

    #[tokio::test]
    async fn test_download_missing_object() {
        let adapter = Arc::new(MockAdapter::new());
        let client = client_over(adapter);

        let mut sink = Cursor::new(Vec::new());
        let result = client
            .download_file(&mut sink, &request("bucket", "nope.txt", ""))
            .await;

        assert!(matches!(result, Err(StorageError::Inaccessible { .. })));
    }

    #[tokio::test]
    async fn test_read_at() {
        let adapter = Arc::new(MockAdapter::new().with_chunk_size(4));
        adapter.insert("bucket", "c.txt", b"0123456789".to_vec());
        let client = client_over(adapter);

        let req = request("bucket", "c.txt", "");

        let cases = vec![
            (0u64, 4usize, &b"0123"[..]),
            (3, 4, &b"3456"[..]),
            (7, 8, &b"789"[..]),
            (10, 4, &b""[..]),
            (42, 4, &b""[..]),
        ];

        for (offset, cap, expected) in cases {
            let mut buf = vec![0u8; cap];
            let n = client
                .read_at(&req, &mut buf, offset)
                .await
                .expect("read_at failed");

            assert_eq!(n, expected.len(), "failed on `n` for case: {}", offset);
            assert_eq!(&buf[..n], expected, "failed on content for case: {}", offset);
        }
    }

    #[tokio::test]
    async fn test_read_at_missing_object() {
        let adapter = Arc::new(MockAdapter::new());
        let client = client_over(adapter);

        let mut buf = [0u8; 8];
        let result = client
            .read_at(&request("bucket", "nope.txt", ""), &mut buf, 0)
            .await;

        assert!(matches!(result, Err(StorageError::Inaccessible { .. })));
    }

    #[tokio::test]
    async fn test_list_objects() {
        let adapter = Arc::new(MockAdapter::new().with_page_size(2));
        adapter.insert("bucket", "x", b"1".to_vec());
        adapter.insert("bucket", "y", b"2".to_vec());
        adapter.insert("bucket", "z", b"3".to_vec());
        adapter.insert("other", "w", b"4".to_vec());
        let client = client_over(adapter);

        let mut names = client
            .list_objects(&request("bucket", "", ""))
            .await
            .expect("list failed");
        names.sort();

        assert_eq!(names, vec!["x", "y", "z"]);
    }

    #[tokio::test]
    async fn test_list_objects_partial_on_error() {
        let adapter = Arc::new(MockAdapter::new().with_page_size(2).fail_list_at(2));
        adapter.insert("bucket", "x", b"1".to_vec());
        adapter.insert("bucket", "y", b"2".to_vec());
        adapter.insert("bucket", "z", b"3".to_vec());
        let client = client_over(adapter);

        let result = client.list_objects(&request("bucket", "", "")).await;

        match result {
            Err(StorageError::List { collected, .. }) => {
                assert_eq!(collected, vec!["x", "y"]);
            }
            other => panic!("expected list error, got: {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_delete_object() {
        let adapter = Arc::new(MockAdapter::new());
        adapter.insert("bucket", "a/b.txt", b"1".to_vec());
        let client = client_over(adapter.clone());

        client
            .delete_object(&request("bucket", "b.txt", "a"))
            .await
            .expect("delete failed");
        assert!(!adapter.contains("bucket", "a/b.txt"));

        // deleting again surfaces the backend's native not-found, wrapped
        let result = client.delete_object(&request("bucket", "b.txt", "a")).await;
        assert!(matches!(result, Err(StorageError::Delete { .. })));
    }

    // delete-one requires a path even though upload/download treat it as
    // optional; pins the observed contract
    #[tokio::test]
    async fn test_delete_object_path_required() {
        let adapter = Arc::new(MockAdapter::new());
        adapter.insert("bucket", "c.txt", b"1".to_vec());
        let client = client_over(adapter.clone());

        let result = client.delete_object(&request("bucket", "c.txt", "")).await;

        assert!(matches!(result, Err(StorageError::MissingFilePath)));
        assert!(adapter.contains("bucket", "c.txt"));
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_delete_objects() {
        let adapter = Arc::new(MockAdapter::new());
        adapter.insert("bucket", "x", b"1".to_vec());
        adapter.insert("bucket", "y", b"2".to_vec());
        let client = client_over(adapter.clone());

        client
            .delete_objects(&request("bucket", "", ""))
            .await
            .expect("delete all failed");

        let names = client
            .list_objects(&request("bucket", "", ""))
            .await
            .expect("list failed");
        assert!(names.is_empty());
    }

    #[tokio::test]
    async fn test_delete_objects_aborts_on_first_failure() {
        let adapter = Arc::new(MockAdapter::new().fail_delete_of("x"));
        adapter.insert("bucket", "x", b"1".to_vec());
        adapter.insert("bucket", "y", b"2".to_vec());
        let client = client_over(adapter.clone());

        let result = client.delete_objects(&request("bucket", "", "")).await;

        match result {
            Err(StorageError::Delete { key, .. }) => assert_eq!(key, "x"),
            other => panic!("expected delete error, got: {:?}", other),
        }
        // no rollback, but the failure stopped the remaining deletions
        assert!(adapter.contains("bucket", "y"));
    }

    #[tokio::test]
    async fn test_close_then_operate() {
        let adapter = Arc::new(MockAdapter::new());
        adapter.insert("bucket", "c.txt", b"1".to_vec());
        let client = client_over(adapter.clone());

        client.close().await.expect("close failed");
        assert!(adapter.closed.load(Ordering::SeqCst));

        let req = request("bucket", "c.txt", "");

        let mut src: &[u8] = b"data";
        assert!(matches!(
            client.upload_file(&mut src, &req).await,
            Err(StorageError::ClientClosed)
        ));

        let mut sink = Cursor::new(Vec::new());
        assert!(matches!(
            client.download_file(&mut sink, &req).await,
            Err(StorageError::ClientClosed)
        ));

        let mut buf = [0u8; 4];
        assert!(matches!(
            client.read_at(&req, &mut buf, 0).await,
            Err(StorageError::ClientClosed)
        ));

        assert!(matches!(
            client.list_objects(&req).await,
            Err(StorageError::ClientClosed)
        ));

        assert!(matches!(
            client.delete_objects(&req).await,
            Err(StorageError::ClientClosed)
        ));
    }
}
