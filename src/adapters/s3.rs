use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;

use crate::adapters::{self, ChunkStream, ObjectAttrs, ObjectPage};
use crate::model::error::AdapterError;

/// Builds an S3 client from the ambient AWS environment (credential chain,
/// region). S3 has no service-account file, so the explicit credentials
/// setting of the client config does not apply here.
pub async fn connect() -> aws_sdk_s3::Client {
    let config = aws_config::load_from_env().await;
    aws_sdk_s3::Client::new(&config)
}

fn to_system_time(ts: Option<&aws_sdk_s3::primitives::DateTime>) -> SystemTime {
    match ts {
        Some(ts) => SystemTime::UNIX_EPOCH + Duration::new(ts.secs().max(0) as u64, ts.subsec_nanos()),
        None => SystemTime::UNIX_EPOCH,
    }
}

#[async_trait]
impl adapters::ObjectAdapter for aws_sdk_s3::Client {
    async fn cs_put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), AdapterError> {
        self.put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|err| AdapterError::Service(err.to_string()))?;

        Ok(())
    }

    async fn cs_object_attrs(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<ObjectAttrs, AdapterError> {
        let ho = match self.head_object().bucket(bucket).key(key).send().await {
            Err(err) => {
                if let Some(svc_err) = err.as_service_error() {
                    if svc_err.is_not_found() {
                        return Err(AdapterError::NotFound(key.to_string()));
                    }
                }

                return Err(AdapterError::Service(err.to_string()));
            }
            Ok(ho) => ho,
        };

        // S3 carries no creation time; last-modified stands in for both.
        let updated = to_system_time(ho.last_modified());

        Ok(ObjectAttrs {
            key: key.to_string(),
            size: ho.content_length().unwrap_or(0),
            created: updated,
            updated,
        })
    }

    async fn cs_open_read_stream(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<ChunkStream, AdapterError> {
        let o = match self.get_object().bucket(bucket).key(key).send().await {
            Err(err) => {
                if let Some(svc_err) = err.as_service_error() {
                    if svc_err.is_no_such_key() {
                        return Err(AdapterError::NotFound(key.to_string()));
                    }
                }

                return Err(AdapterError::Service(err.to_string()));
            }
            Ok(o) => o,
        };

        let bytes = o
            .body
            .collect()
            .await
            .map_err(|err| AdapterError::Service(err.to_string()))?
            .into_bytes();

        Ok(Box::pin(futures::stream::iter(vec![Ok(bytes)])))
    }

    async fn cs_delete_object(&self, bucket: &str, key: &str) -> Result<(), AdapterError> {
        self.delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| AdapterError::Service(err.to_string()))?;

        Ok(())
    }

    async fn cs_list_page(
        &self,
        bucket: &str,
        page_token: Option<String>,
    ) -> Result<ObjectPage, AdapterError> {
        let mut req = self.list_objects_v2().bucket(bucket);

        if let Some(tok) = page_token {
            req = req.continuation_token(tok);
        }

        let lo = req
            .send()
            .await
            .map_err(|err| AdapterError::Service(err.to_string()))?;

        let mut objects = Vec::new();
        for o in lo.contents() {
            let updated = to_system_time(o.last_modified());

            objects.push(ObjectAttrs {
                key: o.key().unwrap_or("").to_string(),
                size: o.size().unwrap_or(0),
                created: updated,
                updated,
            });
        }

        Ok(ObjectPage {
            objects,
            next_page_token: lo.next_continuation_token().map(|tok| tok.to_string()),
        })
    }
}
