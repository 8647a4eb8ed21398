use std::path::Path;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use futures::StreamExt;
use google_cloud_storage::client::{google_cloud_auth, Client, ClientConfig};
use google_cloud_storage::http::objects::{
    delete::DeleteObjectRequest,
    download::Range,
    get::GetObjectRequest,
    list::ListObjectsRequest,
    upload::{Media, UploadObjectRequest, UploadType},
    Object,
};

use crate::adapters::{self, ChunkStream, ObjectAttrs, ObjectPage};
use crate::model::error::AdapterError;

/// Builds an authenticated GCS client. Credentials are passed explicitly
/// rather than through `GOOGLE_APPLICATION_CREDENTIALS`, so two clients in
/// the same process can use different service accounts.
pub async fn connect(credentials: Option<&Path>) -> Result<Client, AdapterError> {
    let config = match credentials {
        Some(path) => {
            let creds = google_cloud_auth::credentials::CredentialsFile::new_from_file(
                path.display().to_string(),
            )
            .await
            .map_err(|err| AdapterError::Service(err.to_string()))?;

            ClientConfig::default()
                .with_credentials(creds)
                .await
                .map_err(|err| AdapterError::Service(err.to_string()))?
        }
        None => ClientConfig::default()
            .with_auth()
            .await
            .map_err(|err| AdapterError::Service(err.to_string()))?,
    };

    Ok(Client::new(config))
}

fn map_http_err(key: &str, err: google_cloud_storage::http::Error) -> AdapterError {
    if let google_cloud_storage::http::Error::Response(ref resp) = err {
        if resp.code == 404 {
            return AdapterError::NotFound(key.to_string());
        }
    }

    AdapterError::Service(err.to_string())
}

fn to_system_time(ts: Option<time::OffsetDateTime>) -> SystemTime {
    match ts {
        Some(ts) => SystemTime::UNIX_EPOCH + Duration::from_secs(ts.unix_timestamp().max(0) as u64),
        None => SystemTime::UNIX_EPOCH,
    }
}

fn to_attrs(obj: &Object) -> ObjectAttrs {
    ObjectAttrs {
        key: obj.name.clone(),
        size: obj.size,
        created: to_system_time(obj.time_created),
        updated: to_system_time(obj.updated),
    }
}

#[async_trait]
impl adapters::ObjectAdapter for Client {
    async fn cs_put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), AdapterError> {
        let req = UploadObjectRequest {
            bucket: bucket.to_string(),
            ..Default::default()
        };

        self.upload_object(&req, body, &UploadType::Simple(Media::new(key.to_string())))
            .await
            .map_err(|err| map_http_err(key, err))?;

        Ok(())
    }

    async fn cs_object_attrs(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<ObjectAttrs, AdapterError> {
        let req = GetObjectRequest {
            bucket: bucket.to_string(),
            object: key.to_string(),
            ..Default::default()
        };

        let obj = self
            .get_object(&req)
            .await
            .map_err(|err| map_http_err(key, err))?;

        Ok(to_attrs(&obj))
    }

    async fn cs_open_read_stream(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<ChunkStream, AdapterError> {
        let req = GetObjectRequest {
            bucket: bucket.to_string(),
            object: key.to_string(),
            ..Default::default()
        };

        let stream = self
            .download_streamed_object(&req, &Range::default())
            .await
            .map_err(|err| map_http_err(key, err))?;

        let key = key.to_string();
        Ok(Box::pin(stream.map(move |chunk| {
            chunk.map_err(|err| map_http_err(&key, err))
        })))
    }

    async fn cs_delete_object(&self, bucket: &str, key: &str) -> Result<(), AdapterError> {
        let req = DeleteObjectRequest {
            bucket: bucket.to_string(),
            object: key.to_string(),
            ..Default::default()
        };

        self.delete_object(&req)
            .await
            .map_err(|err| map_http_err(key, err))
    }

    async fn cs_list_page(
        &self,
        bucket: &str,
        page_token: Option<String>,
    ) -> Result<ObjectPage, AdapterError> {
        let req = ListObjectsRequest {
            bucket: bucket.to_string(),
            page_token,
            ..Default::default()
        };

        let lo = self
            .list_objects(&req)
            .await
            .map_err(|err| map_http_err(bucket, err))?;

        let objects = lo.items.unwrap_or_default().iter().map(to_attrs).collect();

        Ok(ObjectPage {
            objects,
            next_page_token: lo.next_page_token,
        })
    }
}
