use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{ObjectCannedAcl, Permission};
use aws_sdk_s3::{Client, config::BehaviorVersion, config::Credentials, config::Region};
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

use super::{ObjectStore, StorageError, StorageResult, finish_download, partial_path};

const ALL_USERS_GROUP: &str = "http://acs.amazonaws.com/groups/global/AllUsers";

/// S3 (or MinIO) backed object store.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    region: String,
    endpoint: Option<String>,
}

impl S3Store {
    /// `endpoint` is set for S3-compatible providers such as MinIO; those
    /// are addressed path-style.
    pub fn new(endpoint: Option<&str>, region: &str, access_key: &str, secret_key: &str) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "static");

        let mut builder = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials);

        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let client = Client::from_conf(builder.build());

        info!(region, endpoint = ?endpoint, "S3 client configured");

        Self {
            client,
            region: region.to_string(),
            endpoint: endpoint.map(str::to_string),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> StorageResult<u64> {
        let start = Instant::now();

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match &e {
                SdkError::ServiceError(service_err)
                    if matches!(service_err.err(), GetObjectError::NoSuchKey(_))
                        || service_err.raw().status().as_u16() == 404 =>
                {
                    StorageError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                }
                _ => {
                    error!(
                        error = %DisplayErrorContext(&e),
                        bucket,
                        key,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "S3 download failed"
                    );
                    StorageError::Transfer(DisplayErrorContext(&e).to_string())
                }
            })?;

        let part = partial_path(dest);
        let written = async {
            let mut file = tokio::fs::File::create(&part).await?;
            let mut body = response.body.into_async_read();
            let bytes = tokio::io::copy(&mut body, &mut file).await?;
            file.flush().await?;
            file.sync_all().await?;
            Ok::<u64, std::io::Error>(bytes)
        }
        .await;

        let bytes = finish_download(&part, dest, written).await?;

        info!(
            bucket,
            key,
            dest = %dest.display(),
            size_bytes = bytes,
            duration_ms = start.elapsed().as_millis() as u64,
            "s3://{}/{} downloaded",
            bucket,
            key
        );

        Ok(bytes)
    }

    async fn upload(&self, bucket: &str, key: &str, source: &Path) -> StorageResult<u64> {
        let start = Instant::now();
        let size = tokio::fs::metadata(source).await?.len();

        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| StorageError::Transfer(e.to_string()))?;
        let content_type = mime_guess::from_path(key).first_or_octet_stream();

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type.essence_str())
            .send()
            .await
            .map_err(|e| {
                error!(
                    error = %DisplayErrorContext(&e),
                    bucket,
                    key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "S3 upload failed"
                );
                StorageError::Transfer(DisplayErrorContext(&e).to_string())
            })?;

        info!(
            bucket,
            key,
            size_bytes = size,
            duration_ms = start.elapsed().as_millis() as u64,
            "{} uploaded to s3://{}/{}",
            source.display(),
            bucket,
            key
        );

        Ok(size)
    }

    async fn make_public(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.client
            .put_object_acl()
            .bucket(bucket)
            .key(key)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| StorageError::Visibility(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }

    async fn is_public(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        let acl = self
            .client
            .get_object_acl()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Visibility(DisplayErrorContext(&e).to_string()))?;

        Ok(acl.grants().iter().any(|grant| {
            let everyone = grant
                .grantee()
                .and_then(|grantee| grantee.uri())
                .is_some_and(|uri| uri == ALL_USERS_GROUP);
            let readable = matches!(
                grant.permission(),
                Some(Permission::Read) | Some(Permission::FullControl)
            );
            everyone && readable
        }))
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        match self.endpoint {
            Some(ref endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key),
            None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, self.region, key),
        }
    }
}
