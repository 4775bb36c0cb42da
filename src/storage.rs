//! Concrete object-storage hook: S3-compatible upload client.
//!
//! Implements [`ObjectStore`] over the AWS S3 API. Credentials come from the
//! SDK's default provider chain; `S3_ENDPOINT_URL` switches the client to an
//! S3-compatible endpoint (MinIO, LocalStack) with path-style addressing.

use std::env;
use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use sha2::{Digest, Sha256};
use tracing::{error, info};

use crate::contract::{HookError, ObjectStore};

pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    /// Build a store from the ambient AWS configuration, honouring an
    /// optional `S3_ENDPOINT_URL` override.
    pub async fn new_from_env() -> Result<Self, HookError> {
        dotenvy::dotenv().ok();
        let base = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;
        let mut builder = aws_sdk_s3::config::Builder::from(&base);
        if let Ok(endpoint) = env::var("S3_ENDPOINT_URL") {
            info!(endpoint = %endpoint, "Using custom S3 endpoint");
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
        })
    }

    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn upload_file(
        &self,
        local_path: &Path,
        key: &str,
        bucket: &str,
        overwrite: bool,
    ) -> Result<(), HookError> {
        if !overwrite {
            match self
                .client
                .head_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
            {
                Ok(_) => {
                    error!(bucket, key, "Object already exists and overwrite is disabled");
                    return Err(format!("object already exists at {bucket}/{key}").into());
                }
                Err(err) => {
                    let service_err = err.into_service_error();
                    if !service_err.is_not_found() {
                        error!(bucket, key, "Failed to probe existing object: {service_err}");
                        return Err(Box::new(service_err));
                    }
                }
            }
        }

        let content = std::fs::read(local_path)?;
        let digest = {
            let mut hasher = Sha256::new();
            hasher.update(&content);
            format!("{:x}", hasher.finalize())
        };
        info!(
            bucket,
            key,
            bytes = content.len(),
            sha256 = %digest,
            "Uploading file to object storage"
        );

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .metadata("content-sha256", &digest)
            .body(ByteStream::from(content))
            .send()
            .await
            .map_err(|e| -> HookError {
                error!(bucket, key, "Upload failed: {}", DisplayErrorContext(&e));
                format!("S3 put_object failed: {}", DisplayErrorContext(&e)).into()
            })?;

        info!(bucket, key, "Upload succeeded");
        Ok(())
    }

    async fn close(&self) -> Result<(), HookError> {
        // The SDK pools connections internally; dropping the client is the
        // actual release. The explicit step keeps the hook contract visible.
        info!("Released object-storage connection");
        Ok(())
    }
}
