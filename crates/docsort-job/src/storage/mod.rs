use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    Client,
};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

pub mod config;

pub use config::StorageConfig;

/// Remote object store the job lists, downloads from, and publishes to
///
/// The production implementation is [`S3Storage`]; tests substitute an
/// in-memory double.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List all object keys under a prefix
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Fetch an object, returning None when the key does not exist
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Download an object to a local path, creating parent directories
    async fn download_to(&self, key: &str, dest: &Path) -> Result<()>;

    /// Upload a local file to a key
    ///
    /// A missing local path is logged as a warning and is a no-op, not an
    /// error.
    async fn upload_file(&self, source: &Path, key: &str) -> Result<()>;

    /// Upload a byte buffer to a key
    async fn upload_bytes(&self, key: &str, data: Vec<u8>) -> Result<UploadResult>;
}

/// Whether an object key names an archive this job processes
pub fn is_archive_key(key: &str) -> bool {
    key.to_ascii_lowercase().ends_with(".zip")
}

#[derive(Debug, Clone)]
pub struct UploadResult {
    pub key: String,
    pub checksum: String,
    pub size: i64,
}

/// S3-backed [`ObjectStore`]
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    pub async fn new(config: StorageConfig) -> Result<Self> {
        debug!("Initializing storage with config: {:?}", config);

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "docsort-storage",
        );

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let s3_config = s3_config_builder.build();
        let client = Client::from_conf(s3_config);

        info!("Storage client initialized for bucket: {}", config.bucket);

        Ok(Self {
            client,
            bucket: config.bucket,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3Storage {
    #[instrument(skip(self))]
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        debug!("Listing objects in s3://{}/{}", self.bucket, prefix);

        let response = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .send()
            .await
            .context("Failed to list S3 objects")?;

        let keys: Vec<String> = response
            .contents()
            .iter()
            .filter_map(|obj| obj.key().map(|k| k.to_string()))
            .collect();

        debug!("Listed {} objects under s3://{}/{}", keys.len(), self.bucket, prefix);

        Ok(keys)
    }

    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        debug!("Fetching s3://{}/{}", self.bucket, key);

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match response {
            Ok(output) => {
                let data = output
                    .body
                    .collect()
                    .await
                    .context("Failed to read S3 response body")?
                    .into_bytes()
                    .to_vec();
                debug!("Fetched {} bytes from s3://{}/{}", data.len(), self.bucket, key);
                Ok(Some(data))
            },
            Err(e) => {
                let service = e.into_service_error();
                if service.is_no_such_key() || service.to_string().contains("NotFound") {
                    Ok(None)
                } else {
                    Err(anyhow!("Failed to fetch from S3: {}: {}", key, service))
                }
            },
        }
    }

    #[instrument(skip(self))]
    async fn download_to(&self, key: &str, dest: &Path) -> Result<()> {
        let data = self
            .get(key)
            .await?
            .with_context(|| format!("Object not found in S3: {}", key))?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        tokio::fs::write(dest, &data)
            .await
            .with_context(|| format!("Failed to write {}", dest.display()))?;

        info!(
            "Downloaded s3://{}/{} to {} ({} bytes)",
            self.bucket,
            key,
            dest.display(),
            data.len()
        );

        Ok(())
    }

    #[instrument(skip(self))]
    async fn upload_file(&self, source: &Path, key: &str) -> Result<()> {
        if !source.exists() {
            warn!("Unable to upload {}. File not found: {}", key, source.display());
            return Ok(());
        }

        let body = ByteStream::from_path(source)
            .await
            .with_context(|| format!("Failed to open {}", source.display()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .with_context(|| format!("Failed to upload to S3: {}", key))?;

        info!("Successfully uploaded to s3://{}/{}", self.bucket, key);

        Ok(())
    }

    #[instrument(skip(self, data))]
    async fn upload_bytes(&self, key: &str, data: Vec<u8>) -> Result<UploadResult> {
        let checksum = calculate_sha256(&data);
        let size = data.len() as i64;

        debug!("Uploading {} bytes to s3://{}/{}", size, self.bucket, key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .with_context(|| format!("Failed to upload to S3: {}", key))?;

        info!("Successfully uploaded to s3://{}/{}", self.bucket, key);

        Ok(UploadResult {
            key: key.to_string(),
            checksum,
            size,
        })
    }
}

fn calculate_sha256(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
