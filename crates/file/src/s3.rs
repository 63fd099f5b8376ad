//! S3 file reader implementation with prefix listing support

use crate::FileEntry;
use anyhow::{Context, Result};
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};

/// Region used when neither the environment nor a profile names one
const FALLBACK_REGION: &str = "us-east-1";

/// Static access key pair used instead of the default AWS provider chain
#[derive(Clone, PartialEq, Eq)]
pub struct S3Credentials {
    pub access_key: String,
    /// Plain (already percent-decoded) secret key
    pub secret_key: String,
}

impl S3Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }
}

impl std::fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .finish()
    }
}

/// Shared S3 client for efficient operations
///
/// Creating an S3 client is relatively expensive, so this struct allows
/// reusing the client across multiple operations.
pub struct S3Client {
    client: aws_sdk_s3::Client,
}

impl S3Client {
    /// Create a new S3 client
    ///
    /// Static credentials take precedence over the default provider chain.
    pub async fn new(credentials: Option<S3Credentials>) -> Result<Self> {
        let region = RegionProviderChain::default_provider().or_else(Region::new(FALLBACK_REGION));
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);
        if let Some(credentials) = credentials {
            tracing::debug!(
                "Using static S3 credentials for access key {}",
                credentials.access_key
            );
            loader = loader.credentials_provider(Credentials::new(
                credentials.access_key,
                credentials.secret_key,
                None,
                None,
                "mount-ingest",
            ));
        }
        let sdk_config = loader.load().await;
        let client = aws_sdk_s3::Client::new(&sdk_config);
        Ok(Self { client })
    }

    /// List the immediate children of a prefix (objects and common prefixes)
    ///
    /// Entry names are relative to `prefix`; common prefixes keep their
    /// trailing `/`.
    pub async fn list_prefix(&self, bucket: &str, prefix: &str) -> Result<Vec<FileEntry>> {
        let mut results = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .delimiter("/"); // Use delimiter to get only immediate children

            if let Some(token) = &continuation_token {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .with_context(|| format!("Failed to list S3 prefix: s3://{bucket}/{prefix}"))?;

            if let Some(contents) = response.contents {
                for object in contents {
                    let Some(key) = object.key else { continue };
                    // Skip the prefix itself and "directory" markers
                    if key == prefix || key.ends_with('/') {
                        continue;
                    }
                    results.push(FileEntry {
                        name: key[prefix.len()..].to_string(),
                        path: format!("s3://{bucket}/{key}"),
                        size: object.size.unwrap_or(0).max(0) as u64,
                        is_dir: false,
                    });
                }
            }

            if let Some(common_prefixes) = response.common_prefixes {
                for common in common_prefixes {
                    let Some(sub) = common.prefix else { continue };
                    results.push(FileEntry {
                        name: sub[prefix.len()..].to_string(),
                        path: format!("s3://{bucket}/{sub}"),
                        size: 0,
                        is_dir: true,
                    });
                }
            }

            // Handle pagination
            if response.is_truncated == Some(true) {
                continuation_token = response.next_continuation_token;
            } else {
                break;
            }
        }

        // Sort for consistent ordering
        results.sort_by(|a, b| a.name.cmp(&b.name));

        tracing::debug!(
            "Listed {} entries in S3 prefix: s3://{}/{}",
            results.len(),
            bucket,
            prefix
        );

        Ok(results)
    }

    /// Size of an object, or `None` if no object exists under `key`
    pub async fn object_size(&self, bucket: &str, key: &str) -> Result<Option<u64>> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(output) => Ok(Some(output.content_length.unwrap_or(0).max(0) as u64)),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(None),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to stat S3 object: s3://{bucket}/{key}")),
        }
    }

    /// Whether an object exists under exactly `key`
    pub async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        Ok(self.object_size(bucket, key).await?.is_some())
    }

    /// Fetch at most the first `max_bytes` of an object
    pub async fn read_range(&self, bucket: &str, key: &str, max_bytes: usize) -> Result<Vec<u8>> {
        if max_bytes == 0 {
            return Ok(Vec::new());
        }
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .range(format!("bytes=0-{}", max_bytes - 1))
            .send()
            .await
            .with_context(|| format!("Failed to fetch object from S3: s3://{bucket}/{key}"))?;

        let body = response
            .body
            .collect()
            .await
            .with_context(|| format!("Failed to read object body: s3://{bucket}/{key}"))?;

        let mut bytes = body.into_bytes().to_vec();
        bytes.truncate(max_bytes);
        Ok(bytes)
    }

    /// Open an S3 object for reading
    pub async fn open(
        &self,
        bucket: &str,
        key: &str,
        buffer_size: usize,
    ) -> Result<Box<dyn std::io::Read + Send>> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to fetch object from S3: s3://{bucket}/{key}"))?;

        // Convert byte stream to async read
        let stream = response.body.into_async_read();

        // Wrap in buffered reader
        let buffered = tokio::io::BufReader::with_capacity(buffer_size, stream);

        // Bridge async to sync
        let reader = tokio_util::io::SyncIoBridge::new(buffered);

        Ok(Box::new(reader))
    }
}

/// Reads a file from S3 with configurable buffering
pub struct S3FileReader;

impl S3FileReader {
    /// Open an S3 object and return a buffered, sync-compatible reader
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `key` - S3 object key
    /// * `credentials` - Static credentials, or `None` for the default chain
    /// * `buffer_size` - Size of the buffer in bytes (e.g., 1MB = 1024 * 1024)
    pub async fn open(
        bucket: &str,
        key: &str,
        credentials: Option<S3Credentials>,
        buffer_size: usize,
    ) -> Result<Box<dyn std::io::Read + Send>> {
        let client = S3Client::new(credentials).await?;
        client.open(bucket, key, buffer_size).await
    }
}
