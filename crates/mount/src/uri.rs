//! Remote URI parsing for mount targets.
//!
//! Supported forms:
//!
//! - `s3a://<accessKey>:<percent-encoded secretKey>@<bucket>/<prefix>`
//! - `s3a://<bucket>/<prefix>` (default AWS credential chain)
//! - `s3://...` and `s3n://...`, same shape as `s3a://`
//! - `file:///<absolute directory>`
//!
//! The secret key must already be percent-encoded when embedded; parsing
//! decodes it but never encodes anything. [`encode_secret_key`] is provided
//! for callers building a URI from raw keys.

use std::fmt;
use std::path::PathBuf;

use mount_ingest_file::{FileSource, S3Credentials};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::error::{MountError, Result};

/// Characters that cannot appear raw in the credential part of a URI.
const SECRET_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'#')
    .add(b'%')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b'?')
    .add(b'@');

/// S3 filesystem scheme. All three address the same store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum S3Scheme {
    S3a,
    S3,
    S3n,
}

impl S3Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            S3Scheme::S3a => "s3a",
            S3Scheme::S3 => "s3",
            S3Scheme::S3n => "s3n",
        }
    }
}

/// A parsed mount target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteUri {
    /// An S3 bucket, optionally narrowed to a key prefix
    S3 {
        scheme: S3Scheme,
        bucket: String,
        /// Key prefix without leading or trailing `/` (empty for the bucket root)
        prefix: String,
        credentials: Option<S3Credentials>,
    },
    /// A directory on the local filesystem
    Local { root: PathBuf },
}

impl RemoteUri {
    /// Parse a remote URI
    pub fn parse(uri: &str) -> Result<Self> {
        let invalid = |reason: &str| MountError::InvalidRemoteUri {
            uri: redact(uri),
            reason: reason.to_string(),
        };

        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| invalid("missing scheme (expected s3a://, s3://, s3n:// or file://)"))?;

        let scheme = match scheme {
            "s3a" => S3Scheme::S3a,
            "s3" => S3Scheme::S3,
            "s3n" => S3Scheme::S3n,
            "file" => {
                if !rest.starts_with('/') {
                    return Err(invalid("file URIs must name an absolute directory"));
                }
                let root = rest.trim_end_matches('/');
                let root = if root.is_empty() { "/" } else { root };
                return Ok(RemoteUri::Local {
                    root: PathBuf::from(root),
                });
            }
            other => {
                return Err(invalid(&format!(
                    "unsupported scheme '{other}' (expected s3a://, s3://, s3n:// or file://)"
                )));
            }
        };

        // Credentials are everything before the last '@'
        let (credentials, location) = match rest.rfind('@') {
            Some(at) => {
                let creds_part = &rest[..at];
                let (access_key, secret) = creds_part
                    .split_once(':')
                    .ok_or_else(|| invalid("credentials must be '<accessKey>:<secretKey>'"))?;
                if access_key.is_empty() {
                    return Err(invalid("access key is empty"));
                }
                if secret.is_empty() {
                    return Err(invalid("secret key is empty"));
                }
                if secret.contains('/') || access_key.contains('/') {
                    return Err(invalid(
                        "credentials contain a raw '/'; percent-encode it as %2F",
                    ));
                }
                let secret_key = percent_decode_str(secret)
                    .decode_utf8()
                    .map_err(|_| invalid("secret key is not valid percent-encoded UTF-8"))?
                    .into_owned();
                (
                    Some(S3Credentials::new(access_key, secret_key)),
                    &rest[at + 1..],
                )
            }
            None => (None, rest),
        };

        let (bucket, prefix) = match location.split_once('/') {
            Some((bucket, prefix)) => (bucket, prefix.trim_matches('/')),
            None => (location, ""),
        };
        validate_bucket(bucket).map_err(|reason| invalid(&reason))?;

        Ok(RemoteUri::S3 {
            scheme,
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            credentials,
        })
    }

    /// Build an `s3a://` URI from raw keys, percent-encoding the secret
    ///
    /// `bucket_path` is `<bucket>` or `<bucket>/<prefix>`.
    pub fn s3a_with_credentials(
        access_key: &str,
        secret_key: &str,
        bucket_path: &str,
    ) -> Result<Self> {
        Self::parse(&format!(
            "s3a://{access_key}:{}@{bucket_path}",
            encode_secret_key(secret_key)
        ))
    }

    /// The file source for `relative` underneath this target
    ///
    /// `relative` uses `/` separators and has no leading `/`; an empty string
    /// addresses the target itself.
    pub fn source_for(&self, relative: &str) -> FileSource {
        let relative = relative.trim_matches('/');
        match self {
            RemoteUri::S3 {
                bucket,
                prefix,
                credentials,
                ..
            } => {
                let key = match (prefix.is_empty(), relative.is_empty()) {
                    (true, _) => relative.to_string(),
                    (false, true) => prefix.clone(),
                    (false, false) => format!("{prefix}/{relative}"),
                };
                FileSource::S3 {
                    bucket: bucket.clone(),
                    key,
                    credentials: credentials.clone(),
                }
            }
            RemoteUri::Local { root } => {
                if relative.is_empty() {
                    FileSource::Local(root.clone())
                } else {
                    FileSource::Local(root.join(relative))
                }
            }
        }
    }
}

impl fmt::Display for RemoteUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteUri::S3 {
                scheme,
                bucket,
                prefix,
                credentials,
            } => {
                write!(f, "{}://", scheme.as_str())?;
                if let Some(credentials) = credentials {
                    write!(f, "{}:***@", credentials.access_key)?;
                }
                write!(f, "{bucket}")?;
                if !prefix.is_empty() {
                    write!(f, "/{prefix}")?;
                }
                Ok(())
            }
            RemoteUri::Local { root } => write!(f, "file://{}", root.display()),
        }
    }
}

/// Percent-encode a raw secret key so it can be embedded in a remote URI
pub fn encode_secret_key(secret_key: &str) -> String {
    utf8_percent_encode(secret_key, SECRET_ENCODE_SET).to_string()
}

/// Mask the secret of a credential-bearing URI for error messages and logs
pub fn redact(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return uri.to_string();
    };
    match rest.rfind('@') {
        Some(at) => {
            let creds = &rest[..at];
            let access = creds.split_once(':').map_or(creds, |(access, _)| access);
            format!("{scheme}://{access}:***@{}", &rest[at + 1..])
        }
        None => uri.to_string(),
    }
}

fn validate_bucket(bucket: &str) -> std::result::Result<(), String> {
    if bucket.is_empty() {
        return Err("bucket name is empty".to_string());
    }
    if !(3..=63).contains(&bucket.len()) {
        return Err(format!(
            "bucket name '{bucket}' must be between 3 and 63 characters"
        ));
    }
    if let Some(c) = bucket
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '.'))
    {
        return Err(format!(
            "bucket name '{bucket}' contains invalid character '{c}'"
        ));
    }
    Ok(())
}
