use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::{DateTime, DateTimeFormat};
use aws_sdk_s3::Client;
use axum::body::Body;
use tokio_util::io::ReaderStream;
use tracing::debug;

use super::{FetchConditions, FetchStatus, ObjectMetadata, ObjectStore, StoredObject};
use crate::error::IoError;
use crate::grant::normalize_prefix;

/// S3-backed implementation of [`ObjectStore`].
///
/// Object paths are used as keys, optionally under a fixed key prefix. The
/// prefix is a deployment detail: signatures only ever cover the public path.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    key_prefix: String,
}

impl S3ObjectStore {
    /// Create a store for the given bucket.
    ///
    /// # Arguments
    /// * `client` - AWS S3 client to use for requests
    /// * `bucket` - S3 bucket holding the media objects
    pub fn new(client: Client, bucket: String) -> Self {
        Self {
            client,
            bucket,
            key_prefix: String::new(),
        }
    }

    /// Place every object under `prefix` inside the bucket.
    ///
    /// The prefix is normalized like an object path; one that normalizes to
    /// nothing is ignored.
    pub fn with_key_prefix(mut self, prefix: &str) -> Self {
        self.key_prefix = normalize_prefix(prefix).unwrap_or_default();
        self
    }

    /// Get the bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Get the key prefix (empty or ending in `/`).
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Full S3 key for an object path.
    pub fn object_key(&self, path: &str) -> String {
        format!("{}{}", self.key_prefix, path)
    }
}

fn parse_http_date(value: Option<&str>) -> Option<DateTime> {
    value.and_then(|v| DateTime::from_str(v, DateTimeFormat::HttpDate).ok())
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(
        &self,
        key: &str,
        conditions: &FetchConditions,
    ) -> Result<StoredObject, IoError> {
        let full_key = self.object_key(key);

        // Unparsable dates are ignored, as an HTTP origin would.
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .set_range(conditions.range.clone())
            .set_if_none_match(conditions.if_none_match.clone())
            .set_if_match(conditions.if_match.clone())
            .set_if_modified_since(parse_http_date(conditions.if_modified_since.as_deref()))
            .set_if_unmodified_since(parse_http_date(conditions.if_unmodified_since.as_deref()))
            .send()
            .await;

        let resp = match resp {
            Ok(resp) => resp,
            Err(e) => {
                let missing = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                return self.classify_error(&full_key, e, missing);
            }
        };

        let metadata = ObjectMetadata {
            content_type: resp.content_type().map(|v| v.to_string()),
            content_length: resp
                .content_length()
                .and_then(|len| u64::try_from(len).ok()),
            content_range: resp.content_range().map(|v| v.to_string()),
            content_encoding: resp.content_encoding().map(|v| v.to_string()),
            accept_ranges: resp.accept_ranges().map(|v| v.to_string()),
            etag: resp.e_tag().map(|v| v.to_string()),
            last_modified: resp
                .last_modified()
                .and_then(|d| d.fmt(DateTimeFormat::HttpDate).ok()),
        };

        let status = if metadata.content_range.is_some() {
            FetchStatus::Partial
        } else {
            FetchStatus::Full
        };

        // Chunks are relayed as S3 delivers them.
        let body = Body::from_stream(ReaderStream::new(resp.body.into_async_read()));

        Ok(StoredObject {
            status,
            metadata,
            body,
        })
    }

    async fn head_object(
        &self,
        key: &str,
        conditions: &FetchConditions,
    ) -> Result<StoredObject, IoError> {
        let full_key = self.object_key(key);

        let resp = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .set_if_none_match(conditions.if_none_match.clone())
            .set_if_match(conditions.if_match.clone())
            .set_if_modified_since(parse_http_date(conditions.if_modified_since.as_deref()))
            .set_if_unmodified_since(parse_http_date(conditions.if_unmodified_since.as_deref()))
            .send()
            .await;

        let resp = match resp {
            Ok(resp) => resp,
            Err(e) => {
                let missing = e
                    .as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false);
                return self.classify_error(&full_key, e, missing);
            }
        };

        let metadata = ObjectMetadata {
            content_type: resp.content_type().map(|v| v.to_string()),
            content_length: resp
                .content_length()
                .and_then(|len| u64::try_from(len).ok()),
            content_encoding: resp.content_encoding().map(|v| v.to_string()),
            accept_ranges: resp.accept_ranges().map(|v| v.to_string()),
            etag: resp.e_tag().map(|v| v.to_string()),
            last_modified: resp
                .last_modified()
                .and_then(|d| d.fmt(DateTimeFormat::HttpDate).ok()),
            content_range: None,
        };

        Ok(StoredObject::without_body(FetchStatus::Full, metadata))
    }

    fn describe(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, self.object_key(key))
    }
}

impl S3ObjectStore {
    /// Map an S3 failure onto a store outcome.
    ///
    /// S3 reports 304/412/416 as errors; those are legitimate responses to
    /// conditional and range requests and are relayed without a body.
    /// `missing` is the operation's own "no such key" verdict.
    fn classify_error<E>(
        &self,
        full_key: &str,
        e: SdkError<E, HttpResponse>,
        missing: bool,
    ) -> Result<StoredObject, IoError> {
        let location = format!("s3://{}/{}", self.bucket, full_key);

        if let SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) = &e {
            return Err(IoError::Connection(e.to_string()));
        }

        if missing {
            return Err(IoError::NotFound(location));
        }

        let Some(raw) = e.raw_response() else {
            return Err(IoError::S3(e.to_string()));
        };

        let header = |name: &str| raw.headers().get(name).map(|v| v.to_string());
        let status = match raw.status().as_u16() {
            404 => return Err(IoError::NotFound(location)),
            304 => FetchStatus::NotModified,
            412 => FetchStatus::PreconditionFailed,
            416 => FetchStatus::RangeNotSatisfiable,
            _ => return Err(IoError::S3(e.to_string())),
        };

        debug!(key = %location, status = ?status, "Store answered without a body");

        Ok(StoredObject::without_body(
            status,
            ObjectMetadata {
                etag: header("etag"),
                last_modified: header("last-modified"),
                content_range: header("content-range"),
                ..ObjectMetadata::default()
            },
        ))
    }
}

/// Create an S3 client with optional custom endpoint and region.
///
/// Use a custom endpoint for S3-compatible services like MinIO:
/// ```ignore
/// let client = create_s3_client(Some("http://localhost:9000"), "us-east-1").await;
/// ```
pub async fn create_s3_client(endpoint_url: Option<&str>, region: &str) -> Client {
    let region = aws_config::Region::new(region.to_string());
    let mut config_loader =
        aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

    if let Some(endpoint) = endpoint_url {
        config_loader = config_loader.endpoint_url(endpoint);
    }

    let sdk_config = config_loader.load().await;

    // S3-compatible services generally need path-style addressing
    let s3_config = if endpoint_url.is_some() {
        aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build()
    } else {
        aws_sdk_s3::config::Builder::from(&sdk_config).build()
    };

    Client::from_conf(s3_config)
}
