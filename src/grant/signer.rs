//! Issuing signed access URLs.
//!
//! The signer runs inside the trusted origin service. It assumes the caller
//! has already decided the subject may see the object, and only encodes that
//! decision into a time-boxed URL scoped to a directory prefix.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use media_gateway::grant::{Signer, Subject};
//!
//! let signer = Signer::new("my-secret-key", "https://media.example.com").unwrap();
//! let subject = Subject::new("user-42", "course-x", "lesson-1");
//! let path = "resources/course-x/lesson-1/index.m3u8";
//! let issued = signer
//!     .issue(path, &subject, "GET", Duration::from_secs(300))
//!     .unwrap();
//!
//! assert!(issued.url.starts_with("https://media.example.com/resources/course-x/lesson-1/"));
//! assert_eq!(issued.signed_prefix, "resources/course-x/lesson-1/");
//! ```

use std::sync::Arc;
use std::time::Duration;

use url::form_urlencoded;

use super::canonical::{CanonicalMessage, GrantKey, Subject};
use super::path::{is_within_prefix, normalize_object_path, normalize_prefix, signed_prefix_for};
use super::{
    PARAM_CONTENT, PARAM_COURSE, PARAM_EXPIRES, PARAM_SIGNATURE, PARAM_SIGNED_PREFIX, PARAM_USER,
};
use crate::clock::{Clock, SystemClock};
use crate::error::{ConfigurationError, SignerError};

/// Default TTL for viewing content in a browser or player.
pub const VIEW_TTL: Duration = Duration::from_secs(300);

/// TTL for short server-to-server proxied reads.
pub const PROXY_TTL: Duration = Duration::from_secs(60);

/// TTL for direct browser uploads from the admin console.
pub const UPLOAD_TTL: Duration = Duration::from_secs(900);

/// What a grant is for. Each purpose implies a method and a TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum GrantPurpose {
    /// Playback or document viewing (GET, 5 minutes)
    #[default]
    View,
    /// Origin-side proxied read (GET, 1 minute)
    Proxy,
    /// Direct upload (PUT, 15 minutes)
    ///
    /// These grants are honored by the separate upload endpoint. This gateway
    /// only serves GET and HEAD, so it never accepts them.
    Upload,
}

impl GrantPurpose {
    /// HTTP method the grant authorizes.
    pub const fn method(&self) -> &'static str {
        match self {
            GrantPurpose::View | GrantPurpose::Proxy => "GET",
            GrantPurpose::Upload => "PUT",
        }
    }

    /// Lifetime of the grant.
    pub const fn ttl(&self) -> Duration {
        match self {
            GrantPurpose::View => VIEW_TTL,
            GrantPurpose::Proxy => PROXY_TTL,
            GrantPurpose::Upload => UPLOAD_TTL,
        }
    }
}

/// A signed URL and the facts it encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedUrl {
    /// Complete URL including the query string
    pub url: String,

    /// Query string only (no leading `?`)
    pub query: String,

    /// Normalized object path
    pub object_path: String,

    /// Directory prefix the signature covers
    pub signed_prefix: String,

    /// Expiry in milliseconds since the Unix epoch
    pub expires_at: u64,

    /// Hex-encoded HMAC-SHA256 signature
    pub signature: String,
}

/// Issues signed, prefix-scoped access URLs.
#[derive(Clone)]
pub struct Signer {
    key: GrantKey,
    base_url: String,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Signer {
    /// Create a signer for the gateway at `base_url`.
    ///
    /// Fails when either value is missing; callers must treat that as fatal
    /// rather than serving unsigned links.
    pub fn new(secret: impl AsRef<[u8]>, base_url: &str) -> Result<Self, ConfigurationError> {
        let key = GrantKey::new(secret);
        if key.is_empty() {
            return Err(ConfigurationError::MissingSecret);
        }

        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ConfigurationError::MissingBaseUrl);
        }
        url::Url::parse(base_url)
            .map_err(|e| ConfigurationError::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;

        Ok(Self {
            key,
            base_url: base_url.to_string(),
            clock: Arc::new(SystemClock),
        })
    }

    /// Create a signer from optional configuration values.
    pub fn from_config(
        secret: Option<&str>,
        base_url: Option<&str>,
    ) -> Result<Self, ConfigurationError> {
        let secret = secret.ok_or(ConfigurationError::MissingSecret)?;
        let base_url = base_url.ok_or(ConfigurationError::MissingBaseUrl)?;
        Self::new(secret, base_url)
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The gateway origin URLs are issued against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a grant for one object, scoped to its directory.
    pub fn issue(
        &self,
        object_path: &str,
        subject: &Subject,
        method: &str,
        ttl: Duration,
    ) -> Result<IssuedUrl, SignerError> {
        let path = normalized_non_empty(object_path)?;
        let prefix = signed_prefix_for(&path);
        self.issue_normalized(path, prefix, subject, method, ttl)
    }

    /// Issue a grant using the method and TTL of a [`GrantPurpose`].
    pub fn issue_for(
        &self,
        object_path: &str,
        subject: &Subject,
        purpose: GrantPurpose,
    ) -> Result<IssuedUrl, SignerError> {
        self.issue(object_path, subject, purpose.method(), purpose.ttl())
    }

    /// Issue a grant for one object, scoped to an explicit directory prefix.
    ///
    /// Useful when a master playlist references renditions in subdirectories:
    /// signing the lesson directory lets one URL cover all of them.
    pub fn issue_with_prefix(
        &self,
        object_path: &str,
        prefix: &str,
        subject: &Subject,
        method: &str,
        ttl: Duration,
    ) -> Result<IssuedUrl, SignerError> {
        let path = normalized_non_empty(object_path)?;
        let prefix = normalize_prefix(prefix)?;
        if !is_within_prefix(&path, &prefix) {
            return Err(SignerError::PrefixMismatch { prefix, path });
        }
        self.issue_normalized(path, prefix, subject, method, ttl)
    }

    fn issue_normalized(
        &self,
        object_path: String,
        signed_prefix: String,
        subject: &Subject,
        method: &str,
        ttl: Duration,
    ) -> Result<IssuedUrl, SignerError> {
        if let Some(field) = subject.field_with_newline() {
            return Err(SignerError::InvalidSubject(field));
        }
        let ttl_millis = ttl.as_millis() as u64;
        if ttl_millis == 0 {
            return Err(SignerError::ZeroTtl);
        }

        let expires_at = self.clock.now_millis().saturating_add(ttl_millis);
        let signature = self.key.sign(&CanonicalMessage {
            method,
            signed_prefix: &signed_prefix,
            subject,
            expires_at,
        });

        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair(PARAM_USER, &subject.user_id)
            .append_pair(PARAM_COURSE, &subject.course_id)
            .append_pair(PARAM_CONTENT, &subject.content_id)
            .append_pair(PARAM_EXPIRES, &expires_at.to_string())
            .append_pair(PARAM_SIGNED_PREFIX, &signed_prefix)
            .append_pair(PARAM_SIGNATURE, &signature)
            .finish();

        let url = format!("{}/{}?{}", self.base_url, encode_path(&object_path), query);

        Ok(IssuedUrl {
            url,
            query,
            object_path,
            signed_prefix,
            expires_at,
            signature,
        })
    }
}

fn normalized_non_empty(object_path: &str) -> Result<String, SignerError> {
    let path = normalize_object_path(object_path)?;
    if path.is_empty() {
        return Err(SignerError::EmptyPath);
    }
    Ok(path)
}

/// Percent-encode each path segment, keeping the separators.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
