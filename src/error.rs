use thiserror::Error;

/// I/O errors that can occur when reading from the object store
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Error from S3 or S3-compatible storage
    #[error("S3 error: {0}")]
    S3(String),

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Object not found
    #[error("Object not found: {0}")]
    NotFound(String),
}

/// Errors produced while normalizing an object path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// Percent-decoding produced invalid UTF-8
    #[error("path is not valid percent-encoded UTF-8")]
    InvalidEncoding,

    /// Path contains an ASCII control character
    #[error("path contains a control character at byte {0}")]
    ControlCharacter(usize),
}

/// Missing or invalid deployment configuration.
///
/// Signing without a secret or base URL must never silently succeed, so these
/// are surfaced at construction time and treated as fatal by callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The shared HMAC secret is unset or empty
    #[error("signing secret is not configured")]
    MissingSecret,

    /// The public gateway origin is unset or empty
    #[error("gateway base URL is not configured")]
    MissingBaseUrl,

    /// The public gateway origin could not be parsed
    #[error("gateway base URL is invalid: {0}")]
    InvalidBaseUrl(String),
}

/// Errors raised by the signer for inputs it refuses to sign.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    /// Object path is empty after normalization
    #[error("object path is empty")]
    EmptyPath,

    /// Object path failed normalization
    #[error("invalid object path: {0}")]
    InvalidPath(#[from] PathError),

    /// Explicit prefix does not end in '/' or does not contain the object
    #[error("prefix {prefix:?} does not cover object {path:?}")]
    PrefixMismatch { prefix: String, path: String },

    /// A subject field contains a newline, which would break the canonical message
    #[error("subject field {0} contains a newline")]
    InvalidSubject(&'static str),

    /// TTL must be positive
    #[error("ttl must be greater than zero")]
    ZeroTtl,
}

/// Terminal outcomes of the gateway request pipeline.
///
/// Every variant maps to one HTTP response; the display strings are the
/// messages returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// A required query parameter is absent
    #[error("Missing Security Parameters")]
    MissingParameters,

    /// The request path could not be decoded
    #[error("Invalid Path Encoding")]
    PathEncoding,

    /// The object path is outside the signed prefix
    #[error("Path Traversal")]
    PathTraversal,

    /// The grant has expired or its expiry is unparsable
    #[error("Link Expired")]
    LinkExpired,

    /// The signature is not 64 hex characters
    #[error("Invalid Signature Format")]
    SignatureFormat,

    /// The signature does not match the canonical message
    #[error("Invalid Signature")]
    SignatureMismatch,

    /// The store has no such object
    #[error("Not Found")]
    ObjectNotFound,

    /// Anything else; the detail is logged, never returned
    #[error("Forbidden (Internal Error)")]
    Internal(String),
}

impl From<IoError> for GatewayError {
    fn from(err: IoError) -> Self {
        match err {
            IoError::NotFound(_) => GatewayError::ObjectNotFound,
            other => GatewayError::Internal(other.to_string()),
        }
    }
}

impl From<PathError> for GatewayError {
    fn from(_: PathError) -> Self {
        GatewayError::PathEncoding
    }
}
