//! Canonical message construction and HMAC-SHA256 signing.
//!
//! # Canonical Message
//!
//! A grant is signed over six fields joined by `\n`, in this exact order:
//!
//! ```text
//! METHOD
//! signedPrefix
//! userId
//! courseId
//! contentId
//! expiresAt (ms since epoch)
//! ```
//!
//! The order is fixed and every field is always present, so dropping or
//! swapping parameters always changes the signature. Absent or empty subject
//! fields are rendered as [`EMPTY_SUBJECT_FIELD`]. `HEAD` is signed as `GET`.
//!
//! Changing anything here invalidates every outstanding URL.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// HMAC-SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

/// Length of a hex-encoded HMAC-SHA256 digest.
pub const SIGNATURE_HEX_LEN: usize = 64;

/// Canonical rendering of an absent or empty subject field.
pub const EMPTY_SUBJECT_FIELD: &str = "-";

/// Sentinel user id for public or preview content.
pub const PUBLIC_USER: &str = "public";

/// Who a grant was issued to. Opaque to the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subject {
    pub user_id: String,
    pub course_id: String,
    pub content_id: String,
}

impl Subject {
    /// Create a subject from its three ids.
    pub fn new(
        user_id: impl Into<String>,
        course_id: impl Into<String>,
        content_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            course_id: course_id.into(),
            content_id: content_id.into(),
        }
    }

    /// Subject for public or preview content, optionally scoped to a course.
    pub fn public(course_id: impl Into<String>, content_id: impl Into<String>) -> Self {
        Self::new(PUBLIC_USER, course_id, content_id)
    }

    /// Name of the first field containing a newline, if any.
    pub(crate) fn field_with_newline(&self) -> Option<&'static str> {
        [
            ("user", &self.user_id),
            ("course", &self.course_id),
            ("content", &self.content_id),
        ]
        .into_iter()
        .find(|(_, value)| value.contains('\n'))
        .map(|(name, _)| name)
    }
}

/// Normalize an HTTP method for signing. `HEAD` is signed as `GET`.
pub fn canonical_method(method: &str) -> String {
    let upper = method.to_ascii_uppercase();
    if upper == "HEAD" {
        "GET".to_string()
    } else {
        upper
    }
}

fn subject_field(value: &str) -> &str {
    if value.is_empty() {
        EMPTY_SUBJECT_FIELD
    } else {
        value
    }
}

/// The ordered tuple of facts a signature covers.
#[derive(Debug, Clone, Copy)]
pub struct CanonicalMessage<'a> {
    pub method: &'a str,
    pub signed_prefix: &'a str,
    pub subject: &'a Subject,
    pub expires_at: u64,
}

impl CanonicalMessage<'_> {
    /// Render the newline-joined message that gets signed.
    pub fn render(&self) -> String {
        let method = canonical_method(self.method);
        let expires_at = self.expires_at.to_string();
        [
            method.as_str(),
            self.signed_prefix,
            subject_field(&self.subject.user_id),
            subject_field(&self.subject.course_id),
            subject_field(&self.subject.content_id),
            expires_at.as_str(),
        ]
        .join("\n")
    }
}

/// Check that `signature` is exactly 64 hex characters.
pub fn is_well_formed_signature(signature: &str) -> bool {
    signature.len() == SIGNATURE_HEX_LEN && signature.bytes().all(|b| b.is_ascii_hexdigit())
}

/// The shared HMAC secret.
///
/// Cloning shares nothing mutable; the key is read-only after construction.
#[derive(Clone)]
pub struct GrantKey {
    secret: Vec<u8>,
}

impl std::fmt::Debug for GrantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrantKey").finish_non_exhaustive()
    }
}

impl GrantKey {
    /// Create a key from raw secret bytes.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Whether the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.secret.is_empty()
    }

    fn mac_bytes(&self, message: &CanonicalMessage<'_>) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(message.render().as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    /// Compute the lowercase hex signature for a message.
    pub fn sign(&self, message: &CanonicalMessage<'_>) -> String {
        hex::encode(self.mac_bytes(message))
    }

    /// Compare a well-formed hex signature against the expected digest.
    ///
    /// Returns `false` for anything that is not 64 hex characters. The digest
    /// comparison is constant-time.
    pub fn verify(&self, message: &CanonicalMessage<'_>, signature: &str) -> bool {
        if !is_well_formed_signature(signature) {
            return false;
        }
        let Ok(provided) = hex::decode(signature) else {
            return false;
        };
        let expected = self.mac_bytes(message);
        provided.ct_eq(&expected).into()
    }
}
