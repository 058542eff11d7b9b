//! Access grants: signing and verification.
//!
//! A grant is never stored. It exists only as a URL whose query string carries
//! the subject, the expiry, the signed directory prefix and an HMAC-SHA256
//! signature over all of them.
//!
//! ```text
//! https://media.example.com/resources/course-x/lesson-1/index.m3u8
//!     ?user=user-42&course=course-x&content=lesson-1
//!     &expires=1735689600000&signedPrefix=resources%2Fcourse-x%2Flesson-1%2F
//!     &sig=3f1c...
//! ```
//!
//! The [`Signer`] and the [`GrantVerifier`] share [`canonical`] and [`path`],
//! so the message signed at the origin is byte-identical to the one the gateway
//! re-derives.

pub mod canonical;
pub mod path;
mod signer;
mod verifier;

pub use canonical::{
    canonical_method, is_well_formed_signature, CanonicalMessage, GrantKey, Subject,
    EMPTY_SUBJECT_FIELD, PUBLIC_USER, SIGNATURE_HEX_LEN,
};
pub use path::{
    decode_request_path, is_within_prefix, normalize_object_path, normalize_prefix,
    signed_prefix_for,
};
pub use signer::{GrantPurpose, IssuedUrl, Signer, PROXY_TTL, UPLOAD_TTL, VIEW_TTL};
pub use verifier::{GrantParams, GrantVerifier, VerifiedGrant};

/// Query parameter carrying the user id.
pub const PARAM_USER: &str = "user";

/// Query parameter carrying the course id.
pub const PARAM_COURSE: &str = "course";

/// Query parameter carrying the content id.
pub const PARAM_CONTENT: &str = "content";

/// Query parameter carrying the expiry (ms since epoch).
pub const PARAM_EXPIRES: &str = "expires";

/// Query parameter carrying the signed directory prefix.
pub const PARAM_SIGNED_PREFIX: &str = "signedPrefix";

/// Query parameter carrying the hex signature.
pub const PARAM_SIGNATURE: &str = "sig";
