//! Grant verification.
//!
//! Runs the authorization half of the gateway pipeline against a request's
//! method, raw path and raw query string. Checks are ordered cheapest first:
//!
//! 1. Required parameters present
//! 2. Path decodes and normalizes
//! 3. Object path lies inside the signed prefix
//! 4. Grant not expired
//! 5. Signature well-formed, then constant-time HMAC comparison
//!
//! Nothing is looked up anywhere; the query string and the shared secret are
//! all the verifier needs.

use std::sync::Arc;

use tracing::{debug, warn};
use url::form_urlencoded;

use super::canonical::{is_well_formed_signature, CanonicalMessage, GrantKey, Subject};
use super::path::{decode_request_path, is_within_prefix};
use super::{
    PARAM_CONTENT, PARAM_COURSE, PARAM_EXPIRES, PARAM_SIGNATURE, PARAM_SIGNED_PREFIX, PARAM_USER,
};
use crate::clock::{Clock, SystemClock};
use crate::error::{ConfigurationError, GatewayError};

/// Security parameters extracted from a query string.
///
/// `expires` is kept as the raw string; parsing it is part of the expiry
/// check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantParams {
    pub signature: String,
    pub expires: String,
    pub signed_prefix: String,
    pub subject: Subject,
}

impl GrantParams {
    /// Parse the grant parameters out of a raw query string.
    ///
    /// Other parameters are ignored. A repeated security parameter is
    /// rejected rather than resolved.
    pub fn parse(query: &str) -> Result<Self, GatewayError> {
        let mut signature = None;
        let mut expires = None;
        let mut signed_prefix = None;
        let mut user = None;
        let mut course = None;
        let mut content = None;

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let (slot, duplicate_error) = match key.as_ref() {
                PARAM_SIGNATURE => (&mut signature, GatewayError::SignatureFormat),
                PARAM_EXPIRES => (&mut expires, GatewayError::LinkExpired),
                PARAM_SIGNED_PREFIX => (&mut signed_prefix, GatewayError::SignatureMismatch),
                PARAM_USER => (&mut user, GatewayError::SignatureMismatch),
                PARAM_COURSE => (&mut course, GatewayError::SignatureMismatch),
                PARAM_CONTENT => (&mut content, GatewayError::SignatureMismatch),
                _ => continue,
            };
            if slot.is_some() {
                return Err(duplicate_error);
            }
            *slot = Some(value.into_owned());
        }

        match (signature, expires, user, signed_prefix) {
            (Some(signature), Some(expires), Some(user), Some(signed_prefix)) => Ok(Self {
                signature,
                expires,
                signed_prefix,
                subject: Subject::new(
                    user,
                    course.unwrap_or_default(),
                    content.unwrap_or_default(),
                ),
            }),
            _ => Err(GatewayError::MissingParameters),
        }
    }
}

/// A request that passed every authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedGrant {
    /// Normalized object path
    pub object_path: String,

    /// Directory prefix the signature covers
    pub signed_prefix: String,

    /// Subject the grant was issued to
    pub subject: Subject,

    /// Expiry in milliseconds since the Unix epoch
    pub expires_at: u64,
}

/// Verifies signed requests against the shared secret.
#[derive(Clone)]
pub struct GrantVerifier {
    key: GrantKey,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for GrantVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrantVerifier").finish_non_exhaustive()
    }
}

impl GrantVerifier {
    /// Create a verifier using the wall clock.
    ///
    /// An empty secret is refused: anyone can compute an HMAC under it.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, ConfigurationError> {
        let key = GrantKey::new(secret);
        if key.is_empty() {
            return Err(ConfigurationError::MissingSecret);
        }
        Ok(Self {
            key,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Verify a request given its method, raw (still percent-encoded) path and
    /// raw query string.
    pub fn verify(
        &self,
        method: &str,
        raw_path: &str,
        raw_query: &str,
    ) -> Result<VerifiedGrant, GatewayError> {
        let params = GrantParams::parse(raw_query)?;
        let object_path = decode_request_path(raw_path)?;
        self.verify_params(method, object_path, params)
    }

    /// Verify already-parsed parameters for a normalized object path.
    pub fn verify_params(
        &self,
        method: &str,
        object_path: String,
        params: GrantParams,
    ) -> Result<VerifiedGrant, GatewayError> {
        if !is_within_prefix(&object_path, &params.signed_prefix) {
            warn!(
                object_path = %object_path,
                signed_prefix = %params.signed_prefix,
                "Object path outside signed prefix"
            );
            return Err(GatewayError::PathTraversal);
        }

        let expires_at = params
            .expires
            .parse::<u64>()
            .map_err(|_| GatewayError::LinkExpired)?;
        let now = self.clock.now_millis();
        if now >= expires_at {
            debug!(expires_at, now, "Grant expired");
            return Err(GatewayError::LinkExpired);
        }

        if !is_well_formed_signature(&params.signature) {
            return Err(GatewayError::SignatureFormat);
        }

        // No issued grant can carry a newline in a subject field.
        if params.subject.field_with_newline().is_some() {
            return Err(GatewayError::SignatureMismatch);
        }

        let message = CanonicalMessage {
            method,
            signed_prefix: &params.signed_prefix,
            subject: &params.subject,
            expires_at,
        };
        if !self.key.verify(&message, &params.signature) {
            warn!(
                object_path = %object_path,
                user = %params.subject.user_id,
                "Signature mismatch"
            );
            return Err(GatewayError::SignatureMismatch);
        }

        Ok(VerifiedGrant {
            object_path,
            signed_prefix: params.signed_prefix,
            subject: params.subject,
            expires_at,
        })
    }
}
