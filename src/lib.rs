//! # Media Gateway
//!
//! A signed-URL gateway for protected course media held in S3-compatible object
//! storage.
//!
//! A trusted origin decides who may see what and issues short-lived URLs whose
//! query string carries an HMAC-SHA256 signature over the requester, the
//! expiry and a directory prefix. The gateway verifies each request on its own,
//! with no session state, and streams the object back with caching disabled.
//! HLS playlists are rewritten on the way out so that every segment request
//! presents the same grant.
//!
//! ## Architecture
//!
//! - [`grant`] - Canonical messages, the URL signer and the grant verifier
//! - [`store`] - Object store abstraction and its S3 implementation
//! - [`gateway`] - Axum handlers, router and manifest rewriting
//! - [`clock`] - Injectable time source
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use media_gateway::{create_router, create_s3_client, RouterConfig, S3ObjectStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = create_s3_client(None, "us-east-1").await;
//!     let store = S3ObjectStore::new(client, "course-media".to_string());
//!     let router = create_router(store, RouterConfig::new("my-secret-key"))?;
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod grant;
pub mod store;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    CheckConfig, Cli, Command, ServeConfig, SignConfig, SignOutputFormat, VerifyConfig,
};
pub use error::{ConfigurationError, GatewayError, IoError, PathError, SignerError};
pub use gateway::{create_router, AppState, ErrorResponse, MediaKind, RouterConfig};
pub use grant::{
    GrantPurpose, GrantVerifier, IssuedUrl, Signer, Subject, VerifiedGrant, PROXY_TTL,
    UPLOAD_TTL, VIEW_TTL,
};
pub use store::{
    create_s3_client, FetchConditions, FetchStatus, ObjectMetadata, ObjectStore, S3ObjectStore,
    StoredObject,
};
