//! HTTP gateway in front of the object store.
//!
//! Every object request is verified from its own query string, fetched from the
//! store with the client's range and conditional headers, and returned with
//! caching disabled. HLS manifests are rewritten so the player carries the same
//! grant to every segment it references.

pub mod handlers;
pub mod manifest;
pub mod media;
pub mod routes;

pub use handlers::{
    health_handler, object_handler, options_handler, AppState, ErrorResponse, HealthResponse,
    ALLOWED_METHODS,
};
pub use manifest::{rewrite_manifest, rewrite_manifest_bytes, MAX_MANIFEST_BYTES};
pub use media::MediaKind;
pub use routes::{create_router, RouterConfig};
