//! Configuration management for the media gateway.
//!
//! This module provides the command-line interface:
//! - Subcommands for serving, signing, verifying and checking
//! - Environment variables with `GATEWAY_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use media_gateway::config::{Cli, Command};
//!
//! match Cli::parse().into_command() {
//!     Command::Serve(config) => println!("Listening on {}", config.bind_address()),
//!     _ => {}
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `GATEWAY_HOST` - Server bind address (default: 0.0.0.0)
//! - `GATEWAY_PORT` - Server port (default: 3000)
//! - `GATEWAY_S3_BUCKET` - S3 bucket name (required)
//! - `GATEWAY_S3_PREFIX` - Key prefix inside the bucket
//! - `GATEWAY_S3_ENDPOINT` - Custom S3 endpoint for S3-compatible services
//! - `GATEWAY_S3_REGION` - AWS region (default: us-east-1)
//! - `GATEWAY_SECRET` - Shared HMAC secret (required)
//! - `GATEWAY_BASE_URL` - Public gateway origin used when signing
//! - `GATEWAY_CORS_ORIGINS` - Comma-separated CORS allow-list

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::grant::{GrantPurpose, Subject};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

// =============================================================================
// CLI Arguments
// =============================================================================

/// Media Gateway - signed-URL access to protected course media.
#[derive(Parser, Debug, Clone)]
#[command(name = "media-gateway")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Unwrap the selected subcommand.
    pub fn into_command(self) -> Command {
        self.command
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the gateway HTTP server
    Serve(ServeConfig),

    /// Issue a signed URL
    Sign(SignConfig),

    /// Verify a signed URL offline
    Verify(VerifyConfig),

    /// Check S3 connectivity
    Check(CheckConfig),
}

// =============================================================================
// Serve
// =============================================================================

/// Options for `serve`.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "GATEWAY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "GATEWAY_PORT")]
    pub port: u16,

    // =========================================================================
    // S3 Configuration
    // =========================================================================
    /// S3 bucket holding the protected media.
    #[arg(long, env = "GATEWAY_S3_BUCKET")]
    pub s3_bucket: String,

    /// Key prefix prepended to every object path inside the bucket.
    #[arg(long, env = "GATEWAY_S3_PREFIX")]
    pub s3_prefix: Option<String>,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    #[arg(long, env = "GATEWAY_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "GATEWAY_S3_REGION")]
    pub s3_region: String,

    // =========================================================================
    // Authorization
    // =========================================================================
    /// Shared secret grants are signed with.
    ///
    /// The server refuses to start without it.
    #[arg(long, env = "GATEWAY_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, no cross-origin access is granted.
    #[arg(long, env = "GATEWAY_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.secret.as_deref().map_or(true, |s| s.is_empty()) {
            return Err(
                "No signing secret provided. Set --secret or GATEWAY_SECRET".to_string(),
            );
        }

        if self.s3_bucket.is_empty() {
            return Err(
                "S3 bucket name is required. Set --s3-bucket or GATEWAY_S3_BUCKET".to_string(),
            );
        }

        if let Some(origin) = self
            .cors_origins
            .iter()
            .find(|o| url::Url::parse(o.trim()).is_err())
        {
            return Err(format!("Invalid CORS origin: {}", origin));
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the secret, or an empty string (call validate() first).
    pub fn secret_or_empty(&self) -> &str {
        self.secret.as_deref().unwrap_or("")
    }
}

// =============================================================================
// Sign
// =============================================================================

/// Output format for `sign`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignOutputFormat {
    /// Complete URL
    #[default]
    Url,
    /// JSON with the URL and the facts it encodes
    Json,
    /// Query string only
    Query,
}

/// Options for `sign`.
#[derive(Args, Debug, Clone)]
pub struct SignConfig {
    /// Object path to grant access to (e.g. resources/course-x/lesson-1/index.m3u8).
    pub path: String,

    /// Shared secret.
    #[arg(long, env = "GATEWAY_SECRET", hide_env_values = true)]
    pub secret: String,

    /// Public origin of the gateway.
    #[arg(long, env = "GATEWAY_BASE_URL")]
    pub base_url: String,

    /// User the grant is issued to (omit for public content).
    #[arg(long)]
    pub user: Option<String>,

    /// Course the content belongs to.
    #[arg(long, default_value = "")]
    pub course: String,

    /// Content id.
    #[arg(long, default_value = "")]
    pub content: String,

    /// Preset for method and lifetime.
    #[arg(long, value_enum, default_value_t = GrantPurpose::View)]
    pub purpose: GrantPurpose,

    /// Override the preset method.
    #[arg(long)]
    pub method: Option<String>,

    /// Override the preset lifetime, in seconds.
    #[arg(long)]
    pub ttl: Option<u64>,

    /// Sign this directory instead of the object's own directory.
    #[arg(long)]
    pub prefix: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = SignOutputFormat::Url)]
    pub format: SignOutputFormat,
}

impl SignConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.path.trim().is_empty() {
            return Err("Object path is required".to_string());
        }
        if self.ttl == Some(0) {
            return Err("TTL must be greater than 0".to_string());
        }
        if let Some(method) = &self.method {
            if method.is_empty() || !method.bytes().all(|b| b.is_ascii_alphabetic()) {
                return Err(format!("Invalid method: {}", method));
            }
        }
        Ok(())
    }

    /// Method the grant authorizes.
    pub fn resolve_method(&self) -> String {
        self.method
            .as_deref()
            .unwrap_or(self.purpose.method())
            .to_ascii_uppercase()
    }

    /// Lifetime of the grant.
    pub fn resolve_ttl(&self) -> Duration {
        self.ttl
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.purpose.ttl())
    }

    /// Subject the grant is issued to.
    pub fn subject(&self) -> Subject {
        match &self.user {
            Some(user) => Subject::new(user.as_str(), self.course.as_str(), self.content.as_str()),
            None => Subject::public(self.course.as_str(), self.content.as_str()),
        }
    }
}

// =============================================================================
// Verify
// =============================================================================

/// Options for `verify`.
#[derive(Args, Debug, Clone)]
pub struct VerifyConfig {
    /// Signed URL to check.
    pub url: String,

    /// Shared secret.
    #[arg(long, env = "GATEWAY_SECRET", hide_env_values = true)]
    pub secret: String,

    /// Method the URL will be requested with.
    #[arg(long, default_value = "GET")]
    pub method: String,
}

// =============================================================================
// Check
// =============================================================================

/// Options for `check`.
#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    /// S3 bucket to check.
    #[arg(long, env = "GATEWAY_S3_BUCKET")]
    pub s3_bucket: String,

    /// Key prefix inside the bucket.
    #[arg(long, env = "GATEWAY_S3_PREFIX")]
    pub s3_prefix: Option<String>,

    /// Custom S3 endpoint URL.
    #[arg(long, env = "GATEWAY_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "GATEWAY_S3_REGION")]
    pub s3_region: String,

    /// Object path to look up after connecting.
    #[arg(long)]
    pub test_object: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================
