//! Media Gateway - signed-URL access to protected course media.
//!
//! This binary runs the gateway and the operator commands around it.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use media_gateway::{
    config::{CheckConfig, Cli, Command, ServeConfig, SignConfig, SignOutputFormat, VerifyConfig},
    create_router, create_s3_client, GrantVerifier, IssuedUrl, RouterConfig, S3ObjectStore,
    Signer,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Sign(config) => run_sign(config),
        Command::Verify(config) => run_verify(config),
        Command::Check(config) => run_check(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Media Gateway v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  S3 bucket: {}", config.s3_bucket);
    if let Some(ref prefix) = config.s3_prefix {
        info!("  S3 key prefix: {}", prefix);
    }
    if let Some(ref endpoint) = config.s3_endpoint {
        info!("  S3 endpoint: {}", endpoint);
    }
    info!("  S3 region: {}", config.s3_region);
    if config.cors_origins.is_empty() {
        info!("  CORS: disabled");
    } else {
        info!("  CORS origins: {}", config.cors_origins.join(", "));
    }

    let s3_client = create_s3_client(config.s3_endpoint.as_deref(), &config.s3_region).await;

    // Grants only need GetObject; a failed listing is not fatal.
    match s3_client
        .list_objects_v2()
        .bucket(&config.s3_bucket)
        .max_keys(1)
        .send()
        .await
    {
        Ok(_) => info!("Connected to S3"),
        Err(e) => warn!("Could not list bucket '{}': {}", config.s3_bucket, e),
    }

    let mut store = S3ObjectStore::new(s3_client, config.s3_bucket.clone());
    if let Some(ref prefix) = config.s3_prefix {
        store = store.with_key_prefix(prefix);
    }

    let router_config = RouterConfig::new(config.secret_or_empty())
        .with_cors_origins(config.cors_origins.clone())
        .with_tracing(!config.no_tracing);
    let router = match create_router(store, router_config) {
        Ok(router) => router,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on: http://{}", addr);
    info!("  curl http://{}/health", addr);

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "media_gateway=debug,tower_http=debug"
    } else {
        "media_gateway=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// =============================================================================
// Sign Command
// =============================================================================

fn run_sign(config: SignConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let signer = match Signer::new(&config.secret, &config.base_url) {
        Ok(signer) => signer,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let subject = config.subject();
    let method = config.resolve_method();
    let ttl = config.resolve_ttl();

    let issued = match config.prefix {
        Some(ref prefix) => {
            signer.issue_with_prefix(&config.path, prefix, &subject, &method, ttl)
        }
        None => signer.issue(&config.path, &subject, &method, ttl),
    };

    let issued = match issued {
        Ok(issued) => issued,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match config.format {
        SignOutputFormat::Url => println!("{}", issued.url),
        SignOutputFormat::Query => println!("{}", issued.query),
        SignOutputFormat::Json => {
            match serde_json::to_string_pretty(&issued_json(&issued, &method)) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    ExitCode::SUCCESS
}

fn issued_json(issued: &IssuedUrl, method: &str) -> serde_json::Value {
    serde_json::json!({
        "url": issued.url,
        "path": issued.object_path,
        "signedPrefix": issued.signed_prefix,
        "method": method,
        "expires": issued.expires_at,
        "signature": issued.signature,
    })
}

// =============================================================================
// Verify Command
// =============================================================================

fn run_verify(config: VerifyConfig) -> ExitCode {
    let url = match url::Url::parse(&config.url) {
        Ok(url) => url,
        Err(e) => {
            eprintln!("Error: invalid URL: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let verifier = match GrantVerifier::new(&config.secret) {
        Ok(verifier) => verifier,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    match verifier.verify(&config.method, url.path(), url.query().unwrap_or("")) {
        Ok(grant) => {
            println!("✓ valid");
            println!("  Path: {}", grant.object_path);
            println!("  Signed prefix: {}", grant.signed_prefix);
            println!("  User: {}", grant.subject.user_id);
            println!("  Course: {}", grant.subject.course_id);
            println!("  Content: {}", grant.subject.content_id);
            println!("  Expires: {}", grant.expires_at);
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("✗ rejected: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    println!("Media Gateway Configuration Check");
    println!("═════════════════════════════════");
    println!();

    if config.s3_bucket.is_empty() {
        println!("✗ Bucket: not configured");
        return ExitCode::FAILURE;
    }
    println!("✓ Bucket: {}", config.s3_bucket);
    if let Some(ref endpoint) = config.s3_endpoint {
        println!("✓ Endpoint: {}", endpoint);
    }
    println!("✓ Region: {}", config.s3_region);
    println!();

    print!("Testing S3 connection... ");

    let s3_client = create_s3_client(config.s3_endpoint.as_deref(), &config.s3_region).await;
    let mut store = S3ObjectStore::new(s3_client.clone(), config.s3_bucket.clone());
    if let Some(ref prefix) = config.s3_prefix {
        store = store.with_key_prefix(prefix);
    }

    let mut listing = s3_client
        .list_objects_v2()
        .bucket(store.bucket())
        .max_keys(1);
    if !store.key_prefix().is_empty() {
        listing = listing.prefix(store.key_prefix());
    }

    if let Err(e) = listing.send().await {
        println!("✗ failed");
        println!();
        println!("Error: {}", e);
        println!();
        println!("Please check:");
        println!("  - Your AWS credentials are configured correctly");
        println!("  - The bucket '{}' exists and is accessible", store.bucket());
        if config.s3_endpoint.is_some() {
            println!("  - The S3 endpoint is correct and reachable");
        }
        return ExitCode::FAILURE;
    }
    println!("✓ success");

    if let Some(ref object) = config.test_object {
        let key = store.object_key(object.trim_start_matches('/'));
        println!();
        print!("Testing object '{}'... ", key);

        match s3_client
            .head_object()
            .bucket(store.bucket())
            .key(&key)
            .send()
            .await
        {
            Ok(result) => {
                println!("✓ found");
                if let Some(size) = result.content_length() {
                    println!("  Size: {} bytes", size);
                }
                if let Some(content_type) = result.content_type() {
                    println!("  Content-Type: {}", content_type);
                }
            }
            Err(_) => {
                println!("✗ not found");
                println!();
                println!("  The object '{}' does not exist in the bucket.", key);
                return ExitCode::FAILURE;
            }
        }
    }

    println!();
    println!("═════════════════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}
