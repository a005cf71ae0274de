use std::sync::Arc;

use anyhow::Context;
use pii_redact::{providers, router, AppConfig, UploadPolicy};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    log::info!("Starting PII Redaction API...");

    let config = AppConfig::load().context("failed to load configuration")?;
    config.validate().context("configuration error")?;

    // Blocking clients must be built, and finally dropped, outside the runtime.
    let pipeline = Arc::new(providers::build_pipeline(&config)?);

    let policy = UploadPolicy {
        max_upload_mb: config.max_upload_mb_or_default(),
        allowed_extensions: config.allowed_extensions_or_default(),
    };
    let app = router(pipeline.clone(), policy);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    let result = runtime.block_on(pii_redact::server::serve(
        app,
        config.host_or_default(),
        config.port_or_default(),
        shutdown_signal(),
    ));

    drop(runtime);
    drop(pipeline);
    result
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for ctrl-c: {}", err);
        std::future::pending::<()>().await;
    }
    log::info!("shutdown requested");
}
