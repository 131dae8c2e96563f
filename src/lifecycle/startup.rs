//! Startup orchestration.
//!
//! # Responsibilities
//! - Report what the server is about to serve
//! - Warn about a missing entry document (the API still works without it)
//! - Bind the listener last, so traffic only arrives when ready

use tokio::net::TcpListener;

use crate::config::SiteConfig;

/// Log the effective configuration and bind the listener.
pub async fn bind(config: &SiteConfig) -> std::io::Result<TcpListener> {
    let index = config.site.index_path();
    if !index.is_file() {
        tracing::warn!(
            path = %index.display(),
            "Entry document not found; non-API requests will return 404"
        );
    }

    tracing::info!(
        run_mode = config.observability.run_mode.as_str(),
        school_email = %config.school.email,
        whatsapp = if config.whatsapp_digits().is_some() { "configured" } else { "not configured" },
        allowed_origins = ?config.cors.allowed_origins,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");
    Ok(listener)
}
