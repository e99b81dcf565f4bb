use crate::config::WebConfig;
use crate::services::ContactService;
use axum::Router;
use axum::routing::post;
use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod handlers;

/// Shared state of the web handlers.
pub struct WebState {
    /// Intake service behind `POST /contact`.
    pub contacts: ContactService,
}

/// Run the contact intake server until `shutdown` is cancelled.
pub async fn run_server(config: WebConfig, contacts: ContactService, shutdown: CancellationToken) {
    let state = Arc::new(WebState { contacts });
    let app = build_router(state, &config.root_path);

    let addr_str = format!("{}:{}", config.host, config.port);
    let addr: SocketAddr = match addr_str.parse() {
        Ok(a) => a,
        Err(e) => {
            error!(error = %e, addr = %addr_str, "Invalid listen address");
            return;
        }
    };
    info!(addr = %addr, root_path = %config.root_path, "Web server listening");

    if config.ssl_enabled {
        if let Err(e) = serve_https(&config, addr, app, shutdown).await {
            error!(error = %e, "HTTPS server failed");
        }
        return;
    }

    if let Err(e) = serve_http(addr, app, shutdown).await {
        error!(error = %e, "HTTP server failed");
    }
}

fn build_router(state: Arc<WebState>, root_path: &str) -> Router {
    let app = Router::new()
        .route("/contact", post(handlers::contact))
        .with_state(state);

    let root_path = root_path.trim_end_matches('/');
    if root_path.is_empty() {
        app
    } else if root_path.starts_with('/') {
        Router::new().nest(root_path, app)
    } else {
        Router::new().nest(&format!("/{root_path}"), app)
    }
}

async fn serve_http(addr: SocketAddr, app: Router, shutdown: CancellationToken) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener on {addr}: {e}"))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown.cancelled().await;
    })
    .await
    .map_err(|e| anyhow::anyhow!("HTTP server failed: {e}"))
}

async fn serve_https(
    config: &WebConfig,
    addr: SocketAddr,
    app: Router,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let (Some(cert_path), Some(key_path)) = (&config.ssl_cert_path, &config.ssl_key_path) else {
        warn!("Web SSL enabled but cert/key paths are missing. Falling back to HTTP");
        return serve_http(addr, app, shutdown).await;
    };

    let tls_config = match RustlsConfig::from_pem_file(cert_path, key_path).await {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(error = %e, "Failed to load TLS config. Falling back to HTTP");
            return serve_http(addr, app, shutdown).await;
        }
    };

    tokio::select! {
        res = axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service_with_connect_info::<SocketAddr>()) => {
            res.map_err(|e| anyhow::anyhow!("HTTPS server failed: {e}"))
        }
        () = shutdown.cancelled() => Ok(()),
    }
}
