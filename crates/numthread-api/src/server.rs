use crate::{create_router, AppState};
use anyhow::{Context, Result};
use numthread_core::Settings;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};

pub struct Server {
    state: AppState,
    bind_address: String,
}

impl Server {
    pub fn new(settings: Settings) -> Result<Self> {
        crate::metrics::register_metrics();
        let bind_address = settings.bind_address();
        let state = AppState::new(settings)?;
        Ok(Self {
            state,
            bind_address,
        })
    }

    pub async fn run(self) -> Result<()> {
        let frontend_url = self.state.settings.server.frontend_url.clone();
        let router = create_router(self.state);

        let listener = TcpListener::bind(&self.bind_address)
            .await
            .with_context(|| format!("binding {}", self.bind_address))?;

        info!("Number Discussion API listening on http://{}", listener.local_addr()?);
        info!("Allowed frontend origin: {}", frontend_url);
        info!("  GET  /health - Liveness check");
        info!("  GET  /metrics - Prometheus metrics");
        info!("  POST /api/auth/register, /api/auth/login");
        info!("  GET  /api/discussions, /api/discussions/{{id}}");
        info!("  POST /api/discussions, /api/operations (bearer token)");
        info!("  GET  /api/operations/discussion/{{discussion_id}}, /api/operations/{{id}}");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("serving HTTP")?;

        info!("Server stopped");
        Ok(())
    }
}

/// Resolves on the first of Ctrl-C or, on unix, SIGTERM. A listener that
/// cannot be installed never fires instead of aborting the server.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Ctrl-C listener unavailable");
            std::future::pending::<()>().await;
        }
        "Ctrl-C"
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal as unix_signal, SignalKind};
        match unix_signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "SIGTERM listener unavailable");
                std::future::pending::<()>().await;
            }
        }
        "SIGTERM"
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    let received = tokio::select! {
        name = interrupt => name,
        name = terminate => name,
    };
    info!(signal = received, "Shutting down gracefully");
}
