use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    middleware,
    routing::{any, post},
    Router,
};
use ram_core::Database;
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tower_http::{services::ServeDir, trace::TraceLayer};

use super::{auth, notes, session};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Frontend assets; `templates/` inside it holds the HTML fragments.
    pub static_dir: PathBuf,
    pub listen_addr: String,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ServerConfig>,
}

/// Builds the application: session layer around everything, auth in front of
/// `/notes`, static files for the rest.
pub fn create_router(db: Database, config: ServerConfig) -> Router {
    let static_files = ServeDir::new(&config.static_dir);
    let state = AppState {
        db,
        config: Arc::new(config),
    };

    let protected = Router::new()
        .route("/notes", any(notes::notes_route))
        .route_layer(middleware::from_fn(auth::require_identity));

    Router::new()
        .merge(protected)
        .route("/guest/login", post(auth::login))
        .route("/guest/logout", post(auth::logout))
        .fallback_service(static_files)
        .layer(middleware::from_fn_with_state(
            session::SessionStore::new(),
            session::session_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the listener and starts serving in the background.
///
/// The schema must already be migrated: nothing is accepted before this
/// returns.
pub async fn start(db: Database, config: ServerConfig) -> anyhow::Result<RunningServer> {
    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to listen on {}", config.listen_addr))?;
    let local_addr = listener.local_addr()?;
    tracing::info!(
        "r.a.m. is listening on http://{} serving {}",
        local_addr,
        config.static_dir.display()
    );

    let app = create_router(db, config);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
    });

    Ok(RunningServer {
        local_addr,
        shutdown_tx,
        handle,
    })
}

/// A server started by [`start`]. Dropping it stops the server the same way
/// [`RunningServer::shutdown`] does, without waiting for it to finish.
pub struct RunningServer {
    local_addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections and waits for in-flight requests.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        stop(self.shutdown_tx, self.handle).await
    }

    /// Serves until `signal` resolves, then shuts down gracefully. Returns
    /// early if the server stops on its own.
    pub async fn run_until<F>(self, signal: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        let RunningServer {
            shutdown_tx,
            mut handle,
            ..
        } = self;

        tokio::select! {
            () = signal => {}
            joined = &mut handle => {
                joined??;
                tracing::warn!("Server stopped without a shutdown request");
                return Ok(());
            }
        }

        stop(shutdown_tx, handle).await
    }
}

async fn stop(
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<std::io::Result<()>>,
) -> anyhow::Result<()> {
    tracing::info!("Initiating shutdown");
    // the server may already be gone, in which case the join below reports why
    let _ = shutdown_tx.send(());
    handle.await??;
    tracing::info!("Shutdown successful");
    Ok(())
}
