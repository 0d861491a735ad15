use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{close_code, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use pasty_store::PasteStore;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::broadcast::BroadcastCoordinator;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::health::{health_check, HealthResponse};
use crate::identity::{group_from, Peer};
use crate::names::generate_name;
use crate::registry::ConnectionRegistry;
use crate::session::serve_socket;

/// How long `shutdown()` waits for in-flight HTTP requests.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-connection bound on the goodbye close frame during shutdown.
const GOODBYE_TIMEOUT: Duration = Duration::from_secs(2);

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<BroadcastCoordinator>,
    pub config: Arc<ServerConfig>,
    pub start_time: Instant,
}

/// Body of `GET /id`.
#[derive(Debug, Serialize)]
pub struct IdResponse {
    pub friendly_name: String,
    pub ipaddress: String,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/ws", get(ws_handler))
        .route("/id", get(id_handler))
        .route("/health", get(health_handler));

    if let Some(dir) = &state.config.web_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind the listener and start serving. Returns a handle to shut it down.
pub async fn start(
    config: ServerConfig,
    store: Arc<dyn PasteStore>,
) -> Result<ServerHandle, ServerError> {
    let addr = SocketAddr::new(config.host, config.port);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let local_addr = listener.local_addr()?;

    let registry = Arc::new(ConnectionRegistry::new());
    let coordinator = Arc::new(BroadcastCoordinator::new(
        store,
        Arc::clone(&registry),
        config.send_timeout,
        config.network_field,
    ));
    let state = AppState {
        coordinator,
        config: Arc::new(config),
        start_time: Instant::now(),
    };
    let router = build_router(state);

    let token = CancellationToken::new();
    let shutdown = token.clone();
    let task = tokio::spawn(async move {
        let served = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await;
        if let Err(e) = served {
            error!(error = %e, "server stopped with error");
        }
    });

    info!(addr = %local_addr, "pasty server listening");

    Ok(ServerHandle {
        local_addr,
        token,
        registry,
        task,
    })
}

/// Handle returned by `start()`.
pub struct ServerHandle {
    local_addr: SocketAddr,
    token: CancellationToken,
    registry: Arc<ConnectionRegistry>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Stop accepting requests, say goodbye to live sockets, and wait a
    /// bounded time for the listener task.
    pub async fn shutdown(self) {
        self.token.cancel();

        let live = self.registry.all();
        info!(connections = live.len(), "shutting down");
        let goodbyes = live.iter().map(|conn| {
            conn.close_with(close_code::AWAY, "server shutting down", GOODBYE_TIMEOUT)
        });
        futures::future::join_all(goodbyes).await;

        let mut task = self.task;
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut task).await.is_err() {
            warn!("shutdown timed out after {SHUTDOWN_TIMEOUT:?}, aborting listener");
            task.abort();
        }
    }
}

/// WebSocket upgrade handler.
async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let peer = Peer::from_request(&headers, remote, state.config.trust_forwarded_for);
    let coordinator = Arc::clone(&state.coordinator);
    let config = Arc::clone(&state.config);
    ws.protocols([state.config.subprotocol.clone()])
        .on_upgrade(move |socket| serve_socket(socket, peer, coordinator, config))
}

async fn id_handler(
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Json<IdResponse> {
    let group = group_from(&headers, remote, state.config.trust_forwarded_for);
    Json(IdResponse {
        friendly_name: generate_name(),
        ipaddress: group.to_string(),
    })
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let registry = state.coordinator.registry();
    Json(health_check(
        state.start_time,
        registry.connection_count(),
        registry.group_count(),
    ))
}
