use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::jwt::JwtKeys;
use crate::auth::session::cleanup_expired_sessions;
use crate::cache::RecordCache;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::registry::RecordStore;
use crate::routes;
use crate::store::{KeyspaceHandle, Store};

#[derive(Clone)]
pub struct AppState {
    pub sessions_ks: KeyspaceHandle,
    pub registry: Arc<dyn RecordStore>,
    pub cache: Arc<RwLock<RecordCache>>,
    pub jwt_keys: Arc<JwtKeys>,
    pub config: Arc<RwLock<AppConfig>>,
}

pub async fn run(
    config: AppConfig,
    store: Store,
    registry: Arc<dyn RecordStore>,
) -> Result<(), AppError> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await.map_err(AppError::Io)?;

    let sessions_ks = store.keyspace("sessions")?;

    let jwt_keys = decode_jwt_key(config.auth.jwt_signing_key.as_deref().ok_or_else(|| {
        AppError::Config("auth.jwt_signing_key is not set".into())
    })?)?;

    let cleanup_interval = config.auth.session_cleanup_interval;

    let state = AppState {
        sessions_ks,
        registry,
        cache: Arc::new(RwLock::new(RecordCache::new())),
        jwt_keys: Arc::new(jwt_keys),
        config: Arc::new(RwLock::new(config)),
    };

    tokio::spawn(session_cleanup_loop(
        state.sessions_ks.clone(),
        cleanup_interval,
    ));

    let app = routes::router()
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    info!("server listening addr={addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Io)?;

    // Flush live sessions so operators stay signed in across restarts
    store.persist().await?;

    info!("server shut down");
    Ok(())
}

/// Decode a base64url-no-pad JWT signing key and construct `JwtKeys`.
fn decode_jwt_key(b64: &str) -> Result<JwtKeys, AppError> {
    let bytes = BASE64
        .decode(b64)
        .map_err(|e| AppError::Config(format!("invalid jwt_signing_key base64: {e}")))?;
    let key_bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| AppError::Config("jwt_signing_key must be exactly 32 bytes".into()))?;
    JwtKeys::from_ed25519_bytes(&key_bytes)
}

async fn session_cleanup_loop(sessions_ks: KeyspaceHandle, interval_secs: u64) {
    let interval = Duration::from_secs(interval_secs);
    loop {
        tokio::time::sleep(interval).await;
        if let Err(e) = cleanup_expired_sessions(&sessions_ks).await {
            warn!("session cleanup error: {e}");
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT"),
        () = terminate => info!("received SIGTERM"),
    }
}
