use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relay_api::auth::StoreAuthenticator;
use relay_api::config::Config;
use relay_api::gateway::calls::CallRegistry;
use relay_api::gateway::fanout::RelayBroadcast;
use relay_api::gateway::presence::PresenceRegistry;
use relay_api::gateway::relay::MessageRelay;
use relay_api::store::backup::BackupStore;
use relay_api::store::memory::MemoryStore;
use relay_api::store::mirror::{FsObjectStore, ObjectStore};
use relay_api::store::pg::PgMessageStore;
use relay_api::store::MessageStore;
use relay_api::AppState;

#[tokio::main]
async fn main() {
    // Load .env file (silently skip if missing; env vars may be set externally)
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;

    let store: Arc<dyn MessageStore> = match &config.database_url {
        Some(url) => {
            let pool = relay_api::db::pool::connect(url).await;
            Arc::new(PgMessageStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; messages persist only via local backups");
            Arc::new(MemoryStore::new())
        }
    };

    let mirror: Option<Arc<dyn ObjectStore>> = match &config.mirror_dir {
        Some(dir) => match FsObjectStore::new(dir.clone()).await {
            Ok(store) => Some(Arc::new(store)),
            Err(err) => {
                tracing::error!(%err, "mirror store unavailable; continuing without it");
                None
            }
        },
        None => None,
    };

    let backups = Arc::new(BackupStore::new(config.backup_dir.clone()));
    let broadcast = RelayBroadcast::new();

    let relay = Arc::new(MessageRelay::new(
        store.clone(),
        mirror,
        backups,
        broadcast.clone(),
    ));
    relay.rehydrate().await;

    let state = AppState {
        config: Arc::new(config),
        auth: Arc::new(StoreAuthenticator::new(store.clone())),
        store,
        presence: Arc::new(PresenceRegistry::new()),
        calls: Arc::new(CallRegistry::new()),
        relay,
        broadcast,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(relay_api::routes::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "relay-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app).await.expect("server error");
}
