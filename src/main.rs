//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run UI.
//! No business logic here.

use bizdash::adapters::auth::{GoTrueAuthProvider, MemoryAuthProvider};
use bizdash::adapters::persistence::{JsonTokenCache, SqliteStore};
use bizdash::adapters::ui::TuiApp;
use bizdash::ports::{AuthProvider, InputPort, RecordStore, TokenCache};
use bizdash::shared::AppConfig;
use bizdash::usecases::{DashboardService, SessionManager, TaskService};
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    bizdash::adapters::ui::init_ui();

    let cfg = match AppConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(error = %e, "config could not be loaded; using defaults");
            AppConfig::default()
        }
    };

    let db_path = cfg.database_path_or_default();
    let store = SqliteStore::connect(&db_path)
        .await
        .map_err(|e| anyhow::anyhow!("open record store {}: {}", db_path.display(), e))?;
    let store: Arc<dyn RecordStore> = Arc::new(store);

    let cache_path = cfg.token_cache_path_or_default();
    let cache: Arc<dyn TokenCache> = Arc::new(JsonTokenCache::open(&cache_path));

    // --- Auth provider: GoTrue when configured, in-process accounts otherwise ---
    let provider: Arc<dyn AuthProvider> = if cfg.is_auth_configured() {
        let url = cfg.auth_url.clone().unwrap_or_default();
        info!(url = %url, "using GoTrue auth provider");
        Arc::new(GoTrueAuthProvider::new(
            url,
            cfg.auth_api_key.clone().unwrap_or_default(),
            Arc::clone(&cache),
        ))
    } else {
        warn!("BIZDASH_AUTH_URL / BIZDASH_AUTH_API_KEY not set, using in-memory accounts");
        Arc::new(MemoryAuthProvider::new())
    };

    // --- Services ---
    let business_id = cfg.business_id();
    if business_id.is_none() {
        info!("no BIZDASH_BUSINESS_ID set; showing every business");
    }
    let dashboard = Arc::new(DashboardService::new(
        Arc::clone(&store),
        business_id.clone(),
        cfg.top_products_limit_or_default(),
        cfg.recent_activity_limit_or_default(),
    ));
    let tasks = Arc::new(TaskService::new(Arc::clone(&store), business_id));
    let session = SessionManager::new(provider, cache);

    let input_port: Arc<dyn InputPort> =
        Arc::new(TuiApp::new(session, dashboard, tasks, cfg.export_dir()));

    input_port
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}
