//! Application configuration. Store paths, auth endpoint, dashboard limits.

use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_DATABASE_FILE: &str = "bizdash.db";
pub const DEFAULT_TOKEN_CACHE_FILE: &str = "session.json";
/// Products listed on the overview.
pub const DEFAULT_TOP_PRODUCTS: usize = 3;
/// Rows in the recent activity feed.
pub const DEFAULT_RECENT_ACTIVITY: usize = 10;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    pub data_dir: Option<String>,

    /// SQLite file. Relative paths resolve against `data_dir`. Read from BIZDASH_DATABASE_PATH.
    #[serde(default)]
    pub database_path: Option<String>,

    /// Persisted auth tokens. Relative paths resolve against `data_dir`.
    #[serde(default)]
    pub token_cache_path: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Auth provider
    // ─────────────────────────────────────────────────────────────────────────
    /// Project URL of the GoTrue service, e.g. `https://<project>.supabase.co`. Read from BIZDASH_AUTH_URL.
    #[serde(default)]
    pub auth_url: Option<String>,

    /// Public (anon) API key sent as `apikey`. Read from BIZDASH_AUTH_API_KEY.
    #[serde(default)]
    pub auth_api_key: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Dashboard
    // ─────────────────────────────────────────────────────────────────────────
    /// Restrict every business-owned table to this business. Unset shows all rows.
    #[serde(default)]
    pub business_id: Option<String>,

    #[serde(default)]
    pub top_products_limit: Option<usize>,

    #[serde(default)]
    pub recent_activity_limit: Option<usize>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        if let Ok(path) = std::env::var("BIZDASH_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        // Environment overrides the file.
        c = c.add_source(config::Environment::with_prefix("BIZDASH").try_parsing(true));
        c.build()?.try_deserialize()
    }

    pub fn data_dir_or_default(&self) -> PathBuf {
        PathBuf::from(self.data_dir.as_deref().unwrap_or(DEFAULT_DATA_DIR))
    }

    fn in_data_dir(&self, configured: Option<&str>, default: &str) -> PathBuf {
        let path = PathBuf::from(configured.unwrap_or(default));
        if path.is_absolute() {
            path
        } else {
            self.data_dir_or_default().join(path)
        }
    }

    pub fn database_path_or_default(&self) -> PathBuf {
        self.in_data_dir(self.database_path.as_deref(), DEFAULT_DATABASE_FILE)
    }

    pub fn token_cache_path_or_default(&self) -> PathBuf {
        self.in_data_dir(self.token_cache_path.as_deref(), DEFAULT_TOKEN_CACHE_FILE)
    }

    /// CSV exports land here.
    pub fn export_dir(&self) -> PathBuf {
        self.data_dir_or_default().join("exports")
    }

    pub fn top_products_limit_or_default(&self) -> usize {
        self.top_products_limit.unwrap_or(DEFAULT_TOP_PRODUCTS)
    }

    pub fn recent_activity_limit_or_default(&self) -> usize {
        self.recent_activity_limit.unwrap_or(DEFAULT_RECENT_ACTIVITY)
    }

    /// Empty strings count as unset.
    pub fn business_id(&self) -> Option<String> {
        self.business_id.clone().filter(|s| !s.trim().is_empty())
    }

    /// Returns true if a remote auth provider is fully configured (URL and key present).
    pub fn is_auth_configured(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        set(&self.auth_url) && set(&self.auth_api_key)
    }
}
