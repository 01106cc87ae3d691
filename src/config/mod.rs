//! Configuration module for the inventory backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_STORAGE_QUOTA_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_ADMIN_PASSCODE: &str = "admin34";

/// Cloud document store settings. Only present when an API key is configured.
#[derive(Debug, Clone)]
pub struct CloudConfig {
    pub api_key: String,
    pub project_id: String,
    pub collection: String,
    pub base_url: String,
    /// How often the live subscription refreshes
    pub poll_interval: Duration,
}

/// Recommendation provider settings.
#[derive(Debug, Clone)]
pub struct RecommenderConfig {
    /// Provider key; without one every request gets the fallback text
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub thinking_budget: u32,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines instead of the human format
    pub log_json: bool,
    /// Path to the SQLite file backing local durable state
    pub db_path: PathBuf,
    /// Path to Tantivy search index directory
    pub index_path: PathBuf,
    /// Largest catalog blob the local store accepts
    pub storage_quota_bytes: usize,
    /// Passcode that opens the admin gate
    pub admin_passcode: String,
    /// Timeout applied to every outbound HTTP request
    pub request_timeout: Duration,
    pub cloud: Option<CloudConfig>,
    pub recommender: RecommenderConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let bind_addr = env::var("CARZ_BIND_ADDR")
            .ok()
            .and_then(|raw| match raw.parse() {
                Ok(addr) => Some(addr),
                Err(_) => {
                    tracing::warn!("Invalid CARZ_BIND_ADDR {:?}, using default", raw);
                    None
                }
            })
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8080)));

        let log_level = env::var("CARZ_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_json = env::var("CARZ_LOG_FORMAT")
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let db_path = env::var("CARZ_DB_PATH")
            .unwrap_or_else(|_| "./data/carz.sqlite".to_string())
            .into();

        let index_path = env::var("CARZ_INDEX_PATH")
            .unwrap_or_else(|_| "./data/index".to_string())
            .into();

        let storage_quota_bytes =
            parse_or("CARZ_STORAGE_QUOTA_BYTES", DEFAULT_STORAGE_QUOTA_BYTES);

        let admin_passcode = env::var("CARZ_ADMIN_PASSCODE")
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_ADMIN_PASSCODE.to_string());

        let request_timeout = Duration::from_millis(parse_or("CARZ_REQUEST_TIMEOUT_MS", 10_000));

        Self {
            bind_addr,
            log_level,
            log_json,
            db_path,
            index_path,
            storage_quota_bytes,
            admin_passcode,
            request_timeout,
            cloud: cloud_from_env(),
            recommender: recommender_from_env(),
        }
    }

    /// Local-mode configuration without a provider key.
    #[cfg(test)]
    pub fn local(db_path: PathBuf, index_path: PathBuf) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            log_level: "warn".to_string(),
            log_json: false,
            db_path,
            index_path,
            storage_quota_bytes: DEFAULT_STORAGE_QUOTA_BYTES,
            admin_passcode: DEFAULT_ADMIN_PASSCODE.to_string(),
            request_timeout: Duration::from_secs(10),
            cloud: None,
            recommender: RecommenderConfig {
                api_key: None,
                model: "gemini-3-pro-preview".to_string(),
                base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                thinking_budget: 32768,
            },
        }
    }
}

fn cloud_from_env() -> Option<CloudConfig> {
    let api_key = env::var("FIREBASE_API_KEY").ok().filter(|k| !k.is_empty())?;

    let Some(project_id) = env::var("FIREBASE_PROJECT_ID").ok().filter(|p| !p.is_empty()) else {
        tracing::warn!("FIREBASE_API_KEY is set but FIREBASE_PROJECT_ID is missing; using local storage");
        return None;
    };

    Some(CloudConfig {
        api_key,
        project_id,
        collection: env::var("FIREBASE_COLLECTION").unwrap_or_else(|_| "cars".to_string()),
        base_url: env::var("FIREBASE_BASE_URL")
            .unwrap_or_else(|_| "https://firestore.googleapis.com/v1".to_string()),
        poll_interval: Duration::from_millis(parse_or("FIREBASE_POLL_INTERVAL_MS", 3_000)),
    })
}

fn recommender_from_env() -> RecommenderConfig {
    RecommenderConfig {
        api_key: env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
        model: env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-3-pro-preview".to_string()),
        base_url: env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string()),
        thinking_budget: parse_or("GEMINI_THINKING_BUDGET", 32768),
    }
}

fn parse_or<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid {} {:?}, using default", name, raw);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::sync::Mutex;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

    const VARS: &[&str] = &[
        "CARZ_BIND_ADDR",
        "CARZ_LOG_LEVEL",
        "CARZ_LOG_FORMAT",
        "CARZ_DB_PATH",
        "CARZ_INDEX_PATH",
        "CARZ_STORAGE_QUOTA_BYTES",
        "CARZ_ADMIN_PASSCODE",
        "CARZ_REQUEST_TIMEOUT_MS",
        "FIREBASE_API_KEY",
        "FIREBASE_PROJECT_ID",
        "FIREBASE_COLLECTION",
        "FIREBASE_BASE_URL",
        "FIREBASE_POLL_INTERVAL_MS",
        "GEMINI_API_KEY",
        "GEMINI_MODEL",
        "GEMINI_BASE_URL",
        "GEMINI_THINKING_BUDGET",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();

        let config = Config::from_env();

        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.db_path, PathBuf::from("./data/carz.sqlite"));
        assert_eq!(config.index_path, PathBuf::from("./data/index"));
        assert_eq!(config.log_level, "info");
        assert!(!config.log_json);
        assert_eq!(config.storage_quota_bytes, DEFAULT_STORAGE_QUOTA_BYTES);
        assert_eq!(config.admin_passcode, "admin34");
        assert!(config.cloud.is_none());
        assert!(config.recommender.api_key.is_none());
        assert_eq!(config.recommender.thinking_budget, 32768);
    }

    #[test]
    fn test_cloud_requires_key_and_project() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();

        env::set_var("FIREBASE_API_KEY", "key-123");
        assert!(Config::from_env().cloud.is_none());

        env::set_var("FIREBASE_PROJECT_ID", "carz34");
        env::set_var("FIREBASE_POLL_INTERVAL_MS", "500");
        let cloud = Config::from_env().cloud.expect("cloud config");
        assert_eq!(cloud.api_key, "key-123");
        assert_eq!(cloud.project_id, "carz34");
        assert_eq!(cloud.collection, "cars");
        assert_eq!(cloud.poll_interval, Duration::from_millis(500));

        env::set_var("FIREBASE_API_KEY", "");
        assert!(Config::from_env().cloud.is_none());

        clear_env();
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();

        env::set_var("CARZ_BIND_ADDR", "not-an-address");
        env::set_var("CARZ_STORAGE_QUOTA_BYTES", "lots");
        let config = Config::from_env();
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.storage_quota_bytes, DEFAULT_STORAGE_QUOTA_BYTES);

        clear_env();
    }
}
