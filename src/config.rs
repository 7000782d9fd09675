//! Configuration types for pastpaper-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Download behavior configuration (working directory, concurrency, timeouts)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Root for job working trees, job records and archives (default: "./temp_downloads")
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Maximum file fetches in flight across every job in the process (default: 15)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Total time allowed for one file fetch, in seconds (default: 30)
    #[serde(default = "default_download_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub download_timeout: Duration,

    /// Durable job record write cadence: every Nth completed file (default: 10)
    ///
    /// Every completion is still published to the in-memory table. The final
    /// completion is always written to disk regardless of this value.
    #[serde(default = "default_progress_save_interval")]
    pub progress_save_interval: usize,

    /// Age after which a finished job's artifacts are removed, in seconds (default: 1h)
    #[serde(default = "default_cleanup_ttl", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub cleanup_ttl: Duration,

    /// User-Agent sent with every request to the remote site
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            max_concurrent_downloads: default_max_concurrent(),
            download_timeout: default_download_timeout(),
            progress_save_interval: default_progress_save_interval(),
            cleanup_ttl: default_cleanup_ttl(),
            user_agent: default_user_agent(),
        }
    }
}

/// Expiry settings for cached remote metadata
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CacheConfig {
    /// Subject lists per qualification (default: 1h)
    #[serde(default = "default_one_hour", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub subjects_ttl: Duration,

    /// Season lists per subject (default: 1h)
    #[serde(default = "default_one_hour", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub seasons_ttl: Duration,

    /// File counts per season page (default: 24h)
    #[serde(default = "default_file_count_ttl", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub file_count_ttl: Duration,

    /// Qualification summary (default: 1h)
    #[serde(default = "default_one_hour", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub qualifications_ttl: Duration,

    /// How often expired entries and old job artifacts are swept (default: 10m)
    #[serde(default = "default_sweep_interval", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            subjects_ttl: default_one_hour(),
            seasons_ttl: default_one_hour(),
            file_count_ttl: default_file_count_ttl(),
            qualifications_ttl: default_one_hour(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

/// Remote site settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RemoteConfig {
    /// Origin of the past-paper site (default: "https://pastpapers.papacambridge.com")
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:8000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// Main configuration for PaperDownloader
///
/// Fields are organized into sub-configs:
/// - [`download`](DownloadConfig) - working directory, concurrency, timeouts
/// - [`cache`](CacheConfig) - metadata expiry
/// - [`remote`](RemoteConfig) - the site being crawled
/// - [`api`](ApiConfig) - the REST server
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Download behavior settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Metadata cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Remote site settings
    #[serde(default)]
    pub remote: RemoteConfig,

    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
}

/// Flat environment overrides, one optional field per variable
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    temp_download_dir: Option<PathBuf>,
    max_concurrent_downloads: Option<usize>,
    download_timeout: Option<u64>,
    progress_save_interval: Option<usize>,
    cleanup_ttl_hours: Option<u64>,
    subjects_cache_ttl_secs: Option<u64>,
    seasons_cache_ttl_secs: Option<u64>,
    file_count_cache_ttl_secs: Option<u64>,
    qualifications_cache_ttl_secs: Option<u64>,
    cache_sweep_interval_secs: Option<u64>,
    papacambridge_base_url: Option<String>,
    user_agent: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    cors_origins: Option<String>,
    swagger_ui: Option<bool>,
}

impl Config {
    /// Build a configuration from the process environment
    ///
    /// A `.env` file in the working directory is loaded first when present.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let overrides = envy::from_env::<EnvOverrides>().map_err(env_error)?;
        Self::default().with_overrides(overrides)
    }

    /// Build a configuration from explicit key/value pairs, as if they were
    /// environment variables
    pub fn from_env_iter<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let overrides = envy::from_iter::<_, EnvOverrides>(vars).map_err(env_error)?;
        Self::default().with_overrides(overrides)
    }

    fn with_overrides(mut self, env: EnvOverrides) -> Result<Self> {
        if let Some(dir) = env.temp_download_dir {
            self.download.temp_dir = dir;
        }
        if let Some(max) = env.max_concurrent_downloads {
            self.download.max_concurrent_downloads = max;
        }
        if let Some(secs) = env.download_timeout {
            self.download.download_timeout = Duration::from_secs(secs);
        }
        if let Some(every) = env.progress_save_interval {
            self.download.progress_save_interval = every;
        }
        if let Some(hours) = env.cleanup_ttl_hours {
            self.download.cleanup_ttl = Duration::from_secs(hours.saturating_mul(3600));
        }
        if let Some(ua) = env.user_agent {
            self.download.user_agent = ua;
        }
        if let Some(secs) = env.subjects_cache_ttl_secs {
            self.cache.subjects_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = env.seasons_cache_ttl_secs {
            self.cache.seasons_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = env.file_count_cache_ttl_secs {
            self.cache.file_count_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = env.qualifications_cache_ttl_secs {
            self.cache.qualifications_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = env.cache_sweep_interval_secs {
            self.cache.sweep_interval = Duration::from_secs(secs);
        }
        if let Some(base) = env.papacambridge_base_url {
            self.remote.base_url = base.trim_end_matches('/').to_string();
        }
        if env.host.is_some() || env.port.is_some() {
            let host = env
                .host
                .unwrap_or_else(|| self.api.bind_address.ip().to_string());
            let port = env.port.unwrap_or_else(|| self.api.bind_address.port());
            self.api.bind_address =
                format!("{host}:{port}")
                    .parse()
                    .map_err(|e| Error::Config {
                        message: format!("invalid bind address {host}:{port}: {e}"),
                        key: Some("HOST".to_string()),
                    })?;
        }
        if let Some(origins) = env.cors_origins {
            self.api.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(enabled) = env.swagger_ui {
            self.api.swagger_ui = enabled;
        }

        self.validate()?;
        Ok(self)
    }

    /// Reject settings the downloader cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.download.max_concurrent_downloads == 0 {
            return Err(Error::Config {
                message: "max_concurrent_downloads must be at least 1".to_string(),
                key: Some("MAX_CONCURRENT_DOWNLOADS".to_string()),
            });
        }
        if self.download.max_concurrent_downloads > MAX_CONCURRENT_DOWNLOADS_LIMIT {
            return Err(Error::Config {
                message: format!(
                    "max_concurrent_downloads must be at most {MAX_CONCURRENT_DOWNLOADS_LIMIT}"
                ),
                key: Some("MAX_CONCURRENT_DOWNLOADS".to_string()),
            });
        }
        if self.download.download_timeout.is_zero() {
            return Err(Error::Config {
                message: "download_timeout must be greater than zero".to_string(),
                key: Some("DOWNLOAD_TIMEOUT".to_string()),
            });
        }
        if self.cache.sweep_interval.is_zero() {
            return Err(Error::Config {
                message: "cache sweep interval must be greater than zero".to_string(),
                key: Some("CACHE_SWEEP_INTERVAL_SECS".to_string()),
            });
        }
        url::Url::parse(&self.remote.base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL {}: {e}", self.remote.base_url),
            key: Some("PAPACAMBRIDGE_BASE_URL".to_string()),
        })?;
        Ok(())
    }
}

/// Upper bound on simultaneous file fetches per job
pub const MAX_CONCURRENT_DOWNLOADS_LIMIT: usize = 1000;

fn env_error(e: envy::Error) -> Error {
    let key = match &e {
        envy::Error::MissingValue(field) => Some(field.to_uppercase()),
        envy::Error::Custom(_) => None,
    };
    Error::Config {
        message: e.to_string(),
        key,
    }
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("./temp_downloads")
}

fn default_max_concurrent() -> usize {
    15
}

fn default_download_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_progress_save_interval() -> usize {
    10
}

fn default_cleanup_ttl() -> Duration {
    Duration::from_secs(3600)
}

fn default_user_agent() -> String {
    format!("pastpaper-dl/{}", env!("CARGO_PKG_VERSION"))
}

fn default_one_hour() -> Duration {
    Duration::from_secs(3600)
}

fn default_file_count_ttl() -> Duration {
    Duration::from_secs(24 * 3600)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(600)
}

fn default_base_url() -> String {
    "https://pastpapers.papacambridge.com".to_string()
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
