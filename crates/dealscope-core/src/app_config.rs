/// Upper bound on records per persistence write chunk.
pub const MAX_WRITE_CHUNK_SIZE: usize = 25;

/// Longest deal lifetime accepted, in hours (100 years).
pub const MAX_DEAL_TTL_HOURS: i64 = 8760 * 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// Only needed by commands that touch the deals table.
    pub database_url: Option<String>,
    pub env: Environment,
    pub log_level: String,
    pub default_threshold_pct: f64,
    pub fetch_timeout_secs: u64,
    pub fetch_max_redirects: usize,
    pub fetch_user_agent: String,
    pub fetch_max_retries: u32,
    pub fetch_retry_backoff_base_secs: u64,
    pub max_concurrent_jobs: usize,
    pub deal_ttl_hours: i64,
    pub write_chunk_size: usize,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("default_threshold_pct", &self.default_threshold_pct)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("fetch_max_redirects", &self.fetch_max_redirects)
            .field("fetch_user_agent", &self.fetch_user_agent)
            .field("fetch_max_retries", &self.fetch_max_retries)
            .field(
                "fetch_retry_backoff_base_secs",
                &self.fetch_retry_backoff_base_secs,
            )
            .field("max_concurrent_jobs", &self.max_concurrent_jobs)
            .field("deal_ttl_hours", &self.deal_ttl_hours)
            .field("write_chunk_size", &self.write_chunk_size)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
