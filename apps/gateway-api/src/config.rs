/// Gateway configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Shared HMAC secret used to verify bearer tokens. The same secret the
    /// campus HTTP services sign with.
    pub jwt_secret: String,
    /// Run mode. Production rejects unauthenticated handshakes.
    pub mode: RunMode,
    /// Origins allowed to open cross-origin connections, with credentials.
    pub allowed_origins: Vec<String>,
    /// Interval between server-sent pings (seconds).
    pub ping_interval_secs: u64,
    /// A connection silent for longer than this is forcibly closed (seconds).
    pub ping_timeout_secs: u64,
    /// Key the notification service presents on the internal dispatch route.
    pub service_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Development,
    Production,
}

impl RunMode {
    pub fn is_production(self) -> bool {
        matches!(self, RunMode::Production)
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a required variable is missing.
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4003),
            jwt_secret: required_var("JWT_SECRET"),
            mode: match std::env::var("APP_ENV").as_deref() {
                Ok("production") => RunMode::Production,
                _ => RunMode::Development,
            },
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            ping_interval_secs: env_u64("PING_INTERVAL_SECS", 25),
            ping_timeout_secs: env_u64("PING_TIMEOUT_SECS", 60),
            service_key: required_var("SERVICE_KEY"),
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn required_var(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} env var is required"))
}
