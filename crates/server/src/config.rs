use place::{CanvasLayout, ColorDepth, DEFAULT_COOLDOWN_SECS, MongoConfig, RedisConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Where squares, the placement log and the canvas live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// MongoDB for squares and the log, Redis for the canvas.
    #[default]
    External,
    /// Everything in process memory. Lost on restart.
    InMemory,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in KB
    #[serde(default = "default_max_body_size_kb")]
    pub max_body_size_kb: usize,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Seconds an author must wait between two placements
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Width and height of the canvas in squares
    #[serde(default = "default_canvas_size")]
    pub canvas_size: u32,

    /// Bits per square in the packed canvas (4 or 8)
    #[serde(default)]
    pub color_depth: ColorDepth,

    #[serde(default)]
    pub backend: Backend,

    /// Replay the square store into the canvas cache before serving
    #[serde(default)]
    pub rebuild_canvas_on_start: bool,

    #[serde(default)]
    pub mongo: MongoConfig,

    #[serde(default)]
    pub redis: RedisConfig,

    /// `.env` file picked up by [`ServerConfig::load`], logged once tracing is up
    #[serde(skip)]
    pub env_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_kb: default_max_body_size_kb(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
            cooldown_secs: default_cooldown_secs(),
            canvas_size: default_canvas_size(),
            color_depth: ColorDepth::default(),
            backend: Backend::default(),
            rebuild_canvas_on_start: false,
            mongo: MongoConfig::default(),
            redis: RedisConfig::default(),
            env_file: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from `.env`, an optional `place` config file and
    /// `PLACE__*` environment variables, in increasing priority.
    pub fn load() -> anyhow::Result<Self> {
        let env_file = dotenvy::dotenv().ok();

        let builder = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::with_name("place").required(false))
            // Override with environment variables
            .add_source(
                config::Environment::with_prefix("PLACE")
                    .prefix_separator("__")
                    .separator("__"),
            );

        let mut config: ServerConfig = builder.build()?.try_deserialize()?;
        config.layout()?;
        config.env_file = env_file;

        Ok(config)
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Canvas geometry described by this configuration
    pub fn layout(&self) -> anyhow::Result<CanvasLayout> {
        Ok(CanvasLayout::new(self.canvas_size, self.color_depth)?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_kb * 1024
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_size_kb() -> usize {
    16
}

fn default_cooldown_secs() -> u64 {
    DEFAULT_COOLDOWN_SECS
}

fn default_canvas_size() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
