use crate::config::{Backend, ServerConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use place::store::mongo;
use place::{PlaceService, RedisCanvasCache, SystemClock};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Read and write paths over the configured collaborators
    pub service: PlaceService,

    /// Prometheus renderer, present when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
}

impl ServerState {
    /// Wrap an already built service.
    pub fn new(config: ServerConfig, service: PlaceService) -> Self {
        Self {
            config: Arc::new(config),
            service,
            metrics: None,
        }
    }

    /// Build the service for the configured backend.
    ///
    /// For the external backend this connects to MongoDB and Redis; failing to
    /// reach either is an error the caller should treat as fatal.
    pub async fn connect(config: ServerConfig) -> anyhow::Result<Self> {
        let layout = config.layout()?;
        let clock = Arc::new(SystemClock);

        let service = match config.backend {
            Backend::InMemory => {
                tracing::warn!("Using in-memory backend, squares are lost on restart");
                PlaceService::in_memory(layout, clock, config.cooldown_secs)
            }
            Backend::External => {
                let (squares, log) = mongo::connect(&config.mongo).await?;
                let cache = RedisCanvasCache::connect(&config.redis, layout).await?;
                PlaceService::new(
                    layout,
                    Arc::new(squares),
                    Arc::new(log),
                    Arc::new(cache),
                    clock,
                    config.cooldown_secs,
                )
            }
        };

        Ok(Self::new(config, service))
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
