//! # Redis
//!
//! RAM cache for the packed canvas.
//!
//! ## Implementation
//!
//! - One string key per canvas size: `squares-{size}`
//! - Placements go through `BITFIELD key SET u4|u8 #index color`, which Redis
//!   applies atomically, so concurrent writes to different cells never clobber
//!   each other
//! - Reads use `GETRANGE` bounded to the canvas length
//! - Repair overwrites the whole key with one `SET`
//! - A missing key reads back as an empty string, i.e. an all-zero canvas
use std::time::Duration;

use async_trait::async_trait;
use redis::{
    Client, cmd,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::CanvasCache;
use crate::canvas::CanvasLayout;
use crate::error::PlaceResult;

/// Connection parameters for the canvas cache.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    /// `host:port` of the Redis server.
    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub db: i64,

    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            password: None,
            db: 0,
            connection_timeout_ms: default_connection_timeout_ms(),
        }
    }
}

impl RedisConfig {
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) if !password.is_empty() => {
                format!("redis://:{password}@{}/{}", self.address, self.db)
            }
            _ => format!("redis://{}/{}", self.address, self.db),
        }
    }
}

fn default_address() -> String {
    "localhost:6379".to_string()
}

fn default_connection_timeout_ms() -> u64 {
    500
}

pub struct RedisCanvasCache {
    connection: ConnectionManager,
    layout: CanvasLayout,
    key: String,
}

impl RedisCanvasCache {
    pub async fn connect(config: &RedisConfig, layout: CanvasLayout) -> PlaceResult<Self> {
        let manager_config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_millis(config.connection_timeout_ms));

        let client = Client::open(config.url())?;
        let connection = client
            .get_connection_manager_with_config(manager_config)
            .await?;
        info!(address = %config.address, key = %layout.cache_key(), "connected to canvas cache");

        Ok(Self {
            connection,
            key: layout.cache_key(),
            layout,
        })
    }
}

#[async_trait]
impl CanvasCache for RedisCanvasCache {
    async fn set_field(&self, index: usize, color: u8) -> PlaceResult<()> {
        let mut connection = self.connection.clone();
        let _previous: Vec<i64> = cmd("BITFIELD")
            .arg(&self.key)
            .arg("SET")
            .arg(self.layout.depth().bitfield_type())
            .arg(format!("#{index}"))
            .arg(color)
            .query_async(&mut connection)
            .await?;
        Ok(())
    }

    async fn read(&self) -> PlaceResult<Option<Vec<u8>>> {
        let mut connection = self.connection.clone();
        let last = self.layout.byte_len().saturating_sub(1);
        let bytes: Vec<u8> = cmd("GETRANGE")
            .arg(&self.key)
            .arg(0)
            .arg(last)
            .query_async(&mut connection)
            .await?;
        Ok((!bytes.is_empty()).then_some(bytes))
    }

    async fn replace(&self, canvas: &[u8]) -> PlaceResult<()> {
        let mut connection = self.connection.clone();
        let () = cmd("SET")
            .arg(&self.key)
            .arg(canvas)
            .query_async(&mut connection)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> PlaceResult<()> {
        let mut connection = self.connection.clone();
        let _pong: String = cmd("PING").query_async(&mut connection).await?;
        Ok(())
    }
}
