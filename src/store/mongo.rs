//! MongoDB square store and placement log.
//!
//! Squares live in one collection with a unique `{x, y}` index so concurrent
//! upserts at the same coordinate can never produce two documents. Placement
//! events live in a second collection indexed by `{author, timestamp}` for
//! the limiter's "latest event" lookup.
//!
//! # Configuration Example
//! ```toml
//! [mongo]
//! address = "localhost"
//! port = 27017
//! database = "place"
//! auth_source = "admin"
//! username = "place"
//! password = "place"
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::{ClientOptions, Credential, IndexOptions};
use mongodb::{Client, Collection, IndexModel};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PlaceResult;
use crate::square::{PlacementEvent, Square};
use crate::store::{PlacementLog, SquareStore};

/// Connection parameters for the document store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MongoConfig {
    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_auth_source")]
    pub auth_source: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_squares_collection")]
    pub squares_collection: String,

    #[serde(default = "default_timestamps_collection")]
    pub timestamps_collection: String,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            database: default_database(),
            auth_source: default_auth_source(),
            username: None,
            password: None,
            squares_collection: default_squares_collection(),
            timestamps_collection: default_timestamps_collection(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl MongoConfig {
    pub fn uri(&self) -> String {
        format!("mongodb://{}:{}/{}", self.address, self.port, self.database)
    }

    fn credential(&self) -> Option<Credential> {
        if self.username.is_none() && self.password.is_none() {
            return None;
        }
        let mut credential = Credential::default();
        credential.username = self.username.clone();
        credential.password = self.password.clone();
        credential.source = Some(self.auth_source.clone());
        Some(credential)
    }
}

fn default_address() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    27017
}

fn default_database() -> String {
    "place".to_string()
}

fn default_auth_source() -> String {
    "admin".to_string()
}

fn default_squares_collection() -> String {
    "squares".to_string()
}

fn default_timestamps_collection() -> String {
    "last_timestamps".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

/// Connect, ping, and make sure both collections carry their indexes.
///
/// Any failure here means the service cannot run; callers treat it as fatal.
pub async fn connect(config: &MongoConfig) -> PlaceResult<(MongoSquareStore, MongoPlacementLog)> {
    let mut options = ClientOptions::parse(config.uri()).await?;
    options.credential = config.credential();
    options.connect_timeout = Some(Duration::from_millis(config.connect_timeout_ms));
    options.server_selection_timeout = Some(Duration::from_millis(config.connect_timeout_ms));

    let client = Client::with_options(options)?;
    let database = client.database(&config.database);
    database.run_command(doc! { "ping": 1 }).await?;
    info!(uri = %config.uri(), "connected to document store");

    let squares = MongoSquareStore {
        client: client.clone(),
        database: config.database.clone(),
        squares: database.collection(&config.squares_collection),
    };
    squares.ensure_indexes().await?;

    let log = MongoPlacementLog {
        events: database.collection(&config.timestamps_collection),
    };
    log.ensure_indexes().await?;

    Ok((squares, log))
}

pub struct MongoSquareStore {
    client: Client,
    database: String,
    squares: Collection<Square>,
}

impl MongoSquareStore {
    async fn ensure_indexes(&self) -> PlaceResult<()> {
        let by_coordinate = IndexModel::builder()
            .keys(doc! { "x": 1, "y": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.squares.create_index(by_coordinate).await?;
        Ok(())
    }
}

#[async_trait]
impl SquareStore for MongoSquareStore {
    async fn upsert(&self, square: &Square) -> PlaceResult<()> {
        let filter = doc! { "x": i64::from(square.x), "y": i64::from(square.y) };
        let update = doc! {
            "$set": {
                "x": i64::from(square.x),
                "y": i64::from(square.y),
                "color": i32::from(square.color),
                "author": &square.author,
                "timestamp": square.timestamp,
            }
        };
        self.squares.update_one(filter, update).upsert(true).await?;
        Ok(())
    }

    async fn find(&self, x: u32, y: u32) -> PlaceResult<Option<Square>> {
        let filter = doc! { "x": i64::from(x), "y": i64::from(y) };
        Ok(self.squares.find_one(filter).await?)
    }

    async fn list(&self) -> PlaceResult<Vec<Square>> {
        let cursor = self.squares.find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn ping(&self) -> PlaceResult<()> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }
}

pub struct MongoPlacementLog {
    events: Collection<PlacementEvent>,
}

impl MongoPlacementLog {
    async fn ensure_indexes(&self) -> PlaceResult<()> {
        let by_author = IndexModel::builder()
            .keys(doc! { "author": 1, "timestamp": -1 })
            .build();
        self.events.create_index(by_author).await?;
        Ok(())
    }
}

#[async_trait]
impl PlacementLog for MongoPlacementLog {
    async fn append(&self, event: &PlacementEvent) -> PlaceResult<()> {
        self.events.insert_one(event).await?;
        Ok(())
    }

    async fn latest(&self, author: &str) -> PlaceResult<Option<PlacementEvent>> {
        Ok(self
            .events
            .find_one(doc! { "author": author })
            .sort(doc! { "timestamp": -1 })
            .await?)
    }
}
