//! Square store and placement log.
//!
//! The square store is the source of truth for the canvas: one record per
//! coordinate, overwritten on every placement. The placement log is an
//! append-only list of `{author, timestamp}` used only by the cooldown
//! limiter.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{PlaceError, PlaceResult};
use crate::square::{PlacementEvent, Square};

/// Persistent collection of squares keyed by `(x, y)`.
#[async_trait]
pub trait SquareStore: Send + Sync {
    /// Insert the square, or overwrite color/author/timestamp of the record
    /// already at its coordinate. Must be a single atomic operation.
    async fn upsert(&self, square: &Square) -> PlaceResult<()>;
    /// The square at `(x, y)`, if one was ever placed.
    async fn find(&self, x: u32, y: u32) -> PlaceResult<Option<Square>>;
    /// Every stored square, in no particular order.
    async fn list(&self) -> PlaceResult<Vec<Square>>;
    /// Round trip to the backing store.
    async fn ping(&self) -> PlaceResult<()> {
        Ok(())
    }
}

/// Append-only log of placement events.
#[async_trait]
pub trait PlacementLog: Send + Sync {
    async fn append(&self, event: &PlacementEvent) -> PlaceResult<()>;
    /// The most recent event for `author` by timestamp.
    async fn latest(&self, author: &str) -> PlaceResult<Option<PlacementEvent>>;
}

/// Square store backed by a `HashMap` behind a `RwLock`.
#[derive(Default)]
pub struct InMemorySquareStore {
    squares: RwLock<HashMap<(u32, u32), Square>>,
}

impl InMemorySquareStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.squares.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SquareStore for InMemorySquareStore {
    async fn upsert(&self, square: &Square) -> PlaceResult<()> {
        self.squares
            .write()
            .map_err(|_| PlaceError::store("poisoned lock"))?
            .insert((square.x, square.y), square.clone());
        Ok(())
    }

    async fn find(&self, x: u32, y: u32) -> PlaceResult<Option<Square>> {
        let guard = self
            .squares
            .read()
            .map_err(|_| PlaceError::store("poisoned lock"))?;
        Ok(guard.get(&(x, y)).cloned())
    }

    async fn list(&self) -> PlaceResult<Vec<Square>> {
        let guard = self
            .squares
            .read()
            .map_err(|_| PlaceError::store("poisoned lock"))?;
        Ok(guard.values().cloned().collect())
    }
}

/// Placement log backed by a `Vec` behind a `RwLock`.
#[derive(Default)]
pub struct InMemoryPlacementLog {
    events: RwLock<Vec<PlacementEvent>>,
}

impl InMemoryPlacementLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PlacementLog for InMemoryPlacementLog {
    async fn append(&self, event: &PlacementEvent) -> PlaceResult<()> {
        self.events
            .write()
            .map_err(|_| PlaceError::store("poisoned lock"))?
            .push(event.clone());
        Ok(())
    }

    async fn latest(&self, author: &str) -> PlaceResult<Option<PlacementEvent>> {
        let guard = self
            .events
            .read()
            .map_err(|_| PlaceError::store("poisoned lock"))?;
        Ok(guard
            .iter()
            .filter(|event| event.author == author)
            .max_by_key(|event| event.timestamp)
            .cloned())
    }
}

#[cfg(feature = "mongo")]
pub mod mongo;

#[cfg(feature = "mongo")]
pub use mongo::{MongoPlacementLog, MongoSquareStore};
