//! Packed canvas cache.
//!
//! The cache is a projection of the square store: one byte string holding
//! every cell as a fixed-width field (see [`CanvasLayout`]). It is updated
//! with one atomic field write per placement and can be rebuilt wholesale
//! from the store. A missing value means an empty canvas.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::canvas::CanvasLayout;
use crate::error::{PlaceError, PlaceResult};

#[async_trait]
pub trait CanvasCache: Send + Sync {
    /// Atomically set one field of the packed canvas.
    async fn set_field(&self, index: usize, color: u8) -> PlaceResult<()>;
    /// Raw packed bytes, or `None` when nothing is cached yet.
    async fn read(&self) -> PlaceResult<Option<Vec<u8>>>;
    /// Overwrite the whole packed canvas.
    async fn replace(&self, canvas: &[u8]) -> PlaceResult<()>;
    async fn ping(&self) -> PlaceResult<()> {
        Ok(())
    }
}

/// Cache kept in process memory, laid out exactly like the Redis value.
pub struct InMemoryCanvasCache {
    layout: CanvasLayout,
    canvas: RwLock<Option<Vec<u8>>>,
}

impl InMemoryCanvasCache {
    pub fn new(layout: CanvasLayout) -> Self {
        Self {
            layout,
            canvas: RwLock::new(None),
        }
    }

    /// Drop the cached value, as if the cache server lost it.
    pub fn evict(&self) {
        if let Ok(mut guard) = self.canvas.write() {
            guard.take();
        }
    }
}

#[async_trait]
impl CanvasCache for InMemoryCanvasCache {
    async fn set_field(&self, index: usize, color: u8) -> PlaceResult<()> {
        let mut guard = self
            .canvas
            .write()
            .map_err(|_| PlaceError::cache("poisoned lock"))?;
        let canvas = guard.get_or_insert_with(|| self.layout.blank());
        self.layout.set(canvas, index, color);
        Ok(())
    }

    async fn read(&self) -> PlaceResult<Option<Vec<u8>>> {
        let guard = self
            .canvas
            .read()
            .map_err(|_| PlaceError::cache("poisoned lock"))?;
        Ok(guard.clone())
    }

    async fn replace(&self, canvas: &[u8]) -> PlaceResult<()> {
        *self
            .canvas
            .write()
            .map_err(|_| PlaceError::cache("poisoned lock"))? = Some(canvas.to_vec());
        Ok(())
    }
}

#[cfg(feature = "redis")]
pub mod redis;

#[cfg(feature = "redis")]
pub use self::redis::{RedisCanvasCache, RedisConfig};
