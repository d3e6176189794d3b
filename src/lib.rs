//! Collaborative canvas core.
//!
//! Clients paint squares on a fixed-size grid. This crate owns everything
//! behind the HTTP surface:
//!
//! - [`square`]: squares, placement requests and their validation
//! - [`canvas`]: the packed bitfield layout of the whole grid
//! - [`store`]: the authoritative square store and the placement log
//! - [`cache`]: the packed canvas projection
//! - [`limiter`]: the per-author cooldown
//! - [`service`]: read and write paths tying the above together
//!
//! Collaborators are trait objects built once at startup and handed to
//! [`PlaceService`]. In-memory implementations back tests and local runs;
//! MongoDB (`mongo` feature) and Redis (`redis` feature) back production.
//!
//! ```
//! use std::sync::Arc;
//! use place::{CanvasLayout, ColorDepth, PlaceService, PlacementRequest, SystemClock};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), place::PlaceError> {
//! let layout = CanvasLayout::new(10, ColorDepth::Byte)?;
//! let service = PlaceService::in_memory(layout, Arc::new(SystemClock), 1);
//!
//! let request = PlacementRequest { x: 2, y: 3, color: 7, author: "ann".into() };
//! service.place(&request).await?;
//!
//! let canvas = service.canvas().await;
//! assert_eq!(layout.color_at(&canvas, 2, 3), 7);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod canvas;
pub mod clock;
pub mod error;
pub mod limiter;
pub mod service;
pub mod square;
pub mod store;

pub use cache::{CanvasCache, InMemoryCanvasCache};
pub use canvas::{CanvasLayout, ColorDepth};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{PlaceError, PlaceResult};
pub use limiter::{CooldownLimiter, DEFAULT_COOLDOWN_SECS};
pub use service::{PlaceService, Readiness};
pub use square::{
    COLOR_LIMIT, Placement, PlacementEvent, PlacementReceipt, PlacementRequest, Square,
};
pub use store::{InMemoryPlacementLog, InMemorySquareStore, PlacementLog, SquareStore};

#[cfg(feature = "redis")]
pub use cache::{RedisCanvasCache, RedisConfig};
#[cfg(feature = "mongo")]
pub use store::{MongoPlacementLog, MongoSquareStore, mongo::MongoConfig};
