//! Read and write paths over the three collaborators.
//!
//! A placement runs in two stages. [`PlaceService::admit`] validates the
//! request and applies the cooldown without touching the square store;
//! [`PlaceService::commit`] then performs the upsert, the log append and the
//! cache field write, in that order. The HTTP layer runs `admit` as a gate in
//! front of the handler and `commit` inside it; [`PlaceService::place`] runs
//! both back to back.
//!
//! Only the square store is authoritative. A failed cache write is logged and
//! counted but the placement still succeeds; [`PlaceService::rebuild_canvas`]
//! brings the cache back in line.

use std::sync::Arc;

use bytes::Bytes;
use metrics::counter;
use tracing::{debug, info, warn};

use crate::cache::{CanvasCache, InMemoryCanvasCache};
use crate::canvas::CanvasLayout;
use crate::clock::Clock;
use crate::error::PlaceResult;
use crate::limiter::CooldownLimiter;
use crate::square::{Placement, PlacementEvent, PlacementReceipt, PlacementRequest, Square};
use crate::store::{InMemoryPlacementLog, InMemorySquareStore, PlacementLog, SquareStore};

#[derive(Clone)]
pub struct PlaceService {
    layout: CanvasLayout,
    squares: Arc<dyn SquareStore>,
    log: Arc<dyn PlacementLog>,
    cache: Arc<dyn CanvasCache>,
    clock: Arc<dyn Clock>,
    limiter: CooldownLimiter,
}

/// Reachability of each collaborator, as reported by `/ready`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Readiness {
    pub store: PlaceResult<()>,
    pub cache: PlaceResult<()>,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        self.store.is_ok() && self.cache.is_ok()
    }
}

impl PlaceService {
    pub fn new(
        layout: CanvasLayout,
        squares: Arc<dyn SquareStore>,
        log: Arc<dyn PlacementLog>,
        cache: Arc<dyn CanvasCache>,
        clock: Arc<dyn Clock>,
        cooldown_secs: u64,
    ) -> Self {
        let limiter = CooldownLimiter::new(log.clone(), cooldown_secs);
        Self {
            layout,
            squares,
            log,
            cache,
            clock,
            limiter,
        }
    }

    /// A service whose collaborators all live in process memory.
    pub fn in_memory(layout: CanvasLayout, clock: Arc<dyn Clock>, cooldown_secs: u64) -> Self {
        Self::new(
            layout,
            Arc::new(InMemorySquareStore::new()),
            Arc::new(InMemoryPlacementLog::new()),
            Arc::new(InMemoryCanvasCache::new(layout)),
            clock,
            cooldown_secs,
        )
    }

    pub fn layout(&self) -> &CanvasLayout {
        &self.layout
    }

    pub fn cooldown_secs(&self) -> u64 {
        self.limiter.cooldown_secs()
    }

    pub async fn list_squares(&self) -> PlaceResult<Vec<Square>> {
        self.squares.list().await
    }

    /// The square at `(x, y)`, or a blank one if nobody painted it.
    pub async fn get_square(&self, x: u32, y: u32) -> PlaceResult<Square> {
        Ok(self
            .squares
            .find(x, y)
            .await?
            .unwrap_or_else(|| Square::blank(x, y)))
    }

    /// The packed canvas. Never fails: a missing or unreadable cache value
    /// reads as an empty grid.
    pub async fn canvas(&self) -> Bytes {
        match self.cache.read().await {
            Ok(Some(bytes)) => Bytes::from(self.layout.normalize(bytes)),
            Ok(None) => Bytes::from(self.layout.blank()),
            Err(err) => {
                warn!(error = %err, "canvas cache read failed, serving empty canvas");
                Bytes::from(self.layout.blank())
            }
        }
    }

    /// Validate the request and apply the author's cooldown.
    pub async fn admit(&self, request: &PlacementRequest) -> PlaceResult<Placement> {
        let placement = request.validate(&self.layout)?;
        if let Err(err) = self.limiter.check(&placement.author, self.clock.now()).await {
            counter!("place_rate_limited_total").increment(1);
            return Err(err);
        }
        Ok(placement)
    }

    /// Store the square, log the event, then project it into the cache.
    pub async fn commit(&self, placement: Placement) -> PlaceResult<PlacementReceipt> {
        let timestamp = self.clock.now();
        let index = self.layout.field_index(placement.x, placement.y);
        let square = placement.into_square(timestamp);

        self.squares.upsert(&square).await?;
        self.log
            .append(&PlacementEvent {
                author: square.author.clone(),
                timestamp,
            })
            .await?;

        if let Err(err) = self.cache.set_field(index, square.color).await {
            counter!("place_cache_failures_total").increment(1);
            warn!(error = %err, x = square.x, y = square.y, "canvas cache update failed");
        }

        counter!("place_placements_total").increment(1);
        debug!(
            author = %square.author,
            x = square.x,
            y = square.y,
            color = square.color,
            "square placed"
        );
        Ok(PlacementReceipt::from(&square))
    }

    /// Admit and commit in one call.
    pub async fn place(&self, request: &PlacementRequest) -> PlaceResult<PlacementReceipt> {
        let placement = self.admit(request).await?;
        self.commit(placement).await
    }

    /// Regenerate the cached canvas from the square store.
    ///
    /// Returns the number of squares replayed.
    pub async fn rebuild_canvas(&self) -> PlaceResult<usize> {
        let squares = self.squares.list().await?;
        let canvas = self.layout.pack(&squares);
        self.cache.replace(&canvas).await?;
        info!(squares = squares.len(), bytes = canvas.len(), "canvas cache rebuilt");
        Ok(squares.len())
    }

    pub async fn readiness(&self) -> Readiness {
        Readiness {
            store: self.squares.ping().await,
            cache: self.cache.ping().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::ColorDepth;
    use crate::clock::ManualClock;
    use crate::error::PlaceError;
    use async_trait::async_trait;

    const START: i64 = 1_700_000_000;

    fn service(size: u32, cooldown: u64) -> (PlaceService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(START));
        let layout = CanvasLayout::new(size, ColorDepth::Byte).unwrap();
        (PlaceService::in_memory(layout, clock.clone(), cooldown), clock)
    }

    fn request(x: i64, y: i64, color: i64, author: &str) -> PlacementRequest {
        PlacementRequest {
            x,
            y,
            color,
            author: author.into(),
        }
    }

    #[tokio::test]
    async fn place_then_read_back() {
        let (service, _) = service(10, 1);
        let receipt = service.place(&request(4, 5, 12, "ann")).await.unwrap();
        assert_eq!(receipt.timestamp, START);

        let square = service.get_square(4, 5).await.unwrap();
        assert_eq!(square.color, 12);
        assert_eq!(square.author, "ann");
        assert_eq!(square.timestamp, START);
    }

    #[tokio::test]
    async fn replacing_keeps_one_record() {
        let (service, clock) = service(10, 1);
        service.place(&request(1, 1, 2, "ann")).await.unwrap();
        clock.advance(1);
        service.place(&request(1, 1, 3, "bob")).await.unwrap();

        let squares = service.list_squares().await.unwrap();
        assert_eq!(squares.len(), 1);
        assert_eq!(squares[0].color, 3);
        assert_eq!(squares[0].author, "bob");
    }

    #[tokio::test]
    async fn unplaced_square_is_blank() {
        let (service, _) = service(10, 1);
        assert_eq!(service.get_square(7, 8).await.unwrap(), Square::blank(7, 8));
    }

    #[tokio::test]
    async fn cooldown_blocks_then_releases() {
        let (service, clock) = service(10, 5);
        service.place(&request(0, 0, 1, "ann")).await.unwrap();

        clock.advance(2);
        assert_eq!(
            service.place(&request(1, 0, 1, "ann")).await,
            Err(PlaceError::RateLimited { retry_after: 3 })
        );
        assert_eq!(service.get_square(1, 0).await.unwrap().color, 0);

        clock.advance(3);
        assert!(service.place(&request(1, 0, 1, "ann")).await.is_ok());
    }

    #[tokio::test]
    async fn invalid_input_touches_nothing() {
        let (service, _) = service(10, 1);
        assert!(matches!(
            service.place(&request(10, 0, 1, "ann")).await,
            Err(PlaceError::InvalidInput(_))
        ));
        assert!(service.list_squares().await.unwrap().is_empty());
        assert!(service.admit(&request(0, 0, 1, "ann")).await.is_ok());
    }

    #[tokio::test]
    async fn canvas_reflects_placement() {
        let (service, _) = service(10, 1);
        assert_eq!(service.canvas().await, Bytes::from(vec![0u8; 100]));

        service.place(&request(2, 3, 7, "ann")).await.unwrap();
        let canvas = service.canvas().await;
        assert_eq!(canvas.len(), 100);
        assert_eq!(service.layout().get(&canvas, 32), 7);
        assert_eq!(canvas.iter().filter(|&&b| b != 0).count(), 1);
    }

    struct BrokenCache;

    #[async_trait]
    impl CanvasCache for BrokenCache {
        async fn set_field(&self, _index: usize, _color: u8) -> PlaceResult<()> {
            Err(PlaceError::cache("connection reset"))
        }

        async fn read(&self) -> PlaceResult<Option<Vec<u8>>> {
            Err(PlaceError::cache("connection reset"))
        }

        async fn replace(&self, _canvas: &[u8]) -> PlaceResult<()> {
            Err(PlaceError::cache("connection reset"))
        }

        async fn ping(&self) -> PlaceResult<()> {
            Err(PlaceError::cache("connection reset"))
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl SquareStore for BrokenStore {
        async fn upsert(&self, _square: &Square) -> PlaceResult<()> {
            Err(PlaceError::store("not primary"))
        }

        async fn find(&self, _x: u32, _y: u32) -> PlaceResult<Option<Square>> {
            Err(PlaceError::store("not primary"))
        }

        async fn list(&self) -> PlaceResult<Vec<Square>> {
            Err(PlaceError::store("not primary"))
        }
    }

    struct BrokenLog;

    #[async_trait]
    impl PlacementLog for BrokenLog {
        async fn append(&self, _event: &PlacementEvent) -> PlaceResult<()> {
            Err(PlaceError::store("log unavailable"))
        }

        async fn latest(&self, _author: &str) -> PlaceResult<Option<PlacementEvent>> {
            Err(PlaceError::store("log unavailable"))
        }
    }

    #[tokio::test]
    async fn log_failure_fails_admit_and_commit() {
        let layout = CanvasLayout::new(3, ColorDepth::Byte).unwrap();
        let service = PlaceService::new(
            layout,
            Arc::new(InMemorySquareStore::new()),
            Arc::new(BrokenLog),
            Arc::new(InMemoryCanvasCache::new(layout)),
            Arc::new(ManualClock::new(START)),
            1,
        );

        assert_eq!(
            service.admit(&request(1, 1, 4, "ann")).await,
            Err(PlaceError::Store("log unavailable".into()))
        );

        let placement = request(1, 1, 4, "ann").validate(&layout).unwrap();
        assert_eq!(
            service.commit(placement).await,
            Err(PlaceError::Store("log unavailable".into()))
        );
    }

    #[tokio::test]
    async fn cache_failure_does_not_fail_placement() {
        let layout = CanvasLayout::new(3, ColorDepth::Byte).unwrap();
        let squares = Arc::new(InMemorySquareStore::new());
        let service = PlaceService::new(
            layout,
            squares.clone(),
            Arc::new(InMemoryPlacementLog::new()),
            Arc::new(BrokenCache),
            Arc::new(ManualClock::new(START)),
            1,
        );

        service.place(&request(1, 1, 4, "ann")).await.unwrap();
        assert_eq!(squares.len(), 1);
        assert_eq!(service.canvas().await, Bytes::from(vec![0u8; 9]));
        assert!(matches!(service.rebuild_canvas().await, Err(PlaceError::Cache(_))));
        assert!(!service.readiness().await.is_ready());
    }

    #[tokio::test]
    async fn store_failure_is_reported_and_not_logged() {
        let layout = CanvasLayout::new(3, ColorDepth::Byte).unwrap();
        let log = Arc::new(InMemoryPlacementLog::new());
        let service = PlaceService::new(
            layout,
            Arc::new(BrokenStore),
            log.clone(),
            Arc::new(InMemoryCanvasCache::new(layout)),
            Arc::new(ManualClock::new(START)),
            1,
        );

        assert_eq!(
            service.place(&request(1, 1, 4, "ann")).await,
            Err(PlaceError::Store("not primary".into()))
        );
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn rebuild_restores_lost_cache() {
        let layout = CanvasLayout::new(3, ColorDepth::Nibble).unwrap();
        let cache = Arc::new(InMemoryCanvasCache::new(layout));
        let clock = Arc::new(ManualClock::new(START));
        let service = PlaceService::new(
            layout,
            Arc::new(InMemorySquareStore::new()),
            Arc::new(InMemoryPlacementLog::new()),
            cache.clone(),
            clock.clone(),
            0,
        );

        service.place(&request(0, 0, 0xA, "ann")).await.unwrap();
        service.place(&request(2, 2, 0x5, "bob")).await.unwrap();
        let before = service.canvas().await;

        cache.evict();
        assert_eq!(service.canvas().await, Bytes::from(layout.blank()));

        assert_eq!(service.rebuild_canvas().await.unwrap(), 2);
        assert_eq!(service.canvas().await, before);
        assert_eq!(before.len(), 9);
        assert_eq!(before[0], 0xA0);
        assert_eq!(before[4], 0x50);
    }
}
