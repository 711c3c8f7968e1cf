//! Upstream fetch stage - downloads the tiles a grid plan needs.
//!
//! Every distinct coordinate in the plan is fetched concurrently via a
//! Tokio `JoinSet`; one tile's failure never aborts its siblings. Each
//! fetch carries its own timeout, and a cancellation token bounds the
//! whole fan-out: when the request deadline fires, outstanding fetches
//! are abandoned and composition proceeds with whatever resolved.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::coord::TileCoord;
use crate::grid::GridPlan;
use crate::provider::{ProviderError, TileProvider};

/// Per-request fetch outcomes, keyed by tile coordinate.
///
/// Write-once and local to a single render; never shared across requests.
/// A coordinate absent from both maps was abandoned at the deadline and
/// is treated exactly like a recorded failure.
#[derive(Debug, Default)]
pub struct TileResults {
    tiles: HashMap<TileCoord, Bytes>,
    failures: HashMap<TileCoord, ProviderError>,
}

impl TileResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful fetch.
    pub fn add_success(&mut self, tile: TileCoord, data: Bytes) {
        self.tiles.insert(tile, data);
    }

    /// Record a failed fetch.
    pub fn add_failure(&mut self, tile: TileCoord, error: ProviderError) {
        self.failures.insert(tile, error);
    }

    /// Fetched bytes for a coordinate, if it succeeded.
    pub fn get(&self, tile: &TileCoord) -> Option<&Bytes> {
        self.tiles.get(tile)
    }

    pub fn success_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// True when not a single tile was fetched.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// Fetches every distinct tile in the plan concurrently.
///
/// # Arguments
///
/// * `plan` - The grid plan whose coordinates to fetch
/// * `provider` - Upstream tile provider
/// * `timeout` - Per-fetch time budget (shorter than the request deadline)
/// * `cancel` - Deadline token; cancelling abandons unresolved fetches
///
/// # Returns
///
/// `TileResults` with per-coordinate successes and failures. Never fails
/// as a whole: a fully failed fan-out simply returns empty results.
#[instrument(skip_all, fields(zoom = plan.effective_zoom(), tiles = plan.tiles().len()))]
pub async fn fetch_plan<P>(
    plan: &GridPlan,
    provider: Arc<P>,
    timeout: Duration,
    cancel: CancellationToken,
) -> TileResults
where
    P: TileProvider + 'static,
{
    let mut results = TileResults::new();

    if cancel.is_cancelled() {
        debug!("Fetch cancelled before starting");
        return results;
    }

    let mut fetches = JoinSet::new();

    // Duplicate coordinates (grid wrap at low zoom, row clamp at the
    // poles) are fetched once and reused for every destination offset
    for coord in plan.distinct_coords() {
        let provider = Arc::clone(&provider);
        fetches.spawn(async move {
            let outcome = match tokio::time::timeout(timeout, provider.fetch_tile(&coord)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::TimedOut),
            };
            (coord, outcome)
        });
    }

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!(
                    resolved = results.success_count() + results.failure_count(),
                    "Deadline reached - abandoning outstanding tile fetches"
                );
                fetches.abort_all();
                break;
            }

            next = fetches.join_next() => {
                match next {
                    Some(Ok((coord, Ok(data)))) => {
                        results.add_success(coord, data);
                    }
                    Some(Ok((coord, Err(error)))) => {
                        warn!(tile = %coord, error = %error, "Tile fetch failed");
                        results.add_failure(coord, error);
                    }
                    Some(Err(join_err)) => {
                        if !join_err.is_cancelled() {
                            warn!(error = %join_err, "Tile fetch task panicked");
                        }
                    }
                    None => break,
                }
            }
        }
    }

    debug!(
        success = results.success_count(),
        failed = results.failure_count(),
        "Fetch stage complete"
    );

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::GeoPoint;
    use crate::provider::MockTileProvider;

    fn plan_2x2() -> GridPlan {
        // London at zoom 5, 256px output: 2×2 grid at zoom 6, 4 distinct
        let center = GeoPoint::new(51.5, -0.12).unwrap();
        GridPlan::build(center, 5, 256, 256).unwrap()
    }

    #[tokio::test]
    async fn test_all_tiles_fetched() {
        let plan = plan_2x2();
        let provider = Arc::new(MockTileProvider::always(Ok(Bytes::from_static(b"png"))));

        let results = fetch_plan(
            &plan,
            Arc::clone(&provider),
            Duration::from_secs(1),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(results.success_count(), 4);
        assert_eq!(results.failure_count(), 0);
        for coord in plan.distinct_coords() {
            assert!(results.get(&coord).is_some());
        }
    }

    #[tokio::test]
    async fn test_single_failure_does_not_abort_siblings() {
        let plan = plan_2x2();
        let bad = plan.distinct_coords()[0];
        let provider = Arc::new(
            MockTileProvider::always(Ok(Bytes::from_static(b"png"))).with_response(
                bad,
                Err(ProviderError::Status { code: 500, url: "http://x".into() }),
            ),
        );

        let results = fetch_plan(
            &plan,
            provider,
            Duration::from_secs(1),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(results.success_count(), 3);
        assert_eq!(results.failure_count(), 1);
        assert!(results.get(&bad).is_none());
    }

    #[tokio::test]
    async fn test_duplicates_fetched_once() {
        // Zoom 0 with a sub-tile output: 4 grid cells, 1 distinct coord
        let center = GeoPoint::new(51.5, -0.12).unwrap();
        let plan = GridPlan::build(center, 0, 128, 256).unwrap();
        assert_eq!(plan.tiles().len(), 4);

        let provider = Arc::new(MockTileProvider::always(Ok(Bytes::from_static(b"png"))));
        let results = fetch_plan(
            &plan,
            Arc::clone(&provider),
            Duration::from_secs(1),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(provider.call_count(), 1);
        assert_eq!(results.success_count(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_returns_empty() {
        let plan = plan_2x2();
        let provider = Arc::new(MockTileProvider::always(Ok(Bytes::from_static(b"png"))));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let results = fetch_plan(&plan, provider, Duration::from_secs(1), cancel).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        struct SlowProvider;

        impl TileProvider for SlowProvider {
            async fn fetch_tile(&self, _tile: &TileCoord) -> Result<Bytes, ProviderError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Bytes::new())
            }

            fn name(&self) -> &str {
                "Slow"
            }

            fn min_zoom(&self) -> u8 {
                0
            }

            fn max_zoom(&self) -> u8 {
                18
            }
        }

        let plan = plan_2x2();
        let results = fetch_plan(
            &plan,
            Arc::new(SlowProvider),
            Duration::from_millis(10),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(results.success_count(), 0);
        assert_eq!(results.failure_count(), 4);
    }

    #[tokio::test]
    async fn test_deadline_abandons_hung_fetches() {
        struct HungProvider;

        impl TileProvider for HungProvider {
            async fn fetch_tile(&self, _tile: &TileCoord) -> Result<Bytes, ProviderError> {
                std::future::pending().await
            }

            fn name(&self) -> &str {
                "Hung"
            }

            fn min_zoom(&self) -> u8 {
                0
            }

            fn max_zoom(&self) -> u8 {
                18
            }
        }

        let plan = plan_2x2();
        let cancel = CancellationToken::new();
        let deadline = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            deadline.cancel();
        });

        // Per-fetch timeout is far beyond the deadline; the token must
        // still unblock the fan-in
        let results = fetch_plan(
            &plan,
            Arc::new(HungProvider),
            Duration::from_secs(60),
            cancel,
        )
        .await;

        assert_eq!(results.success_count(), 0);
    }
}
