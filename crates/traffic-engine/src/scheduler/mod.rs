// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Recompute scheduling.
//!
//! [`RecomputeScheduler`] runs two independent pipelines on the tokio runtime:
//!
//! - **Viewport**: bounds events are debounced (trailing edge) and the settled
//!   bounds produce a new [`VisibleSet`].
//! - **Traffic**: an interval plus manual triggers fetch flight records for a
//!   window around "now" and produce a new [`IntensitySnapshot`].
//!
//! Both results are published through `watch` channels as `Arc` snapshots, so
//! readers always see a complete value. Disposing the scheduler (or dropping
//! it) cancels both tasks. [`RecomputeScheduler::shutdown`] also waits for
//! them to exit, after which nothing can be published.

mod debounce;

pub use debounce::{Debouncer, Settled};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::catalog::AirportCatalog;
use crate::feed::{QueryWindow, TrafficFeed, DEFAULT_HALF_WINDOW_MINUTES};
use crate::frame::MapFrame;
use crate::intensity::{IntensitySnapshot, IntensityThresholds};
use crate::viewport::{ViewportBounds, VisibleSet};

/// Configuration for [`RecomputeScheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Quiet period after the last viewport event before filtering.
    pub debounce: Duration,
    /// Period of the automatic traffic refresh. The first refresh runs immediately.
    pub refresh_interval: Duration,
    /// Half-width of the traffic query window around "now".
    pub traffic_half_window: chrono::Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            refresh_interval: Duration::from_secs(60),
            traffic_half_window: chrono::Duration::minutes(DEFAULT_HALF_WINDOW_MINUTES),
        }
    }
}

/// Health of the traffic pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshStatus {
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub in_flight: bool,
}

impl RefreshStatus {
    /// True when the published snapshot is older than the latest attempt.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.consecutive_failures > 0
    }
}

/// Handle to the running viewport and traffic pipelines.
pub struct RecomputeScheduler {
    viewport_tx: mpsc::UnboundedSender<ViewportBounds>,
    refresh_tx: mpsc::Sender<()>,
    visible_rx: watch::Receiver<Arc<VisibleSet>>,
    intensity_rx: watch::Receiver<Arc<IntensitySnapshot>>,
    status_rx: watch::Receiver<RefreshStatus>,
    cancel_token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for RecomputeScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecomputeScheduler")
            .field("cancel_token", &self.cancel_token)
            .finish_non_exhaustive()
    }
}

impl RecomputeScheduler {
    /// Spawn both pipelines on the current tokio runtime.
    ///
    /// The visible set starts as the whole catalog (generation 0) and the
    /// intensity snapshot starts empty until the first refresh completes.
    #[must_use]
    pub fn spawn<F>(config: SchedulerConfig, catalog: Arc<AirportCatalog>, feed: Arc<F>) -> Self
    where
        F: TrafficFeed + 'static,
    {
        let (viewport_tx, viewport_rx) = mpsc::unbounded_channel();
        // Capacity 1: triggers arriving during a refresh coalesce into one more refresh
        let (refresh_tx, refresh_rx) = mpsc::channel(1);
        let (visible_tx, visible_rx) = watch::channel(Arc::new(VisibleSet::initial(&catalog)));
        let (intensity_tx, intensity_rx) = watch::channel(Arc::new(IntensitySnapshot::empty()));
        let (status_tx, status_rx) = watch::channel(RefreshStatus::default());
        let cancel_token = CancellationToken::new();

        info!(
            "Starting scheduler for {} airports (debounce {:?}, refresh every {:?})",
            catalog.len(),
            config.debounce,
            config.refresh_interval
        );

        let viewport_cancel = cancel_token.clone();
        let debounce = config.debounce;
        let viewport_task = tokio::spawn(async move {
            viewport_loop(catalog, viewport_rx, visible_tx, debounce, viewport_cancel).await;
        });

        let refresh_cancel = cancel_token.clone();
        let refresh_task = tokio::spawn(async move {
            refresh_loop(feed, refresh_rx, intensity_tx, status_tx, config, refresh_cancel).await;
        });

        Self {
            viewport_tx,
            refresh_tx,
            visible_rx,
            intensity_rx,
            status_rx,
            cancel_token,
            tasks: vec![viewport_task, refresh_task],
        }
    }

    /// Report new map bounds (move or zoom end). Bursts are debounced.
    pub fn viewport_changed(&self, bounds: ViewportBounds) {
        if self.viewport_tx.send(bounds).is_err() {
            debug!("Viewport event after dispose ignored");
        }
    }

    /// Ask for a traffic refresh now. Requests made while one is queued are merged.
    pub fn request_refresh(&self) {
        match self.refresh_tx.try_send(()) {
            Ok(()) => debug!("Manual refresh requested"),
            Err(mpsc::error::TrySendError::Full(())) => debug!("Refresh already queued"),
            Err(mpsc::error::TrySendError::Closed(())) => debug!("Refresh request after dispose ignored"),
        }
    }

    /// Latest visible set.
    #[must_use]
    pub fn visible(&self) -> Arc<VisibleSet> {
        Arc::clone(&self.visible_rx.borrow())
    }

    /// Latest intensity snapshot.
    #[must_use]
    pub fn intensity(&self) -> Arc<IntensitySnapshot> {
        Arc::clone(&self.intensity_rx.borrow())
    }

    #[must_use]
    pub fn refresh_status(&self) -> RefreshStatus {
        self.status_rx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe_visible(&self) -> watch::Receiver<Arc<VisibleSet>> {
        self.visible_rx.clone()
    }

    #[must_use]
    pub fn subscribe_intensity(&self) -> watch::Receiver<Arc<IntensitySnapshot>> {
        self.intensity_rx.clone()
    }

    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<RefreshStatus> {
        self.status_rx.clone()
    }

    /// Join the current snapshots into a renderable frame.
    #[must_use]
    pub fn frame(&self, thresholds: &IntensityThresholds) -> MapFrame {
        MapFrame::compose(&self.visible(), &self.intensity(), thresholds)
    }

    /// Stop both pipelines. Pending debounced work and in-flight fetches are dropped.
    ///
    /// This only signals the tasks. On a multi-threaded runtime a recompute
    /// that is already past its cancellation check may still publish once;
    /// use [`shutdown`](Self::shutdown) to wait until both tasks have exited.
    pub fn dispose(&self) {
        if !self.cancel_token.is_cancelled() {
            info!("Disposing scheduler");
        }
        self.cancel_token.cancel();
    }

    /// Dispose and wait for both pipeline tasks to finish.
    pub async fn shutdown(mut self) {
        self.dispose();
        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                if e.is_panic() {
                    warn!("Scheduler task panicked: {e}");
                }
            }
        }
        debug!("Scheduler tasks stopped");
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

impl Drop for RecomputeScheduler {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn viewport_loop(
    catalog: Arc<AirportCatalog>,
    mut events: mpsc::UnboundedReceiver<ViewportBounds>,
    visible_tx: watch::Sender<Arc<VisibleSet>>,
    quiescence: Duration,
    cancel_token: CancellationToken,
) {
    let mut debouncer = Debouncer::new(quiescence);
    let mut generation = 0u64;

    loop {
        let deadline = debouncer.deadline();

        tokio::select! {
            biased;

            () = cancel_token.cancelled() => {
                debouncer.cancel();
                debug!("Viewport pipeline cancelled");
                return;
            }
            event = events.recv() => {
                let Some(bounds) = event else {
                    return;
                };
                debouncer.push(bounds, Instant::now());
            }
            () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                let Some(settled) = debouncer.take_ready(Instant::now()) else {
                    continue;
                };
                generation += 1;
                let visible = VisibleSet::compute(&catalog, settled.value, generation);
                debug!(
                    "Viewport settled after {} events: {} airports visible (generation {})",
                    settled.burst,
                    visible.len(),
                    generation
                );
                if cancel_token.is_cancelled() {
                    return;
                }
                visible_tx.send_replace(Arc::new(visible));
            }
        }
    }
}

async fn refresh_loop<F: TrafficFeed>(
    feed: Arc<F>,
    mut triggers: mpsc::Receiver<()>,
    intensity_tx: watch::Sender<Arc<IntensitySnapshot>>,
    status_tx: watch::Sender<RefreshStatus>,
    config: SchedulerConfig,
    cancel_token: CancellationToken,
) {
    let mut interval = tokio::time::interval(config.refresh_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut generation = 0u64;

    loop {
        tokio::select! {
            biased;

            () = cancel_token.cancelled() => {
                debug!("Traffic pipeline cancelled");
                return;
            }
            _ = interval.tick() => {}
            trigger = triggers.recv() => {
                if trigger.is_none() {
                    return;
                }
            }
        }

        let window = QueryWindow::around(Utc::now(), config.traffic_half_window);
        status_tx.send_modify(|status| status.in_flight = true);
        debug!("Fetching traffic for window {}..{}", window.begin, window.end);

        let result = tokio::select! {
            biased;

            () = cancel_token.cancelled() => {
                info!("Traffic fetch abandoned on dispose");
                return;
            }
            result = feed.flights(window) => result,
        };

        match result {
            Ok(records) => {
                generation += 1;
                let fetched_at = Utc::now();
                let snapshot = IntensitySnapshot::from_records(&records, window, fetched_at, generation);
                info!(
                    "Traffic refreshed: {} records, {} airports scored (generation {})",
                    snapshot.record_count,
                    snapshot.scores.len(),
                    generation
                );
                intensity_tx.send_replace(Arc::new(snapshot));
                status_tx.send_modify(|status| {
                    status.in_flight = false;
                    status.last_success = Some(fetched_at);
                    status.last_error = None;
                    status.consecutive_failures = 0;
                });
            }
            Err(e) => {
                warn!("Traffic refresh failed, keeping previous snapshot: {e}");
                status_tx.send_modify(|status| {
                    status.in_flight = false;
                    status.last_error = Some(e.to_string());
                    status.consecutive_failures = status.consecutive_failures.saturating_add(1);
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::catalog::Airport;
    use crate::feed::{FeedError, FlightRecord};
    use crate::viewport::LatLng;

    struct ScriptedFeed {
        responses: Mutex<VecDeque<Result<Vec<FlightRecord>, FeedError>>>,
        windows: Mutex<Vec<QueryWindow>>,
    }

    impl ScriptedFeed {
        fn new(responses: Vec<Result<Vec<FlightRecord>, FeedError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                windows: Mutex::new(Vec::new()),
            }
        }
    }

    impl TrafficFeed for ScriptedFeed {
        async fn flights(&self, window: QueryWindow) -> Result<Vec<FlightRecord>, FeedError> {
            self.windows.lock().unwrap().push(window);
            self.responses.lock().unwrap().pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    /// Never answers.
    struct StalledFeed;

    impl TrafficFeed for StalledFeed {
        async fn flights(&self, _window: QueryWindow) -> Result<Vec<FlightRecord>, FeedError> {
            std::future::pending().await
        }
    }

    fn catalog() -> Arc<AirportCatalog> {
        Arc::new(AirportCatalog::new(vec![
            Airport::new("KATL", "Atlanta", 33.6367, -84.4281),
            Airport::new("KJFK", "New York JFK", 40.6398, -73.7789),
            Airport::new("EGLL", "London Heathrow", 51.4706, -0.461_941),
        ]))
    }

    fn bounds(south: f64, west: f64, north: f64, east: f64) -> ViewportBounds {
        ViewportBounds::new(LatLng::new(south, west), LatLng::new(north, east)).unwrap()
    }

    fn katl_record() -> FlightRecord {
        FlightRecord::new("a0b1c2")
            .departing("KATL")
            .arriving("KJFK")
            .with_candidates(3, 2)
    }

    #[tokio::test(start_paused = true)]
    async fn test_viewport_burst_collapses_to_final_bounds() {
        let scheduler = RecomputeScheduler::spawn(
            SchedulerConfig::default(),
            catalog(),
            Arc::new(ScriptedFeed::new(Vec::new())),
        );
        let mut visible = scheduler.subscribe_visible();
        assert_eq!(scheduler.visible().generation, 0);
        assert_eq!(scheduler.visible().len(), 3);

        let burst = [
            bounds(-10.0, -10.0, 10.0, 10.0),
            bounds(20.0, -100.0, 45.0, -60.0),
            bounds(30.0, -90.0, 35.0, -80.0),
        ];
        for b in burst {
            scheduler.viewport_changed(b);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(scheduler.visible().generation, 0);

        visible.changed().await.unwrap();
        let settled = scheduler.visible();
        assert_eq!(settled.generation, 1);
        assert_eq!(settled.bounds, burst[2]);
        assert!(settled.contains("KATL"));
        assert_eq!(settled.len(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(scheduler.visible().generation, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_prevents_late_publication() {
        let scheduler = RecomputeScheduler::spawn(
            SchedulerConfig::default(),
            catalog(),
            Arc::new(ScriptedFeed::new(Vec::new())),
        );

        scheduler.viewport_changed(bounds(30.0, -90.0, 35.0, -80.0));
        tokio::time::sleep(Duration::from_millis(100)).await;
        scheduler.dispose();
        assert!(scheduler.is_disposed());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(scheduler.visible().generation, 0);

        scheduler.viewport_changed(bounds(50.0, -1.0, 52.0, 1.0));
        scheduler.request_refresh();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(scheduler.visible().generation, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_waits_for_tasks() {
        let scheduler = RecomputeScheduler::spawn(
            SchedulerConfig {
                debounce: Duration::from_millis(1),
                ..Default::default()
            },
            catalog(),
            Arc::new(StalledFeed),
        );
        let visible = scheduler.subscribe_visible();
        let status = scheduler.subscribe_status();

        for _ in 0..50 {
            scheduler.viewport_changed(bounds(30.0, -90.0, 35.0, -80.0));
        }
        scheduler.shutdown().await;

        // Both tasks have exited and dropped their senders
        assert!(visible.has_changed().is_err());
        assert!(status.has_changed().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let feed = Arc::new(ScriptedFeed::new(vec![
            Ok(vec![katl_record()]),
            Err(FeedError::Unavailable("connection refused".to_string())),
        ]));
        let scheduler = RecomputeScheduler::spawn(SchedulerConfig::default(), catalog(), Arc::clone(&feed));

        let mut intensity = scheduler.subscribe_intensity();
        intensity.changed().await.unwrap();
        let first = scheduler.intensity();
        assert_eq!(first.generation, 1);
        assert_eq!(first.score("KATL"), 5);

        let mut status = scheduler.subscribe_status();
        scheduler.request_refresh();
        status.wait_for(|s| s.consecutive_failures == 1).await.unwrap();

        let after = scheduler.intensity();
        assert_eq!(after.generation, 1);
        assert_eq!(after.score("KATL"), 5);

        let report = scheduler.refresh_status();
        assert!(report.is_stale());
        assert!(!report.in_flight);
        assert!(report.last_error.unwrap().contains("connection refused"));
        assert!(report.last_success.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_window_is_one_hour_and_interval_repeats() {
        let feed = Arc::new(ScriptedFeed::new(vec![Ok(vec![katl_record()])]));
        let config = SchedulerConfig {
            refresh_interval: Duration::from_secs(60),
            ..Default::default()
        };
        let scheduler = RecomputeScheduler::spawn(config, catalog(), Arc::clone(&feed));

        let mut intensity = scheduler.subscribe_intensity();
        intensity.changed().await.unwrap();
        {
            let windows = feed.windows.lock().unwrap();
            assert_eq!(windows.len(), 1);
            assert_eq!(windows[0].duration_secs(), 3600);
        }

        intensity.changed().await.unwrap();
        assert_eq!(scheduler.intensity().generation, 2);
        // script exhausted: an empty result is valid and clears the scores
        assert_eq!(scheduler.intensity().score("KATL"), 0);
        assert_eq!(feed.windows.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_fetch_does_not_block_viewport() {
        let scheduler = RecomputeScheduler::spawn(SchedulerConfig::default(), catalog(), Arc::new(StalledFeed));
        let mut visible = scheduler.subscribe_visible();

        scheduler.viewport_changed(bounds(50.0, -1.0, 52.0, 1.0));
        visible.changed().await.unwrap();
        assert!(scheduler.visible().contains("EGLL"));
        assert!(scheduler.refresh_status().in_flight);
        assert_eq!(scheduler.intensity().generation, 0);

        scheduler.dispose();
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_joins_current_snapshots() {
        let feed = Arc::new(ScriptedFeed::new(vec![Ok(vec![katl_record()])]));
        let scheduler = RecomputeScheduler::spawn(SchedulerConfig::default(), catalog(), feed);
        let mut intensity = scheduler.subscribe_intensity();
        intensity.changed().await.unwrap();

        let frame = scheduler.frame(&IntensityThresholds::default());
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.circles().count(), 2);
    }
}
