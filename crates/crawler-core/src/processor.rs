//! Drains the pending queue through a [`MatchCollector`].

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::collector::{CollectOutcome, MatchCollector};
use crate::config::{FailedPolicy, ProcessConfig};
use crate::error::Result;
use crate::player::{DiscoveredPlayer, StatusUpdate};
use crate::store::PlayerRecordStore;
use crate::types::Region;

/// Seconds per player assumed before the first player of a run finishes.
const INITIAL_SECONDS_PER_PLAYER: f64 = 3.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessReport {
    pub players_processed: usize,
    pub matches_collected: u64,
    #[serde(default)]
    pub players_failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentPlayer {
    pub identifier: String,
    pub region: Region,
}

/// Live view of the current (or last) `process_pending` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessProgress {
    pub running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub total_players: usize,
    pub processed_players: usize,
    pub successful_players: usize,
    pub failed_players: usize,
    pub total_matches_collected: u64,
    pub current_player: Option<CurrentPlayer>,
    pub last_error: Option<String>,
    pub estimated_seconds_remaining: Option<u64>,
    pub avg_seconds_per_player: f64,
}

impl Default for ProcessProgress {
    fn default() -> Self {
        Self {
            running: false,
            started_at: None,
            total_players: 0,
            processed_players: 0,
            successful_players: 0,
            failed_players: 0,
            total_matches_collected: 0,
            current_player: None,
            last_error: None,
            estimated_seconds_remaining: None,
            avg_seconds_per_player: INITIAL_SECONDS_PER_PLAYER,
        }
    }
}

impl ProcessProgress {
    fn begin(&mut self, total: usize, now: DateTime<Utc>) {
        let avg = self.avg_seconds_per_player;
        *self = ProcessProgress {
            running: true,
            started_at: Some(now),
            total_players: total,
            avg_seconds_per_player: avg,
            estimated_seconds_remaining: Some(estimate(total, avg)),
            ..Default::default()
        };
    }

    fn record(&mut self, outcome: &Result<CollectOutcome>, now: DateTime<Utc>) {
        self.processed_players += 1;
        match outcome {
            Ok(CollectOutcome::Collected(n)) => {
                self.successful_players += 1;
                self.total_matches_collected += u64::from(*n);
            }
            Ok(CollectOutcome::NotFound) => self.successful_players += 1,
            Ok(CollectOutcome::Failed(reason)) => {
                self.failed_players += 1;
                self.last_error = Some(reason.clone());
            }
            Err(e) => {
                self.failed_players += 1;
                self.last_error = Some(e.to_string());
            }
        }

        if let Some(started) = self.started_at {
            let elapsed = (now - started).num_milliseconds().max(0) as f64 / 1000.0;
            self.avg_seconds_per_player = elapsed / self.processed_players as f64;
        }
        let remaining = self.total_players.saturating_sub(self.processed_players);
        self.estimated_seconds_remaining = Some(estimate(remaining, self.avg_seconds_per_player));
    }

    fn finish(&mut self) {
        self.running = false;
        self.current_player = None;
        self.estimated_seconds_remaining = None;
    }
}

fn estimate(players: usize, seconds_per_player: f64) -> u64 {
    (players as f64 * seconds_per_player).ceil() as u64
}

pub struct Processor {
    store: Arc<dyn PlayerRecordStore>,
    collector: Arc<dyn MatchCollector>,
    collection_size: u32,
    failed_policy: FailedPolicy,
    player_delay: Duration,
    /// Held for a whole run so two callers never crawl the same queue.
    run_lock: tokio::sync::Mutex<()>,
    progress: Mutex<ProcessProgress>,
}

impl Processor {
    pub fn new(
        store: Arc<dyn PlayerRecordStore>,
        collector: Arc<dyn MatchCollector>,
        config: &ProcessConfig,
    ) -> Self {
        Self {
            store,
            collector,
            collection_size: config.collection_size,
            failed_policy: config.failed_policy.clone(),
            player_delay: config.player_delay(),
            run_lock: tokio::sync::Mutex::new(()),
            progress: Mutex::new(ProcessProgress::default()),
        }
    }

    pub fn collector(&self) -> &Arc<dyn MatchCollector> {
        &self.collector
    }

    /// True while a `process_pending` call holds the queue.
    pub fn is_busy(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    pub fn progress(&self) -> ProcessProgress {
        self.progress_mut().clone()
    }

    fn progress_mut(&self) -> MutexGuard<'_, ProcessProgress> {
        self.progress
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Crawl every pending player, oldest first, one at a time.
    ///
    /// Concurrent calls queue behind each other. Under a retry policy,
    /// failed rows whose backoff has elapsed are re-queued before the
    /// pending list is read. A row that fails in this call is never retried
    /// within it.
    pub async fn process_pending(&self) -> Result<ProcessReport> {
        let _run = self.run_lock.lock().await;
        self.collector.check_ready().await?;

        if let FailedPolicy::Retry { max_attempts, .. } = self.failed_policy {
            let requeued = self.store.requeue_due(Utc::now(), max_attempts)?;
            if requeued > 0 {
                info!(requeued, "re-queued failed players");
            }
        }

        let pending = self.store.list_pending()?;
        self.progress_mut().begin(pending.len(), Utc::now());

        let mut report = ProcessReport::default();
        for (i, player) in pending.iter().enumerate() {
            if i > 0 && !self.player_delay.is_zero() {
                tokio::time::sleep(self.player_delay).await;
            }
            self.progress_mut().current_player = Some(CurrentPlayer {
                identifier: player.identifier.clone(),
                region: player.region,
            });

            report.players_processed += 1;
            let outcome = self.process_one(player).await;
            match &outcome {
                Ok(CollectOutcome::Collected(n)) => report.matches_collected += u64::from(*n),
                Ok(CollectOutcome::NotFound) => {}
                Ok(CollectOutcome::Failed(_)) => report.players_failed += 1,
                Err(e) => {
                    warn!(identifier = %player.identifier, error = %e, "could not update player");
                    report.players_failed += 1;
                }
            }
            self.progress_mut().record(&outcome, Utc::now());
        }
        self.progress_mut().finish();

        info!(
            processed = report.players_processed,
            matches = report.matches_collected,
            failed = report.players_failed,
            "process finished"
        );
        Ok(report)
    }

    async fn process_one(&self, player: &DiscoveredPlayer) -> Result<CollectOutcome> {
        self.store
            .update_status(player.id, &StatusUpdate::crawling())?;

        let outcome = self
            .collector
            .collect(&player.identifier, player.region, self.collection_size)
            .await;

        let now = Utc::now();
        let update = match &outcome {
            CollectOutcome::Collected(n) => StatusUpdate::completed(*n, now),
            CollectOutcome::NotFound => StatusUpdate::completed(0, now),
            CollectOutcome::Failed(reason) => {
                warn!(identifier = %player.identifier, reason = %reason, "collection failed");
                let next = self
                    .failed_policy
                    .backoff_for(player.retry_count + 1)
                    .and_then(|d| chrono::Duration::from_std(d).ok())
                    .map(|d| now + d);
                StatusUpdate::failed(reason.clone(), now, next)
            }
        };
        self.store.update_status(player.id, &update)?;
        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
