//! The detection-and-remediation loop.
//!
//! # Responsibilities
//! - Poll the health feed on a fixed interval
//! - Turn tracker decisions into upstream edits and reloads
//! - Record detection and remediation outcomes in the event log
//! - Flush the event log exactly once on the way out

use std::collections::BTreeSet;

use crate::config::{DetectionConfig, SentinelConfig};
use crate::events::{EventKind, EventLog};
use crate::feed::{to_health_map, FeedError, HealthFeedClient};
use crate::health::{Decision, InstanceTracker};
use crate::lifecycle::{Shutdown, ShutdownReason};
use crate::observability::metrics;
use crate::reload::ReloadTrigger;
use crate::upstream::UpstreamEditor;

/// What one poll cycle observed and did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    /// Whether the backend produced a usable answer.
    pub feed_ok: bool,
    /// Instances present in the batch.
    pub samples: usize,
    pub decisions: Vec<Decision>,
    /// Instances whose entry was disabled this cycle.
    pub removed: Vec<String>,
    /// Instances whose entry was restored this cycle.
    pub restored: Vec<String>,
    /// Instances whose runtime state was purged as stale.
    pub evicted: Vec<String>,
}

/// Owns every component of the loop and the state they share.
pub struct Controller {
    feed: HealthFeedClient,
    tracker: InstanceTracker,
    editor: UpstreamEditor,
    reloader: ReloadTrigger,
    events: EventLog,
    detection: DetectionConfig,
    commit: bool,
    /// Dry-run only: entries the file would have disabled by now.
    simulated_disabled: BTreeSet<String>,
}

impl Controller {
    /// Build the loop from a validated configuration.
    pub fn new(config: &SentinelConfig) -> Result<Self, FeedError> {
        Ok(Self {
            feed: HealthFeedClient::new(&config.feed)?,
            tracker: InstanceTracker::new(),
            editor: UpstreamEditor::from_config(&config.upstream),
            reloader: ReloadTrigger::from_config(&config.reload),
            events: EventLog::with_output(config.events.path.clone()),
            detection: config.detection.clone(),
            commit: config.commit(),
            simulated_disabled: BTreeSet::new(),
        })
    }

    pub fn tracker(&self) -> &InstanceTracker {
        &self.tracker
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Run cycles until shutdown is requested or `max_cycles` have run, then
    /// flush the event log. A forced shutdown abandons the running cycle.
    pub async fn run(&mut self, shutdown: &Shutdown, max_cycles: Option<u64>) -> ShutdownReason {
        let mut stop = shutdown.subscribe();
        let mut forced = shutdown.subscribe_forced();
        let interval = self.detection.poll_interval();
        let mut cycles = 0u64;

        tracing::info!(
            poll_interval = ?interval,
            consecutive = self.detection.consecutive,
            threshold = self.detection.threshold,
            dry_run = !self.commit,
            metric = %self.feed.metric(),
            upstream = %self.editor.path().display(),
            "Sentinel started"
        );

        let reason = loop {
            if let Some(reason) = shutdown.reason() {
                break reason;
            }

            let finished = tokio::select! {
                _ = self.run_cycle() => true,
                _ = forced.wait_for(|forced| *forced) => false,
            };
            if !finished {
                tracing::warn!("Forced shutdown, abandoning the current cycle");
                break shutdown.reason().unwrap_or(ShutdownReason::Interrupt);
            }
            cycles += 1;
            if max_cycles.is_some_and(|max| cycles >= max) {
                break ShutdownReason::Completed;
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = stop.wait_for(|stopped| *stopped) => {}
            }
        };

        self.shutdown(reason);
        reason
    }

    /// One full query → decide → remediate → record pass.
    pub async fn run_cycle(&mut self) -> CycleReport {
        metrics::record_poll();
        let mut report = CycleReport::default();

        let samples = match self.feed.fetch().await {
            Ok(samples) => to_health_map(samples),
            Err(e) => {
                tracing::warn!(error = %e, "Health feed unavailable, skipping cycle");
                metrics::record_feed_failure();
                return report;
            }
        };
        report.feed_ok = true;
        report.samples = samples.len();

        tracing::debug!(
            samples = ?samples,
            removed = ?self.tracker.removed_instances(),
            "Poll results"
        );

        let decisions = self.tracker.advance(
            &samples,
            self.detection.threshold,
            self.detection.consecutive,
        );
        for decision in &decisions {
            self.apply(decision, &mut report).await;
        }
        report.decisions = decisions;

        report.evicted = self.tracker.evict_stale(self.detection.stale_after_cycles);
        if !report.evicted.is_empty() {
            tracing::info!(instances = ?report.evicted, "Dropped state of instances no longer reported");
        }

        metrics::record_instances(self.tracker.len(), self.tracker.removed_instances().len());
        report
    }

    async fn apply(&mut self, decision: &Decision, report: &mut CycleReport) {
        metrics::record_decision(decision.kind());

        match decision {
            Decision::RemoveInstance { instance, value, bad_samples } => {
                self.events.record(
                    EventKind::DegradationConfirmed,
                    instance,
                    &format!("value={} count={}", value, bad_samples),
                );

                if !self.disable_entry(instance) {
                    tracing::warn!(instance = %instance, "No live upstream entry to disable");
                    return;
                }
                let reload = self.reload().await;
                self.tracker.mark_removed(instance);
                self.events.record(EventKind::RemovedFromUpstream, instance, reload);
                report.removed.push(instance.clone());
            }
            Decision::RestoreInstance { instance, value } => {
                self.events.record(EventKind::HealthyAgain, instance, &format!("value={}", value));

                if !self.enable_entry(instance) {
                    tracing::warn!(instance = %instance, "No disabled upstream entry to restore");
                    return;
                }
                let reload = self.reload().await;
                self.tracker.mark_restored(instance);
                self.events.record(EventKind::RestoredToUpstream, instance, reload);
                report.restored.push(instance.clone());
            }
        }
    }

    fn disable_entry(&mut self, instance: &str) -> bool {
        let changed = self.editor.disable(instance, self.commit);
        if changed && !self.commit {
            self.simulated_disabled.insert(instance.to_string());
        }
        changed
    }

    /// In dry-run the file never holds the marker, so an entry this run
    /// pretended to disable is restored against that simulated state.
    fn enable_entry(&mut self, instance: &str) -> bool {
        if !self.commit && self.simulated_disabled.remove(instance) {
            tracing::info!(instance = %instance, "Dry-run: upstream entry would be restored");
            metrics::record_upstream_edit("enable", "changed");
            return true;
        }
        self.editor.enable(instance, self.commit)
    }

    async fn reload(&self) -> &'static str {
        match (self.commit, self.reloader.reload(self.commit).await) {
            (false, _) => "reload=simulated",
            (true, true) => "reload=ok",
            (true, false) => "reload=failed",
        }
    }

    /// Single exit path for normal completion and termination requests.
    pub fn shutdown(&mut self, reason: ShutdownReason) {
        tracing::info!(reason = %reason, events = self.events.len(), "Sentinel stopping");

        match self.events.persist() {
            Ok(0) => tracing::info!("No events recorded, event log not written"),
            Ok(n) => tracing::info!(
                path = %self.events.output().map(|p| p.display().to_string()).unwrap_or_default(),
                events = n,
                "Event log saved"
            ),
            Err(e) => tracing::error!(error = %e, "Failed to save event log"),
        }
    }
}
