//! Instance health state machine.
//!
//! # States
//! - Active: instance is routed to by the load balancer
//! - Removed: instance's upstream entry is disabled
//!
//! # State Transitions
//! ```text
//! Active → Removed: consecutive unhealthy samples >= consecutive
//!                   (committed once the upstream edit is confirmed)
//! Removed → Active: a single healthy sample
//!                   (committed once the upstream edit is confirmed)
//! ```
//!
//! # Design Decisions
//! - Hysteresis on removal only; restoring early is cheap to undo
//! - Value equal to the threshold counts as unhealthy
//! - Instances missing from a batch keep their last state

use std::collections::{BTreeMap, HashMap};

/// Runtime state tracked for one instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceRuntimeState {
    /// Back-to-back unhealthy samples observed.
    pub consecutive_bad_samples: u32,
    /// Whether the instance's upstream entry is currently disabled.
    pub removed: bool,
    /// Cycle in which the instance last appeared in a batch.
    pub last_seen_cycle: u64,
}

/// A remediation decision produced by [`InstanceTracker::advance`].
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Take the instance out of the upstream set.
    RemoveInstance {
        instance: String,
        value: f64,
        bad_samples: u32,
    },
    /// Put a removed instance back.
    RestoreInstance { instance: String, value: f64 },
}

impl Decision {
    pub fn instance(&self) -> &str {
        match self {
            Decision::RemoveInstance { instance, .. } => instance,
            Decision::RestoreInstance { instance, .. } => instance,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Decision::RemoveInstance { .. } => "remove",
            Decision::RestoreInstance { .. } => "restore",
        }
    }
}

/// Owns the per-instance runtime state and makes every removal/restoration
/// decision.
#[derive(Debug, Default)]
pub struct InstanceTracker {
    instances: HashMap<String, InstanceRuntimeState>,
    cycle: u64,
}

impl InstanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one batch of samples into the state and return the decisions it
    /// triggers, in instance-key order.
    ///
    /// `removed` is not changed here; the caller confirms it through
    /// [`mark_removed`](Self::mark_removed) / [`mark_restored`](Self::mark_restored)
    /// once the upstream edit went through. Until then a pending removal is
    /// re-emitted on every unhealthy sample and a pending restoration on every
    /// healthy one.
    pub fn advance(
        &mut self,
        samples: &BTreeMap<String, f64>,
        threshold: f64,
        consecutive: u32,
    ) -> Vec<Decision> {
        self.cycle += 1;
        let mut decisions = Vec::new();

        for (instance, &value) in samples {
            let state = self.instances.entry(instance.clone()).or_default();
            state.last_seen_cycle = self.cycle;

            if value >= threshold {
                state.consecutive_bad_samples = state.consecutive_bad_samples.saturating_add(1);
                tracing::debug!(
                    instance = %instance,
                    value,
                    count = state.consecutive_bad_samples,
                    "Unhealthy sample"
                );

                if !state.removed && state.consecutive_bad_samples >= consecutive {
                    decisions.push(Decision::RemoveInstance {
                        instance: instance.clone(),
                        value,
                        bad_samples: state.consecutive_bad_samples,
                    });
                }
            } else {
                if state.consecutive_bad_samples > 0 {
                    tracing::debug!(
                        instance = %instance,
                        value,
                        previous = state.consecutive_bad_samples,
                        "Healthy sample, counter reset"
                    );
                    state.consecutive_bad_samples = 0;
                }

                if state.removed {
                    decisions.push(Decision::RestoreInstance {
                        instance: instance.clone(),
                        value,
                    });
                }
            }
        }

        decisions
    }

    /// Record that the instance's upstream entry is now disabled.
    pub fn mark_removed(&mut self, instance: &str) {
        let cycle = self.cycle;
        let state = self
            .instances
            .entry(instance.to_string())
            .or_insert_with(|| InstanceRuntimeState {
                last_seen_cycle: cycle,
                ..Default::default()
            });
        state.removed = true;
    }

    /// Record that the instance's upstream entry is active again.
    pub fn mark_restored(&mut self, instance: &str) {
        if let Some(state) = self.instances.get_mut(instance) {
            state.removed = false;
        }
    }

    /// Drop state for instances not seen during the last `max_idle_cycles`
    /// cycles. Removed instances are kept so they can still be restored.
    /// Returns the purged keys, sorted.
    pub fn evict_stale(&mut self, max_idle_cycles: u64) -> Vec<String> {
        if max_idle_cycles == 0 {
            return Vec::new();
        }

        let cycle = self.cycle;
        let mut evicted: Vec<String> = self
            .instances
            .iter()
            .filter(|(_, s)| !s.removed && cycle.saturating_sub(s.last_seen_cycle) >= max_idle_cycles)
            .map(|(k, _)| k.clone())
            .collect();
        evicted.sort();

        for key in &evicted {
            self.instances.remove(key);
        }
        evicted
    }

    /// State for one instance, if it has been seen.
    pub fn get(&self, instance: &str) -> Option<&InstanceRuntimeState> {
        self.instances.get(instance)
    }

    /// Number of cycles folded so far.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Number of tracked instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Keys of instances currently removed, sorted.
    pub fn removed_instances(&self) -> Vec<String> {
        let mut removed: Vec<String> = self
            .instances
            .iter()
            .filter(|(_, s)| s.removed)
            .map(|(k, _)| k.clone())
            .collect();
        removed.sort();
        removed
    }
}
