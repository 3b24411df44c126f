//! Gated queues of deferred apply callbacks.
//!
//! Templates may reference entities that are loaded later in the same pass.
//! Their application is queued behind a gate and runs when the gate opens.
//! Gates only move from closed to open; callbacks scheduled on an open gate
//! run immediately.

use std::collections::VecDeque;

use tracing::{debug, error, warn};

use crate::error::ApplyError;

/// Load barriers, in opening order.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::AsRefStr,
)]
pub enum Gate {
    /// Every item, status effect and imbue preset of the pass is registered.
    ItemsReady,
    /// Every recipe of the pass is registered.
    RecipesReady,
}

type Callback<C> = Box<dyn FnOnce(&mut C) -> Result<(), ApplyError>>;

struct Pending<C> {
    label: String,
    callback: Callback<C>,
}

struct GateQueue<C> {
    open: bool,
    pending: VecDeque<Pending<C>>,
}

impl<C> Default for GateQueue<C> {
    fn default() -> Self {
        Self {
            open: false,
            pending: VecDeque::new(),
        }
    }
}

/// Outcome of [`Scheduler::schedule`].
#[derive(Debug, PartialEq)]
pub enum Scheduled {
    /// The gate was closed; the callback is queued.
    Deferred,
    /// The gate was open; the callback ran with this result.
    Ran(Result<(), ApplyError>),
}

/// Result of draining one gate.
#[derive(Debug, Default, PartialEq)]
pub struct GateReport {
    pub ran: usize,
    /// Labels and errors of failed callbacks, in run order.
    pub failures: Vec<(String, ApplyError)>,
}

impl GateReport {
    pub fn succeeded(&self) -> usize {
        self.ran - self.failures.len()
    }
}

/// FIFO callback queues, one per [`Gate`], over a context type `C`.
pub struct Scheduler<C> {
    items_ready: GateQueue<C>,
    recipes_ready: GateQueue<C>,
}

impl<C> Default for Scheduler<C> {
    fn default() -> Self {
        Self {
            items_ready: GateQueue::default(),
            recipes_ready: GateQueue::default(),
        }
    }
}

impl<C> Scheduler<C> {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&mut self, gate: Gate) -> &mut GateQueue<C> {
        match gate {
            Gate::ItemsReady => &mut self.items_ready,
            Gate::RecipesReady => &mut self.recipes_ready,
        }
    }

    pub fn is_open(&self, gate: Gate) -> bool {
        match gate {
            Gate::ItemsReady => self.items_ready.open,
            Gate::RecipesReady => self.recipes_ready.open,
        }
    }

    /// Number of callbacks waiting behind `gate`.
    pub fn pending(&self, gate: Gate) -> usize {
        match gate {
            Gate::ItemsReady => self.items_ready.pending.len(),
            Gate::RecipesReady => self.recipes_ready.pending.len(),
        }
    }

    /// Queues `callback` behind `gate`, or runs it now if the gate is open.
    pub fn schedule<F>(
        &mut self,
        gate: Gate,
        label: impl Into<String>,
        cx: &mut C,
        callback: F,
    ) -> Scheduled
    where
        F: FnOnce(&mut C) -> Result<(), ApplyError> + 'static,
    {
        let label = label.into();
        let queue = self.queue(gate);
        if queue.open {
            let result = callback(cx);
            if let Err(e) = &result {
                error!(target: "content::scheduler", gate = %gate, label = %label, error = %e, "apply failed");
            }
            return Scheduled::Ran(result);
        }

        debug!(target: "content::scheduler", gate = %gate, label = %label, "deferred");
        queue.pending.push_back(Pending {
            label,
            callback: Box::new(callback),
        });
        Scheduled::Deferred
    }

    /// Opens `gate` and drains its queue in registration order.
    ///
    /// Each callback runs exactly once. A failing callback is logged and does
    /// not prevent the rest from running. Opening an open gate is a no-op.
    pub fn open_gate(&mut self, gate: Gate, cx: &mut C) -> GateReport {
        let queue = self.queue(gate);
        let mut report = GateReport::default();
        if queue.open {
            return report;
        }
        queue.open = true;

        let pending = std::mem::take(&mut queue.pending);
        debug!(
            target: "content::scheduler",
            gate = %gate,
            pending = pending.len(),
            "opening gate"
        );
        for Pending { label, callback } in pending {
            report.ran += 1;
            if let Err(e) = callback(cx) {
                error!(
                    target: "content::scheduler",
                    gate = %gate,
                    label = %label,
                    error = %e,
                    "deferred apply failed"
                );
                report.failures.push((label, e));
            }
        }
        report
    }

    /// Closes every gate again for a new loading pass.
    ///
    /// Callbacks still queued belong to the previous pass and are dropped
    /// without running. Returns how many were dropped.
    pub fn reset(&mut self) -> usize {
        let mut dropped = 0;
        for gate in [Gate::ItemsReady, Gate::RecipesReady] {
            let queue = self.queue(gate);
            let stale = std::mem::take(&mut queue.pending);
            queue.open = false;
            if !stale.is_empty() {
                warn!(
                    target: "content::scheduler",
                    gate = %gate,
                    dropped = stale.len(),
                    "dropping callbacks from previous pass"
                );
            }
            dropped += stale.len();
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deferred_callbacks_run_once_in_order() {
        let mut scheduler: Scheduler<Vec<u32>> = Scheduler::new();
        let mut log = Vec::new();

        for n in 0..3 {
            let outcome = scheduler.schedule(Gate::ItemsReady, format!("cb{n}"), &mut log, move |log| {
                log.push(n);
                Ok(())
            });
            assert_eq!(outcome, Scheduled::Deferred);
        }
        assert!(log.is_empty());

        let report = scheduler.open_gate(Gate::ItemsReady, &mut log);
        assert_eq!(report.ran, 3);
        assert_eq!(log, vec![0, 1, 2]);

        let again = scheduler.open_gate(Gate::ItemsReady, &mut log);
        assert_eq!(again.ran, 0);
        assert_eq!(log, vec![0, 1, 2]);
    }

    #[test]
    fn open_gate_runs_immediately() {
        let mut scheduler: Scheduler<Vec<u32>> = Scheduler::new();
        let mut log = Vec::new();
        scheduler.open_gate(Gate::RecipesReady, &mut log);

        let outcome = scheduler.schedule(Gate::RecipesReady, "late", &mut log, |log| {
            log.push(9);
            Ok(())
        });

        assert_eq!(outcome, Scheduled::Ran(Ok(())));
        assert_eq!(log, vec![9]);
        assert_eq!(scheduler.pending(Gate::RecipesReady), 0);
    }

    #[test]
    fn failures_are_isolated() {
        let mut scheduler: Scheduler<Vec<u32>> = Scheduler::new();
        let mut log = Vec::new();
        scheduler.schedule(Gate::ItemsReady, "bad", &mut log, |_| {
            Err(ApplyError::MissingHandle(patchkit_core::EntityHandle(1)))
        });
        scheduler.schedule(Gate::ItemsReady, "good", &mut log, |log| {
            log.push(1);
            Ok(())
        });

        let report = scheduler.open_gate(Gate::ItemsReady, &mut log);

        assert_eq!(report.ran, 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failures[0].0, "bad");
        assert_eq!(log, vec![1]);
    }

    #[test]
    fn gates_are_independent() {
        let mut scheduler: Scheduler<Vec<u32>> = Scheduler::new();
        let mut log = Vec::new();
        scheduler.schedule(Gate::RecipesReady, "recipe", &mut log, |log| {
            log.push(2);
            Ok(())
        });

        scheduler.open_gate(Gate::ItemsReady, &mut log);

        assert!(log.is_empty());
        assert!(!scheduler.is_open(Gate::RecipesReady));
    }

    #[test]
    fn reset_drops_stale_callbacks() {
        let mut scheduler: Scheduler<Vec<u32>> = Scheduler::new();
        let mut log = Vec::new();
        scheduler.open_gate(Gate::ItemsReady, &mut log);
        scheduler.schedule(Gate::RecipesReady, "stale", &mut log, |log| {
            log.push(7);
            Ok(())
        });

        assert_eq!(scheduler.reset(), 1);
        assert!(!scheduler.is_open(Gate::ItemsReady));
        assert_eq!(scheduler.pending(Gate::RecipesReady), 0);

        let report = scheduler.open_gate(Gate::RecipesReady, &mut log);
        assert_eq!(report.ran, 0);
        assert!(log.is_empty());
    }
}
