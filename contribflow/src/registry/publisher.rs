//! Recomputation of the aggregate and change-detecting publication.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use super::EntryList;
use crate::config::RegistryConfig;
use crate::context::ContextSnapshot;
use crate::contributions::{merge_contributions, Contributions};
use crate::evaluation::EntryEvaluator;
use crate::events::{EventSink, AGGREGATE_PUBLISHED};
use crate::observability::{RecomputeAttributes, SpanTimer};
use crate::reactive::{Subject, Subscription};

/// Identifies which inputs a recomputation was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Stamp {
    /// Entry store revision.
    pub entries_revision: u64,
    /// Context subject sequence number.
    pub context_sequence: u64,
}

impl Stamp {
    /// Creates a stamp.
    #[must_use]
    pub const fn new(entries_revision: u64, context_sequence: u64) -> Self {
        Self {
            entries_revision,
            context_sequence,
        }
    }

    /// True if either input is older than in `other`.
    #[must_use]
    pub const fn is_older_than(&self, other: &Self) -> bool {
        self.entries_revision < other.entries_revision
            || self.context_sequence < other.context_sequence
    }
}

/// What happened to one recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecomputeOutcome {
    /// A structurally different aggregate was published.
    Published,
    /// The aggregate equalled the last published one.
    Suppressed,
    /// A newer recomputation had already been applied.
    Stale,
}

impl std::fmt::Display for RecomputeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Published => "published",
            Self::Suppressed => "suppressed",
            Self::Stale => "stale",
        })
    }
}

/// Counters over the publisher's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PublisherStats {
    /// Recomputations run.
    pub recomputations: u64,
    /// Aggregates published.
    pub published: u64,
    /// Recomputations whose aggregate was unchanged.
    pub suppressed: u64,
    /// Recomputations dropped because newer inputs were already applied.
    pub stale: u64,
}

struct PublishState {
    stamp: Option<Stamp>,
    last: Arc<Contributions>,
}

/// Recomputes the aggregate and publishes it only when it changed.
///
/// `aggregate()` and `watch()` are updated under the state lock and always
/// hold the newest applied aggregate. Subscribers are notified afterwards,
/// outside any lock.
pub struct Publisher {
    evaluator: EntryEvaluator,
    sink: Arc<dyn EventSink>,
    config: Arc<RegistryConfig>,
    state: Mutex<PublishState>,
    output: Subject<Arc<Contributions>>,
    watch_tx: watch::Sender<Arc<Contributions>>,
    recomputations: AtomicU64,
    published: AtomicU64,
    suppressed: AtomicU64,
    stale: AtomicU64,
}

impl Publisher {
    /// Creates a publisher whose initial aggregate is empty.
    #[must_use]
    pub fn new(
        evaluator: EntryEvaluator,
        sink: Arc<dyn EventSink>,
        config: Arc<RegistryConfig>,
    ) -> Self {
        let initial = Arc::new(Contributions::default());
        let (watch_tx, _) = watch::channel(Arc::clone(&initial));
        Self {
            evaluator,
            sink,
            config,
            state: Mutex::new(PublishState {
                stamp: None,
                last: Arc::clone(&initial),
            }),
            output: Subject::new(initial),
            watch_tx,
            recomputations: AtomicU64::new(0),
            published: AtomicU64::new(0),
            suppressed: AtomicU64::new(0),
            stale: AtomicU64::new(0),
        }
    }

    /// Evaluates every entry against `context`, merges, and publishes the
    /// result if it differs from the last published aggregate.
    pub fn recompute(
        &self,
        stamp: Stamp,
        entries: &EntryList,
        context: &ContextSnapshot,
    ) -> RecomputeAttributes {
        let timer = SpanTimer::start("contributions.recompute");
        self.recomputations.fetch_add(1, Ordering::Relaxed);

        let mut failed = 0;
        let evaluated: Vec<Arc<Contributions>> = entries
            .iter()
            .map(|entry| {
                let outcome = self.evaluator.evaluate(entry, context);
                if outcome.is_failed() {
                    failed += 1;
                }
                outcome.contributions()
            })
            .collect();
        let aggregate = merge_contributions(&evaluated);

        let outcome = {
            let mut state = self.state.lock();
            if state.stamp.is_some_and(|previous| stamp.is_older_than(&previous)) {
                RecomputeOutcome::Stale
            } else {
                state.stamp = Some(stamp);
                if Arc::ptr_eq(&state.last, &aggregate) || *state.last == *aggregate {
                    RecomputeOutcome::Suppressed
                } else {
                    state.last = Arc::clone(&aggregate);
                    self.watch_tx.send_replace(Arc::clone(&aggregate));
                    RecomputeOutcome::Published
                }
            }
        };

        match outcome {
            RecomputeOutcome::Published => {
                self.published.fetch_add(1, Ordering::Relaxed);
                if self.config.emit_publish_events {
                    self.sink.try_emit(
                        AGGREGATE_PUBLISHED,
                        Some(serde_json::json!({
                            "entries_revision": stamp.entries_revision,
                            "context_sequence": stamp.context_sequence,
                            "commands": aggregate.commands().len(),
                            "menu_items": aggregate.menu_item_count(),
                        })),
                    );
                }
                self.output.next(aggregate);
            }
            RecomputeOutcome::Suppressed => {
                self.suppressed.fetch_add(1, Ordering::Relaxed);
            }
            RecomputeOutcome::Stale => {
                self.stale.fetch_add(1, Ordering::Relaxed);
            }
        }

        let attributes = RecomputeAttributes::new(stamp, outcome)
            .with_entries(entries.len(), failed)
            .with_duration_ms(timer.finish());
        debug!(
            entries_revision = stamp.entries_revision,
            context_sequence = stamp.context_sequence,
            entries = entries.len(),
            failed_entries = failed,
            outcome = %outcome,
            duration_ms = attributes.duration_ms,
            "Recomputed contributions"
        );
        attributes
    }

    /// The last published aggregate.
    #[must_use]
    pub fn aggregate(&self) -> Arc<Contributions> {
        Arc::clone(&self.state.lock().last)
    }

    /// Subscribes to published aggregates. The listener is called
    /// immediately with the current aggregate.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Arc<Contributions>) + Send + Sync + 'static,
    {
        self.output.subscribe(listener)
    }

    /// A watch receiver that always holds the latest aggregate.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Arc<Contributions>> {
        self.watch_tx.subscribe()
    }

    /// Lifetime counters.
    #[must_use]
    pub fn stats(&self) -> PublisherStats {
        PublisherStats {
            recomputations: self.recomputations.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
