//! `Registry`: entry store, context and publisher wired together.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::info;

use super::{AggregateStream, EntryList, EntryStore, Publisher, PublisherStats, Stamp};
use crate::config::RegistryConfig;
use crate::context::{ContextSnapshot, ContextSubject};
use crate::contributions::{Contributions, ContributionsEntry, RegistrationHandle};
use crate::errors::RegistryMisuseError;
use crate::evaluation::{EntryEvaluator, ExpressionEvaluator, TemplateEvaluator};
use crate::events::{EventSink, NoOpEventSink};
use crate::observability::RecomputeAttributes;
use crate::reactive::Subscription;

struct RegistryInner {
    store: EntryStore,
    context: ContextSubject,
    publisher: Publisher,
    triggers: Mutex<Vec<Subscription>>,
}

impl RegistryInner {
    fn recompute(&self) -> RecomputeAttributes {
        let (entries_revision, entries) = self.store.snapshot();
        let (context_sequence, context) = self.context.snapshot();
        self.publisher
            .recompute(Stamp::new(entries_revision, context_sequence), &entries, &context)
    }
}

/// Aggregates registered contributions against a live context.
///
/// Every registration change and every context change recomputes the
/// aggregate before the triggering call returns. Subscribers only see
/// aggregates that differ from the previous one.
///
/// Cloning is cheap and clones share state. Dropping the last clone
/// unsubscribes from the context.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    /// Creates a registry with default configuration and no event sink.
    #[must_use]
    pub fn new(
        context: ContextSubject,
        expressions: Arc<dyn ExpressionEvaluator>,
        templates: Arc<dyn TemplateEvaluator>,
    ) -> Self {
        RegistryBuilder::new(expressions, templates)
            .with_context(context)
            .build()
    }

    /// Returns a builder.
    #[must_use]
    pub fn builder(
        expressions: Arc<dyn ExpressionEvaluator>,
        templates: Arc<dyn TemplateEvaluator>,
    ) -> RegistryBuilder {
        RegistryBuilder::new(expressions, templates)
    }

    fn from_parts(
        context: ContextSubject,
        expressions: Arc<dyn ExpressionEvaluator>,
        templates: Arc<dyn TemplateEvaluator>,
        sink: Arc<dyn EventSink>,
        config: Arc<RegistryConfig>,
    ) -> Self {
        let evaluator =
            EntryEvaluator::new(expressions, templates, Arc::clone(&sink), Arc::clone(&config));
        let inner = Arc::new(RegistryInner {
            store: EntryStore::new(Arc::clone(&sink)),
            context,
            publisher: Publisher::new(evaluator, sink, config),
            triggers: Mutex::new(Vec::with_capacity(2)),
        });

        let on_entries = trigger(&inner);
        let entries_subscription = inner.store.subscribe(move |_| on_entries());
        let on_context = trigger(&inner);
        let context_subscription = inner.context.subscribe(move |_| on_context());
        inner
            .triggers
            .lock()
            .extend([entries_subscription, context_subscription]);

        info!("Contribution registry started");
        Self { inner }
    }

    /// Appends an entry and recomputes.
    ///
    /// # Errors
    ///
    /// Returns `RegistryMisuseError::DuplicateEntry` if the entry is already
    /// registered. Nothing is recomputed in that case.
    pub fn register(
        &self,
        entry: ContributionsEntry,
    ) -> Result<RegistrationHandle, RegistryMisuseError> {
        self.inner.store.register(entry)
    }

    /// Swaps the entry behind `old` for `entry` with a single recomputation.
    ///
    /// # Errors
    ///
    /// Returns `RegistryMisuseError::DuplicateEntry` if `entry` is already
    /// registered under another handle.
    pub fn replace(
        &self,
        old: RegistrationHandle,
        entry: ContributionsEntry,
    ) -> Result<RegistrationHandle, RegistryMisuseError> {
        self.inner.store.replace(old, entry)
    }

    /// Removes the entry behind `handle`. Returns false if it was not
    /// registered.
    pub fn deregister(&self, handle: RegistrationHandle) -> bool {
        self.inner.store.deregister(handle)
    }

    /// The raw registered entries, in registration order.
    #[must_use]
    pub fn entries(&self) -> EntryList {
        self.inner.store.entries()
    }

    /// Subscribes to the raw entry list.
    pub fn subscribe_entries<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&EntryList) + Send + Sync + 'static,
    {
        self.inner.store.subscribe(listener)
    }

    /// The last published aggregate.
    #[must_use]
    pub fn aggregate(&self) -> Arc<Contributions> {
        self.inner.publisher.aggregate()
    }

    /// Subscribes to published aggregates. The listener is called
    /// immediately with the current aggregate.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Arc<Contributions>) + Send + Sync + 'static,
    {
        self.inner.publisher.subscribe(listener)
    }

    /// A watch receiver that always holds the latest aggregate.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Arc<Contributions>> {
        self.inner.publisher.watch()
    }

    /// A stream of the current and every later published aggregate.
    pub fn aggregate_stream(&self) -> AggregateStream {
        AggregateStream::new(&self.inner.publisher)
    }

    /// The context subject this registry follows.
    #[must_use]
    pub fn context(&self) -> &ContextSubject {
        &self.inner.context
    }

    /// The current context snapshot.
    #[must_use]
    pub fn context_snapshot(&self) -> ContextSnapshot {
        self.inner.context.value()
    }

    /// Recomputes against the current inputs. Normally unnecessary since
    /// both inputs trigger recomputation themselves.
    pub fn refresh(&self) -> RecomputeAttributes {
        self.inner.recompute()
    }

    /// Entry store revision.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.inner.store.revision()
    }

    /// Publisher counters.
    #[must_use]
    pub fn stats(&self) -> PublisherStats {
        self.inner.publisher.stats()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("store", &self.inner.store)
            .field("publisher", &self.inner.publisher)
            .finish_non_exhaustive()
    }
}

fn trigger(inner: &Arc<RegistryInner>) -> impl Fn() + Send + Sync + 'static {
    let weak: Weak<RegistryInner> = Arc::downgrade(inner);
    move || {
        if let Some(inner) = weak.upgrade() {
            inner.recompute();
        }
    }
}

/// Builder for `Registry`.
pub struct RegistryBuilder {
    expressions: Arc<dyn ExpressionEvaluator>,
    templates: Arc<dyn TemplateEvaluator>,
    context: Option<ContextSubject>,
    sink: Option<Arc<dyn EventSink>>,
    config: RegistryConfig,
}

impl RegistryBuilder {
    /// Creates a builder around the two evaluators.
    #[must_use]
    pub fn new(
        expressions: Arc<dyn ExpressionEvaluator>,
        templates: Arc<dyn TemplateEvaluator>,
    ) -> Self {
        Self {
            expressions,
            templates,
            context: None,
            sink: None,
            config: RegistryConfig::default(),
        }
    }

    /// Follows an existing context subject. Defaults to a fresh, empty one.
    #[must_use]
    pub fn with_context(mut self, context: ContextSubject) -> Self {
        self.context = Some(context);
        self
    }

    /// Reports failures, misuse and publications to `sink`.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the registry and runs the initial recomputation.
    #[must_use]
    pub fn build(self) -> Registry {
        Registry::from_parts(
            self.context.unwrap_or_default(),
            self.expressions,
            self.templates,
            self.sink.unwrap_or_else(|| Arc::new(NoOpEventSink)),
            Arc::new(self.config),
        )
    }
}

impl std::fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("context", &self.context)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
