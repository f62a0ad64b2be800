//! Test fixtures for registry testing.

use parking_lot::Mutex;
use std::sync::Arc;

use super::{CountingTemplateEvaluator, LiteralExpressionEvaluator, PlaceholderTemplateEvaluator};
use crate::config::RegistryConfig;
use crate::context::{ContextSnapshot, ContextSubject};
use crate::contributions::{
    CommandContribution, Contributions, ContributionsEntry, MenuItemContribution,
};
use crate::events::CollectingEventSink;
use crate::reactive::Subscription;
use crate::registry::Registry;

/// A command with an id and a title.
#[must_use]
pub fn command(id: &str, title: &str) -> CommandContribution {
    CommandContribution::new(id).with_title(title)
}

/// A menu item, optionally guarded by `when`.
#[must_use]
pub fn menu_item(action: &str, when: Option<&str>) -> MenuItemContribution {
    let item = MenuItemContribution::new(action);
    match when {
        Some(when) => item.with_when(when),
        None => item,
    }
}

/// An entry contributing one command per `(id, title)` pair.
#[must_use]
pub fn entry_with_commands(commands: &[(&str, &str)]) -> ContributionsEntry {
    let contributions = commands
        .iter()
        .fold(Contributions::new(), |acc, (id, title)| acc.with_command(command(id, title)));
    ContributionsEntry::new(contributions)
}

/// An entry contributing `items` under `menu`.
#[must_use]
pub fn entry_with_menu(
    menu: impl Into<String>,
    items: Vec<MenuItemContribution>,
) -> ContributionsEntry {
    let menu = menu.into();
    let contributions = items
        .into_iter()
        .fold(Contributions::new(), |acc, item| acc.with_menu_item(menu.clone(), item));
    ContributionsEntry::new(contributions)
}

/// Records every value a subject pushes to it.
pub struct RecordingSubscriber<T> {
    received: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for RecordingSubscriber<T> {
    fn clone(&self) -> Self {
        Self {
            received: Arc::clone(&self.received),
        }
    }
}

impl<T> Default for RecordingSubscriber<T> {
    fn default() -> Self {
        Self {
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Clone + Send + 'static> RecordingSubscriber<T> {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A listener that appends to this recorder.
    pub fn listener(&self) -> impl Fn(&T) + Send + Sync + 'static {
        let received = Arc::clone(&self.received);
        move |value: &T| received.lock().push(value.clone())
    }

    /// Everything received so far.
    #[must_use]
    pub fn received(&self) -> Vec<T> {
        self.received.lock().clone()
    }

    /// Number of values received.
    #[must_use]
    pub fn count(&self) -> usize {
        self.received.lock().len()
    }

    /// The most recent value.
    #[must_use]
    pub fn last(&self) -> Option<T> {
        self.received.lock().last().cloned()
    }

    /// Forgets everything received.
    pub fn clear(&self) {
        self.received.lock().clear();
    }
}

impl<T> std::fmt::Debug for RecordingSubscriber<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingSubscriber")
            .field("received", &self.received.lock().len())
            .finish()
    }
}

/// A registry wired to the stand-in evaluators, a collecting sink and a
/// recorder of published aggregates.
pub struct TestRegistry {
    /// The registry under test.
    pub registry: Registry,
    /// The context subject the registry follows.
    pub context: ContextSubject,
    /// Receives failure, misuse and publish events.
    pub sink: Arc<CollectingEventSink>,
    /// Counts template evaluations.
    pub templates: Arc<CountingTemplateEvaluator<PlaceholderTemplateEvaluator>>,
    /// Every aggregate pushed to subscribers, starting with the initial one.
    pub published: RecordingSubscriber<Arc<Contributions>>,
    subscription: Subscription,
}

impl TestRegistry {
    /// Creates a registry over an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::with_context(ContextSnapshot::new())
    }

    /// Creates a registry over `initial`.
    #[must_use]
    pub fn with_context(initial: ContextSnapshot) -> Self {
        Self::with_config(initial, RegistryConfig::default())
    }

    /// Creates a registry over `initial` using `config`.
    #[must_use]
    pub fn with_config(initial: ContextSnapshot, config: RegistryConfig) -> Self {
        let context = ContextSubject::new(initial);
        let sink = Arc::new(CollectingEventSink::new());
        let templates = CountingTemplateEvaluator::placeholder();
        let expressions = Arc::new(LiteralExpressionEvaluator::new());
        let registry = Registry::builder(expressions, templates.clone())
            .with_context(context.clone())
            .with_event_sink(sink.clone())
            .with_config(config)
            .build();
        let published = RecordingSubscriber::new();
        let subscription = registry.subscribe(published.listener());
        Self {
            registry,
            context,
            sink,
            templates,
            published,
            subscription,
        }
    }

    /// Number of aggregates pushed after the initial replay.
    #[must_use]
    pub fn publications(&self) -> usize {
        self.published.count().saturating_sub(1)
    }

    /// Whether the recorder is still subscribed.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.subscription.is_active()
    }
}

impl Default for TestRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TestRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestRegistry")
            .field("registry", &self.registry)
            .field("published", &self.published)
            .finish_non_exhaustive()
    }
}
