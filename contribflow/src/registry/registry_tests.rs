//! End-to-end tests for the registry: store, context and publisher together.

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    use crate::config::RegistryConfig;
    use crate::context::{ContextSnapshot, ContextSubject};
    use crate::contributions::{
        ActionItem, CommandContribution, ContributableMenu, Contributions, ContributionsEntry,
    };
    use crate::events::{EVALUATION_FAILED, REGISTRY_MISUSE};
    use crate::registry::{EntryList, Registry};
    use crate::testing::{
        entry_with_commands, entry_with_menu, menu_item, LiteralExpressionEvaluator,
        PlaceholderTemplateEvaluator, RecordingSubscriber, TestRegistry,
    };

    fn command_ids(aggregate: &Contributions) -> Vec<String> {
        aggregate.commands().iter().map(|c| c.id.clone()).collect()
    }

    fn actions(aggregate: &Contributions, menu: &str) -> Vec<String> {
        aggregate.menu(menu).iter().map(|i| i.action.clone()).collect()
    }

    fn titles(aggregate: &Contributions) -> Vec<Option<String>> {
        aggregate.commands().iter().map(|c| c.title.clone()).collect()
    }

    #[test]
    fn test_new_registry_starts_empty() {
        let t = TestRegistry::new();
        assert!(t.registry.aggregate().is_empty());
        assert!(t.registry.entries().is_empty());
        assert_eq!(t.published.count(), 1);
        assert_eq!(t.publications(), 0);
        assert!(t.is_recording());
    }

    #[test]
    fn test_commands_follow_registration_order_across_changes() {
        let t = TestRegistry::new();
        let a = t.registry.register(entry_with_commands(&[("a1", "A1"), ("a2", "A2")])).unwrap();
        let b = t.registry.register(entry_with_commands(&[("b1", "B1")])).unwrap();
        t.registry.register(entry_with_commands(&[("c1", "C1")])).unwrap();
        assert_eq!(command_ids(&t.registry.aggregate()), ["a1", "a2", "b1", "c1"]);

        assert!(t.registry.deregister(b));
        assert_eq!(command_ids(&t.registry.aggregate()), ["a1", "a2", "c1"]);

        t.registry.replace(a, entry_with_commands(&[("x", "X")])).unwrap();
        assert_eq!(command_ids(&t.registry.aggregate()), ["c1", "x"]);
    }

    #[test]
    fn test_replace_recomputes_once_without_intermediate_aggregate() {
        let t = TestRegistry::new();
        let entries: RecordingSubscriber<EntryList> = RecordingSubscriber::new();
        let _entries_subscription = t.registry.subscribe_entries(entries.listener());

        let a = t.registry.register(entry_with_commands(&[("a", "A")])).unwrap();
        let recomputations = t.registry.stats().recomputations;
        let revision = t.registry.revision();
        entries.clear();
        t.published.clear();

        t.registry.replace(a, entry_with_commands(&[("b", "B")])).unwrap();

        assert_eq!(t.registry.stats().recomputations, recomputations + 1);
        assert_eq!(t.registry.revision(), revision + 1);
        assert_eq!(entries.count(), 1);
        let published = t.published.received();
        assert_eq!(published.len(), 1);
        assert_eq!(command_ids(&published[0]), ["b"]);
    }

    #[test]
    fn test_replace_with_unknown_handle_still_registers() {
        let t = TestRegistry::new();
        let stale = t.registry.register(entry_with_commands(&[("a", "A")])).unwrap();
        assert!(t.registry.deregister(stale));

        let handle = t.registry.replace(stale, entry_with_commands(&[("b", "B")])).unwrap();

        assert_eq!(command_ids(&t.registry.aggregate()), ["b"]);
        assert_ne!(handle, stale);
        assert_eq!(t.sink.payloads(REGISTRY_MISUSE).len(), 1);
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let t = TestRegistry::new();
        let entry = entry_with_commands(&[("a", "A")]);
        t.registry.register(entry.clone()).unwrap();
        let recomputations = t.registry.stats().recomputations;

        let err = t.registry.register(entry.clone()).unwrap_err();

        assert_eq!(err.entry_id(), entry.id());
        assert_eq!(t.registry.entries().len(), 1);
        assert_eq!(t.registry.stats().recomputations, recomputations);
        assert_eq!(t.sink.payloads(REGISTRY_MISUSE).len(), 1);
    }

    #[test]
    fn test_deregister_unknown_handle_is_noop() {
        let t = TestRegistry::new();
        let handle = t.registry.register(entry_with_commands(&[("a", "A")])).unwrap();
        assert!(t.registry.deregister(handle));
        let recomputations = t.registry.stats().recomputations;

        assert!(!t.registry.deregister(handle));
        assert_eq!(t.registry.stats().recomputations, recomputations);
    }

    #[test]
    fn test_falsy_when_hidden_missing_when_shown() {
        let t = TestRegistry::with_context(
            ContextSnapshot::new().with("showA", true).with("showB", false).with("count", 0),
        );
        t.registry
            .register(entry_with_menu(
                ContributableMenu::EditorTitle,
                vec![
                    menu_item("a", Some("showA")),
                    menu_item("b", Some("showB")),
                    menu_item("c", None),
                    menu_item("d", Some("missing")),
                    menu_item("e", Some("count")),
                    menu_item("f", Some("!showB")),
                ],
            ))
            .unwrap();

        assert_eq!(actions(&t.registry.aggregate(), "editor/title"), ["a", "c", "f"]);
    }

    #[test]
    fn test_when_follows_context_changes() {
        let t = TestRegistry::new();
        t.registry
            .register(entry_with_menu(
                ContributableMenu::CommandPalette,
                vec![menu_item("deploy", Some("canDeploy"))],
            ))
            .unwrap();
        assert!(t.registry.aggregate().menu("commandPalette").is_empty());

        t.context.set_value("canDeploy", true);
        assert_eq!(actions(&t.registry.aggregate(), "commandPalette"), ["deploy"]);

        t.context.remove_value("canDeploy");
        assert!(t.registry.aggregate().menu("commandPalette").is_empty());
    }

    #[test]
    fn test_plain_text_never_reaches_template_evaluator() {
        let t = TestRegistry::with_context(ContextSnapshot::new().with("user", "Bo"));
        let contributions = Contributions::new()
            .with_command(
                CommandContribution::new("plain")
                    .with_title("Plain title")
                    .with_category("Tools")
                    .with_argument(json!("literal"))
                    .with_action_item(ActionItem::new().with_label("Run")),
            )
            .with_command(CommandContribution::new("greet").with_title("Hello ${user}"));
        t.registry.register(ContributionsEntry::new(contributions)).unwrap();

        assert_eq!(t.templates.evaluated_templates(), ["Hello ${user}"]);
        assert!(t.templates.checks() >= 5);
    }

    #[test]
    fn test_disabled_shortcut_sends_every_field_to_evaluator() {
        let t = TestRegistry::with_config(
            ContextSnapshot::new(),
            RegistryConfig::default().with_interpolation_shortcut(false),
        );
        t.registry
            .register(ContributionsEntry::new(Contributions::new().with_command(
                CommandContribution::new("plain").with_title("Plain").with_category("Tools"),
            )))
            .unwrap();

        assert_eq!(t.templates.evaluated_templates(), ["Plain", "Tools"]);
        assert_eq!(t.templates.checks(), 0);
    }

    #[test]
    fn test_failing_entry_is_isolated() {
        let t = TestRegistry::new();
        t.registry.register(entry_with_commands(&[("a", "A")])).unwrap();
        let broken = entry_with_commands(&[("b", "${missing}")]).with_source("ext.broken");
        let broken_id = broken.id();
        t.registry.register(broken).unwrap();
        t.registry.register(entry_with_commands(&[("c", "C")])).unwrap();

        assert_eq!(command_ids(&t.registry.aggregate()), ["a", "c"]);
        let failures = t.sink.payloads(EVALUATION_FAILED);
        assert_eq!(failures.len(), 2);
        assert!(failures
            .iter()
            .all(|payload| payload["entry_id"] == json!(broken_id.to_string())));
        assert_eq!(failures[0]["source"], json!("ext.broken"));

        t.context.set_value("missing", "B");
        assert_eq!(command_ids(&t.registry.aggregate()), ["a", "b", "c"]);
        assert_eq!(t.sink.payloads(EVALUATION_FAILED).len(), 2);
    }

    #[test]
    fn test_failing_when_discards_whole_entry() {
        let t = TestRegistry::new();
        let contributions = Contributions::new()
            .with_command(CommandContribution::new("x"))
            .with_menu_item("editor/title", menu_item("x", Some("not an expression")));
        t.registry.register(ContributionsEntry::new(contributions)).unwrap();
        t.registry.register(entry_with_commands(&[("y", "Y")])).unwrap();

        assert_eq!(command_ids(&t.registry.aggregate()), ["y"]);
        assert!(!t.registry.aggregate().has_menu("editor/title"));
    }

    #[test]
    fn test_equal_aggregates_notify_once() {
        let t = TestRegistry::with_context(ContextSnapshot::new().with("user", "Bo"));
        t.registry.register(entry_with_commands(&[("greet", "Hello ${user}")])).unwrap();
        let publications = t.publications();
        let suppressed = t.registry.stats().suppressed;

        t.context.set_value("unrelated", 1);
        t.context.set_value("unrelated", 2);

        assert_eq!(t.publications(), publications);
        assert_eq!(t.registry.stats().suppressed, suppressed + 2);
    }

    #[test]
    fn test_context_change_reinterpolates_without_reregistration() {
        let t = TestRegistry::with_context(ContextSnapshot::new().with("user", "Bo"));
        t.registry.register(entry_with_commands(&[("greet", "Hello ${user}")])).unwrap();
        assert_eq!(titles(&t.registry.aggregate()), [Some("Hello Bo".to_string())]);
        let revision = t.registry.revision();

        t.context.next(ContextSnapshot::new().with("user", "Zed"));

        assert_eq!(titles(&t.registry.aggregate()), [Some("Hello Zed".to_string())]);
        assert_eq!(t.registry.revision(), revision);
        let raw = t.registry.entries();
        assert_eq!(raw[0].contributions().commands()[0].title.as_deref(), Some("Hello ${user}"));
    }

    #[test]
    fn test_menu_items_keep_registration_order() {
        let t = TestRegistry::new();
        t.registry
            .register(entry_with_menu(
                ContributableMenu::EditorTitle,
                vec![menu_item("first", None)],
            ))
            .unwrap();
        t.registry
            .register(entry_with_menu(
                ContributableMenu::EditorTitle,
                vec![menu_item("second", None)],
            ))
            .unwrap();

        assert_eq!(actions(&t.registry.aggregate(), "editor/title"), ["first", "second"]);
    }

    #[test]
    fn test_hidden_item_keeps_key_when_others_contribute() {
        let t = TestRegistry::new();
        t.registry
            .register(entry_with_menu(
                ContributableMenu::EditorTitle,
                vec![menu_item("hidden", Some("false"))],
            ))
            .unwrap();
        let aggregate = t.registry.aggregate();
        assert!(aggregate.has_menu("editor/title"));
        assert!(aggregate.menu("editor/title").is_empty());

        t.registry
            .register(entry_with_menu(
                ContributableMenu::EditorTitle,
                vec![menu_item("shown", None)],
            ))
            .unwrap();
        assert_eq!(actions(&t.registry.aggregate(), "editor/title"), ["shown"]);
    }

    #[test]
    fn test_unchanged_entry_is_shared_with_aggregate() {
        let t = TestRegistry::new();
        t.registry.register(entry_with_commands(&[("a", "A")])).unwrap();

        let raw = t.registry.entries();
        assert!(Arc::ptr_eq(raw[0].contributions(), &t.registry.aggregate()));
    }

    #[test]
    fn test_subscriber_may_call_back_into_registry() {
        let t = TestRegistry::new();
        let registry = t.registry.clone();
        let seen = RecordingSubscriber::new();
        let record = seen.listener();
        let subscription = t.registry.subscribe(move |_| {
            record(&registry.aggregate().commands().len());
        });

        t.registry.register(entry_with_commands(&[("a", "A")])).unwrap();
        t.registry.register(entry_with_commands(&[("b", "B")])).unwrap();

        assert_eq!(seen.received(), [0, 1, 2]);
        subscription.unsubscribe();
    }

    #[test]
    fn test_subscriber_may_register_during_notification() {
        let t = TestRegistry::new();
        let registry = t.registry.clone();
        let subscription = t.registry.subscribe(move |aggregate| {
            if command_ids(aggregate) == ["trigger"] {
                registry.register(entry_with_commands(&[("follow", "F")])).unwrap();
            }
        });

        t.registry.register(entry_with_commands(&[("trigger", "T")])).unwrap();

        assert_eq!(command_ids(&t.registry.aggregate()), ["trigger", "follow"]);
        subscription.unsubscribe();
    }

    #[test]
    fn test_later_subscribers_end_on_latest_aggregate() {
        let t = TestRegistry::new();
        let registry = t.registry.clone();
        let reacting = t.registry.subscribe(move |aggregate| {
            if command_ids(aggregate) == ["trigger"] {
                registry.register(entry_with_commands(&[("follow", "F")])).unwrap();
            }
        });
        let later = RecordingSubscriber::new();
        let _later = t.registry.subscribe(later.listener());
        let mut stream = t.registry.aggregate_stream();
        let raw: RecordingSubscriber<EntryList> = RecordingSubscriber::new();
        let _raw = t.registry.subscribe_entries(raw.listener());

        t.registry.register(entry_with_commands(&[("trigger", "T")])).unwrap();

        assert_eq!(command_ids(&t.registry.aggregate()), ["trigger", "follow"]);
        let seen: Vec<Vec<String>> = later.received().iter().map(|a| command_ids(a)).collect();
        assert_eq!(seen, vec![vec![], vec!["trigger".to_string(), "follow".to_string()]]);
        assert_eq!(command_ids(&t.published.last().unwrap()), ["trigger", "follow"]);
        assert_eq!(raw.last().unwrap().len(), 2);

        stream.close();
        let streamed = tokio_test::block_on(stream.collect::<Vec<_>>());
        assert_eq!(command_ids(streamed.last().unwrap()), ["trigger", "follow"]);
        assert!(streamed.iter().all(|a| command_ids(a) != ["trigger"]));
        reacting.unsubscribe();
    }

    #[test]
    fn test_when_is_evaluated_raw_and_never_interpolated() {
        let t = TestRegistry::with_context(ContextSnapshot::new().with("flag", "on"));
        let contributions = Contributions::new()
            .with_command(CommandContribution::new("greet").with_title("Hi ${flag}"))
            .with_menu_item("editor/title", menu_item("greet", Some("${flag}")));
        t.registry.register(ContributionsEntry::new(contributions)).unwrap();

        // `${flag}` is not valid expression syntax, so a raw `when` fails the entry.
        assert!(t.registry.aggregate().is_empty());
        assert_eq!(t.templates.evaluated_templates(), Vec::<String>::new());
        let failures = t.sink.payloads(EVALUATION_FAILED);
        assert_eq!(failures[0]["error_kind"], json!("expression"));
        assert!(failures[0]["error"].as_str().unwrap().contains("${flag}"));
    }

    #[test]
    fn test_panicking_subscriber_does_not_stop_others() {
        let t = TestRegistry::new();
        let _bad = t.registry.subscribe(|aggregate| {
            assert!(aggregate.is_empty(), "subscriber failure");
        });

        t.registry.register(entry_with_commands(&[("a", "A")])).unwrap();

        assert_eq!(t.publications(), 1);
        assert_eq!(command_ids(&t.registry.aggregate()), ["a"]);
    }

    #[test]
    fn test_concurrent_registration_converges() {
        let t = TestRegistry::new();
        let threads: Vec<_> = (0..4)
            .map(|n| {
                let registry = t.registry.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        let id = format!("t{n}-{i}");
                        registry.register(entry_with_commands(&[(id.as_str(), "T")])).unwrap();
                    }
                })
            })
            .collect();
        for handle in threads {
            handle.join().unwrap();
        }

        assert_eq!(t.registry.entries().len(), 100);
        assert_eq!(t.registry.aggregate().commands().len(), 100);
        assert_eq!(t.registry.watch().borrow().commands().len(), 100);
    }

    #[test]
    fn test_dropping_registry_releases_context() {
        let context = ContextSubject::new(ContextSnapshot::new());
        let registry = Registry::new(
            context.clone(),
            Arc::new(LiteralExpressionEvaluator::new()),
            Arc::new(PlaceholderTemplateEvaluator::new()),
        );
        assert_eq!(context.listener_count(), 1);

        drop(registry);
        assert_eq!(context.listener_count(), 0);
        context.set_value("user", "Bo");
    }

    #[test]
    fn test_publish_events() {
        let t = TestRegistry::with_config(
            ContextSnapshot::new(),
            RegistryConfig::default().with_publish_events(true),
        );
        t.registry.register(entry_with_commands(&[("a", "A")])).unwrap();

        let published = t.sink.payloads(crate::events::AGGREGATE_PUBLISHED);
        assert_eq!(published.len(), 1);
        assert_eq!(published[0]["commands"], json!(1));
    }

    #[test]
    fn test_aggregate_stream_wakes_on_publication() {
        let t = TestRegistry::new();
        let mut stream = tokio_test::task::spawn(t.registry.aggregate_stream());

        let initial = tokio_test::assert_ready!(stream.poll_next());
        assert!(initial.unwrap().is_empty());
        tokio_test::assert_pending!(stream.poll_next());

        t.context.set_value("unrelated", true);
        assert!(!stream.is_woken());

        t.registry.register(entry_with_commands(&[("a", "A")])).unwrap();
        assert!(stream.is_woken());
        let next = tokio_test::assert_ready!(stream.poll_next());
        assert_eq!(command_ids(&next.unwrap()), ["a"]);
    }

    #[tokio::test]
    async fn test_watch_receives_latest_aggregate() {
        let t = TestRegistry::new();
        let mut receiver = t.registry.watch();

        t.registry.register(entry_with_commands(&[("a", "A")])).unwrap();

        receiver.changed().await.unwrap();
        assert_eq!(command_ids(&receiver.borrow_and_update()), ["a"]);
    }

    #[tokio::test]
    async fn test_aggregate_stream_yields_every_publication() {
        let t = TestRegistry::with_context(ContextSnapshot::new().with("user", "Bo"));
        let mut stream = t.registry.aggregate_stream();

        t.registry.register(entry_with_commands(&[("greet", "Hello ${user}")])).unwrap();
        t.context.set_value("user", "Zed");

        assert!(stream.next().await.unwrap().is_empty());
        assert_eq!(titles(&stream.next().await.unwrap()), [Some("Hello Bo".to_string())]);
        assert_eq!(titles(&stream.next().await.unwrap()), [Some("Hello Zed".to_string())]);

        drop(t);
        assert!(stream.next().await.is_none());
    }
}
