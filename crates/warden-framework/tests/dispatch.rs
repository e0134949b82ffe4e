mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tower::util::MapResponseLayer;
use warden_core::{BindError, DispatchError, EventResult, ListenerError, ResultKind};
use warden_framework::{
    BoundArgs, BoxError, DispatchContext, EventFilter, EventListenerManager, EventOf, EventResults,
    Filter, FilterGroup, Listener, ListenerContext, MatchType, MultiMatchType, ParamDescriptor,
    Priority, State, TargetFilter, TowerInterceptor, filter_fn, listener_interceptor_fn,
    processing_interceptor_fn,
};

use common::{Counter, MemberJoined, TestMessage, ids};

fn counting(id: &str, priority: i32, filter: Filter, counter: &Counter) -> Listener {
    let counter = counter.clone();
    Listener::builder(id)
        .priority(priority)
        .filter(filter)
        .handler(move || async move {
            counter.hit();
        })
}

fn contains(value: &str) -> Filter {
    Filter::builder()
        .value(value)
        .match_type(MatchType::Contains)
        .build()
        .unwrap()
}

async fn run(
    manager: &EventListenerManager,
    event: TestMessage,
) -> Vec<warden_core::ListenerResult> {
    manager.dispatch(event.boxed()).await.unwrap().collect_all().await
}

// ===== Ordering =====

#[tokio::test]
async fn test_results_follow_priority_order() {
    let counter = Counter::default();
    let mut manager = EventListenerManager::new();
    for (id, priority) in [("c", 30), ("a", -5), ("d", Priority::LOWEST), ("b", 10)] {
        manager.register_listener(counting(id, priority, Filter::always(), &counter));
    }

    let results = run(&manager, TestMessage::text("hi")).await;
    assert_eq!(ids(&results), ["a", "b", "c", "d"]);
    assert_eq!(counter.get(), 4);
}

#[tokio::test]
async fn test_equal_priorities_keep_registration_order() {
    let counter = Counter::default();
    let mut manager = EventListenerManager::new();
    for id in ["first", "second", "third"] {
        manager.register_listener(counting(id, Priority::NORMAL, Filter::always(), &counter));
    }
    manager.register_listener(counting("early", Priority::HIGH, Filter::always(), &counter));

    let results = run(&manager, TestMessage::text("hi")).await;
    assert_eq!(ids(&results), ["early", "first", "second", "third"]);
}

#[tokio::test]
async fn test_target_and_keyword_listeners_order() {
    let counter = Counter::default();
    let mut manager = EventListenerManager::new();
    let by_group = Filter::builder()
        .target(TargetFilter::new().group("g1"))
        .build()
        .unwrap();
    manager.register_listener(counting("L1", 10, by_group, &counter));
    manager.register_listener(counting("L2", 5, contains("hello"), &counter));

    let results = run(&manager, TestMessage::text("hello world").in_group("g1")).await;
    assert_eq!(ids(&results), ["L2", "L1"]);
}

#[tokio::test]
async fn test_skipped_listeners_are_absent() {
    let counter = Counter::default();
    let mut manager = EventListenerManager::new();
    manager.register_listener(counting("hello", 0, contains("hello"), &counter));
    manager.register_listener(counting("bye", 1, contains("bye"), &counter));

    let results = run(&manager, TestMessage::text("bye now")).await;
    assert_eq!(ids(&results), ["bye"]);
    assert_eq!(counter.get(), 1);
}

// ===== Filters =====

#[tokio::test]
async fn test_if_null_pass_on_event_without_text() {
    let counter = Counter::default();
    let mut manager = EventListenerManager::new();
    let passing = Filter::builder().value("hello").if_null_pass(true).build().unwrap();
    let failing = Filter::builder().value("hello").if_null_pass(false).build().unwrap();
    manager.register_listener(counting("pass", 0, passing, &counter));
    manager.register_listener(counting("fail", 1, failing, &counter));

    let event = warden_core::BoxedEvent::new(MemberJoined { group: "g1".into() });
    let results = manager.dispatch(event).await.unwrap().collect_all().await;
    assert_eq!(ids(&results), ["pass"]);
}

#[tokio::test]
async fn test_failing_filter_does_not_block_next_listener() {
    let counter = Counter::default();
    let mut manager = EventListenerManager::new();
    manager.register_listener(counting(
        "broken",
        0,
        Filter::predicate(filter_fn(|_| Err("permission store offline".into()))),
        &counter,
    ));
    manager.register_listener(counting(
        "panicky",
        1,
        Filter::predicate(filter_fn(|_| panic!("bad filter"))),
        &counter,
    ));
    manager.register_listener(counting("healthy", 2, Filter::always(), &counter));

    let results = run(&manager, TestMessage::text("hi")).await;
    assert_eq!(ids(&results), ["healthy"]);
}

#[tokio::test]
async fn test_any_group_invokes_once() {
    let counter = Counter::default();
    let evaluated = Counter::default();
    let member = |value: bool| {
        let evaluated = evaluated.clone();
        Filter::predicate(filter_fn(move |_| {
            evaluated.hit();
            Ok(value)
        }))
    };
    let group = FilterGroup::new(MultiMatchType::Any)
        .with(member(false))
        .with(member(false))
        .with(member(true));

    let mut manager = EventListenerManager::new();
    let handler_counter = counter.clone();
    manager.register_listener(
        Listener::builder("any")
            .filter_group(group)
            .handler(move || async move {
                handler_counter.hit();
            }),
    );

    let results = run(&manager, TestMessage::text("hi")).await;
    assert_eq!(ids(&results), ["any"]);
    assert_eq!(counter.get(), 1);
    assert_eq!(evaluated.get(), 3);
}

// ===== Binding =====

#[tokio::test]
async fn test_keyword_capture_is_bound() {
    let mut manager = EventListenerManager::new();
    manager.register_listener(
        Listener::builder("ban")
            .filter(
                Filter::builder()
                    .value("ban {{target}}")
                    .match_type(MatchType::RegexFind)
                    .build()
                    .unwrap(),
            )
            .param(ParamDescriptor::string("target"))
            .handler(|args: BoundArgs| async move {
                format!("banned {}", args.get_str("target").unwrap_or_default())
            }),
    );

    let results = run(&manager, TestMessage::text("ban user42")).await;
    assert_eq!(
        results[0].result.downcast_ref::<String>().map(String::as_str),
        Some("banned user42")
    );
}

#[tokio::test]
async fn test_missing_required_param_skips_handler() {
    let counter = Counter::default();
    let handler_counter = counter.clone();
    let filter = Filter::builder()
        .value("ban {{target}}")
        .match_type(MatchType::RegexFind)
        .or(contains("kick"))
        .build()
        .unwrap();

    let mut manager = EventListenerManager::new();
    manager.register_listener(
        Listener::builder("moderate")
            .filter(filter)
            .param(ParamDescriptor::string("target"))
            .handler(move || async move {
                handler_counter.hit();
            }),
    );

    let results = run(&manager, TestMessage::text("kick everyone")).await;
    assert_eq!(results.len(), 1);
    assert!(matches!(
        results[0].result.error(),
        Some(ListenerError::Bind(BindError::Missing { name })) if name == "target"
    ));
    assert_eq!(counter.get(), 0);
}

#[tokio::test]
async fn test_param_default_and_conversion() {
    let mut manager = EventListenerManager::new();
    manager.register_listener(
        Listener::builder("mute")
            .filter(
                Filter::builder()
                    .value(r"mute {{who,\w+}}(?: {{minutes,\S+}})?")
                    .build()
                    .unwrap(),
            )
            .param(ParamDescriptor::string("who"))
            .param(ParamDescriptor::parsed::<u32>("minutes").default_value(10_u32))
            .handler(|args: BoundArgs| async move { args.get::<u32>("minutes").map(u64::from) }),
    );

    let defaulted = run(&manager, TestMessage::text("mute bob")).await;
    assert_eq!(defaulted[0].result.downcast_ref::<u64>(), Some(&10));

    let explicit = run(&manager, TestMessage::text("mute bob 3")).await;
    assert_eq!(explicit[0].result.downcast_ref::<u64>(), Some(&3));

    let invalid = run(&manager, TestMessage::text("mute bob soon")).await;
    assert!(matches!(
        invalid[0].result.error(),
        Some(ListenerError::Bind(BindError::Conversion { .. }))
    ));
}

// ===== Handler outcomes =====

#[tokio::test]
async fn test_handler_failures_are_inline() {
    let counter = Counter::default();
    let mut manager = EventListenerManager::new();
    manager.register_listener(
        Listener::builder("err")
            .priority(0)
            .handler(|| async { Err::<String, _>(std::io::Error::other("database down")) }),
    );
    manager.register_listener(
        Listener::builder("panic")
            .priority(1)
            .handler(|| async { panic!("handler bug") as () }),
    );
    manager.register_listener(counting("after", 2, Filter::always(), &counter));

    let results = run(&manager, TestMessage::text("hi")).await;
    assert_eq!(ids(&results), ["err", "panic", "after"]);
    assert!(matches!(results[0].result.error(), Some(ListenerError::Handler(_))));
    assert!(matches!(
        results[1].result.error(),
        Some(ListenerError::Panicked(msg)) if msg == "handler bug"
    ));
    assert_eq!(results[2].result.kind(), ResultKind::Empty);
}

#[tokio::test]
async fn test_typed_event_extractor() {
    let mut manager = EventListenerManager::new();
    manager.register_listener(
        Listener::builder("typed").handler(|msg: EventOf<TestMessage>| async move {
            msg.author.clone().unwrap_or_default()
        }),
    );
    manager.register_listener(
        Listener::builder("wrong_type")
            .handler(|_joined: EventOf<MemberJoined>| async { "unreachable" }),
    );

    let results = run(&manager, TestMessage::text("hi").from("alice")).await;
    assert_eq!(
        results[0].result.downcast_ref::<String>().map(String::as_str),
        Some("alice")
    );
    assert!(matches!(results[1].result.error(), Some(ListenerError::Extract(_))));
}

// ===== Propagation and cancellation =====

#[tokio::test]
async fn test_stop_propagation_ends_walk() {
    let counter = Counter::default();
    let mut manager = EventListenerManager::new();
    manager.register_listener(Listener::builder("stopper").priority(0).handler(
        |ctx: Arc<ListenerContext>| async move {
            ctx.stop_propagation();
            "handled"
        },
    ));
    manager.register_listener(counting("later", 1, Filter::always(), &counter));

    let results = run(&manager, TestMessage::text("hi")).await;
    assert_eq!(ids(&results), ["stopper"]);
    assert_eq!(counter.get(), 0);
}

#[tokio::test]
async fn test_cancellation_interrupts_in_flight_listener() {
    let counter = Counter::default();
    let mut manager = EventListenerManager::new();
    manager.register_listener(
        Listener::builder("stalled")
            .priority(0)
            .handler(|| futures::future::pending::<()>()),
    );
    manager.register_listener(counting("later", 1, Filter::always(), &counter));

    let token = CancellationToken::new();
    let results = manager
        .dispatch_with_cancel(TestMessage::text("hi").boxed(), token.clone())
        .await
        .unwrap();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });
    let results = results.collect_all().await;
    canceller.await.unwrap();

    assert_eq!(ids(&results), ["stalled"]);
    assert!(matches!(results[0].result.error(), Some(ListenerError::Cancelled)));
    assert_eq!(counter.get(), 0);
}

#[tokio::test]
async fn test_cancellation_between_listeners() {
    let counter = Counter::default();
    let mut manager = EventListenerManager::new();
    manager.register_listener(Listener::builder("first").priority(0).handler(|| async { 1_i32 }));
    manager.register_listener(counting("second", 1, Filter::always(), &counter));

    let token = CancellationToken::new();
    let mut results = manager
        .dispatch_with_cancel(TestMessage::text("hi").boxed(), token.clone())
        .await
        .unwrap();

    let first = results.next().await.unwrap();
    assert_eq!(first.listener_id(), "first");

    token.cancel();
    assert!(results.next().await.is_none());
    assert_eq!(counter.get(), 0);
}

/// Signals once evaluation starts, then never decides.
struct StalledFilter(Arc<Notify>);

#[async_trait]
impl EventFilter for StalledFilter {
    async fn test(&self, _ctx: &DispatchContext) -> Result<bool, BoxError> {
        self.0.notify_one();
        futures::future::pending().await
    }
}

#[tokio::test]
async fn test_cancellation_during_filter_evaluation() {
    let counter = Counter::default();
    let started = Arc::new(Notify::new());
    let mut manager = EventListenerManager::new();
    manager.register_listener(counting(
        "gated",
        0,
        Filter::predicate(StalledFilter(Arc::clone(&started))),
        &counter,
    ));
    manager.register_listener(counting("later", 1, Filter::always(), &counter));

    let token = CancellationToken::new();
    let results = manager
        .dispatch_with_cancel(TestMessage::text("hi").boxed(), token.clone())
        .await
        .unwrap();

    let canceller = tokio::spawn(async move {
        started.notified().await;
        token.cancel();
    });
    let results = results.collect_all().await;
    canceller.await.unwrap();

    assert!(results.is_empty());
    assert_eq!(counter.get(), 0);
}

#[tokio::test]
async fn test_pre_cancelled_dispatch() {
    let manager = EventListenerManager::new();
    let token = CancellationToken::new();
    token.cancel();
    let result = manager
        .dispatch_with_cancel(TestMessage::text("hi").boxed(), token)
        .await;
    assert!(matches!(result, Err(DispatchError::Cancelled)));
}

#[tokio::test]
async fn test_results_are_lazy() {
    let counter = Counter::default();
    let mut manager = EventListenerManager::new();
    manager.register_listener(Listener::builder("first").priority(0).handler(|| async { 1_i32 }));
    manager.register_listener(counting("second", 1, Filter::always(), &counter));

    let mut results = manager.dispatch(TestMessage::text("hi").boxed()).await.unwrap();
    assert_eq!(counter.get(), 0);

    let first = results.next().await.unwrap();
    assert_eq!(first.listener_id(), "first");
    assert_eq!(counter.get(), 0);

    drop(results);
    assert_eq!(counter.get(), 0);
}

#[tokio::test]
async fn test_first_value_stops_early() {
    let counter = Counter::default();
    let mut manager = EventListenerManager::new();
    manager.register_listener(counting("empty", 0, Filter::always(), &counter));
    manager.register_listener(Listener::builder("answer").priority(1).handler(|| async { "42" }));
    manager.register_listener(counting("never", 2, Filter::always(), &counter));

    let results = manager.dispatch(TestMessage::text("hi").boxed()).await.unwrap();
    let (item, value) = results.first_value().await.unwrap();
    assert_eq!(item.listener_id(), "answer");
    assert_eq!(value.downcast_ref::<&'static str>(), Some(&"42"));
    assert_eq!(counter.get(), 1);
}

#[test]
fn test_blocking_consumption() {
    let mut manager = EventListenerManager::new();
    manager.register_listener(Listener::builder("a").handler(|| async { 1_i64 }));
    manager.register_listener(Listener::builder("b").handler(|| async { 2_i64 }));

    let results = tokio_test::block_on(manager.dispatch(TestMessage::text("hi").boxed())).unwrap();
    let values: Vec<i64> = results
        .into_blocking()
        .filter_map(|item| item.result.downcast_ref::<i64>().copied())
        .collect();
    assert_eq!(values, [1, 2]);
}

// ===== Interceptors =====

#[tokio::test]
async fn test_listener_interceptor_order() {
    let trace = Arc::new(Mutex::new(Vec::<String>::new()));
    let recorder = |name: &'static str| {
        let trace = trace.clone();
        listener_interceptor_fn(move |ctx, next| {
            let trace = trace.clone();
            async move {
                trace.lock().push(format!("{name}>"));
                let result = next.proceed(ctx).await;
                trace.lock().push(format!("<{name}"));
                Ok::<_, BoxError>(result)
            }
        })
    };

    let handler_trace = trace.clone();
    let mut manager = EventListenerManager::new();
    manager.add_listener_interceptor(recorder("global"), Priority::NORMAL);
    manager.register_listener(
        Listener::builder("l")
            .interceptor(recorder("inner"), Priority::LOW)
            .interceptor(recorder("local"), Priority::NORMAL)
            .handler(move || async move {
                handler_trace.lock().push("handler".to_string());
            }),
    );
    manager.add_listener_interceptor(recorder("outer"), Priority::HIGH);

    run(&manager, TestMessage::text("hi")).await;
    assert_eq!(
        *trace.lock(),
        [
            "outer>", "global>", "local>", "inner>", "handler", "<inner", "<local", "<global",
            "<outer"
        ]
    );
}

#[tokio::test]
async fn test_listener_interceptor_short_circuit_and_state() {
    let counter = Counter::default();
    let handler_counter = counter.clone();
    let gate = listener_interceptor_fn(|ctx: Arc<ListenerContext>, next| async move {
        let result = if ctx.event().author_id() == Some("mallory") {
            EventResult::Invalid
        } else {
            ctx.set_state(String::from("trusted"));
            next.proceed(ctx).await
        };
        Ok::<_, BoxError>(result)
    });

    let mut manager = EventListenerManager::new();
    manager.add_listener_interceptor(gate, Priority::NORMAL);
    manager.register_listener(Listener::builder("guarded").handler(
        move |level: State<String>| async move {
            handler_counter.hit();
            level.0
        },
    ));

    let blocked = run(&manager, TestMessage::text("hi").from("mallory")).await;
    assert_eq!(blocked[0].result.kind(), ResultKind::Invalid);
    assert_eq!(counter.get(), 0);

    let allowed = run(&manager, TestMessage::text("hi").from("alice")).await;
    assert_eq!(
        allowed[0].result.downcast_ref::<String>().map(String::as_str),
        Some("trusted")
    );
    assert_eq!(counter.get(), 1);
}

#[tokio::test]
async fn test_listener_interceptor_error_is_inline() {
    let counter = Counter::default();
    let mut manager = EventListenerManager::new();
    manager.register_listener(
        Listener::builder("guarded")
            .priority(0)
            .interceptor(
                listener_interceptor_fn(|_, _| async {
                    Err::<EventResult, BoxError>("quota exceeded".into())
                }),
                Priority::NORMAL,
            )
            .handler(|| async { "never" }),
    );
    manager.register_listener(counting("next", 1, Filter::always(), &counter));

    let results = run(&manager, TestMessage::text("hi")).await;
    assert_eq!(ids(&results), ["guarded", "next"]);
    assert!(matches!(results[0].result.error(), Some(ListenerError::Interceptor(_))));
    assert_eq!(counter.get(), 1);
}

#[tokio::test]
async fn test_interceptors_skip_filtered_listeners() {
    let calls = Counter::default();
    let interceptor_calls = calls.clone();
    let mut manager = EventListenerManager::new();
    manager.add_listener_interceptor(
        listener_interceptor_fn(move |ctx, next| {
            interceptor_calls.hit();
            async move { Ok::<_, BoxError>(next.proceed(ctx).await) }
        }),
        Priority::NORMAL,
    );
    manager.register_listener(counting("match", 0, contains("yes"), &Counter::default()));
    manager.register_listener(counting("skip", 1, contains("no"), &Counter::default()));

    run(&manager, TestMessage::text("yes")).await;
    assert_eq!(calls.get(), 1);
}

#[tokio::test]
async fn test_tower_layer_interceptor() {
    let mut manager = EventListenerManager::new();
    let layer = MapResponseLayer::new(|result: EventResult| match result {
        EventResult::Empty => EventResult::value(String::from("mapped")),
        other => other,
    });
    manager.register_listener(
        Listener::builder("wrapped")
            .priority(0)
            .interceptor(TowerInterceptor::new(layer), Priority::NORMAL)
            .handler(|| async {}),
    );
    manager.register_listener(Listener::builder("plain").priority(1).handler(|| async {}));

    let results = run(&manager, TestMessage::text("hi")).await;
    assert_eq!(
        results[0].result.downcast_ref::<String>().map(String::as_str),
        Some("mapped")
    );
    assert_eq!(results[1].result.kind(), ResultKind::Empty);
}

#[tokio::test]
async fn test_processing_interceptor_wraps_walk() {
    let counter = Counter::default();
    let mut manager = EventListenerManager::new();
    manager.register_listener(counting("l", 0, Filter::always(), &counter));
    manager.add_processing_interceptor(
        processing_interceptor_fn(|ctx, next| async move {
            if ctx.event().group_id() == Some("muted") {
                Ok::<_, BoxError>(EventResults::empty())
            } else {
                Ok(next.proceed(ctx).await?)
            }
        }),
        Priority::NORMAL,
    );

    let muted = run(&manager, TestMessage::text("hi").in_group("muted")).await;
    assert!(muted.is_empty());
    assert_eq!(counter.get(), 0);

    let open = run(&manager, TestMessage::text("hi").in_group("open")).await;
    assert_eq!(ids(&open), ["l"]);
}

#[tokio::test]
async fn test_processing_interceptor_error_aborts_dispatch() {
    let counter = Counter::default();
    let mut manager = EventListenerManager::new();
    manager.register_listener(counting("l", 0, Filter::always(), &counter));
    manager.add_processing_interceptor(
        processing_interceptor_fn(|_, _| async {
            Err::<EventResults, BoxError>("rate limited".into())
        }),
        Priority::NORMAL,
    );

    let result = manager.dispatch(TestMessage::text("hi").boxed()).await;
    assert!(matches!(result, Err(DispatchError::Interceptor(_))));
    assert_eq!(counter.get(), 0);
}

#[tokio::test]
async fn test_nested_processing_error_passes_through() {
    let mut manager = EventListenerManager::new();
    manager.add_processing_interceptor(
        processing_interceptor_fn(|ctx, next| async move {
            Ok::<_, BoxError>(next.proceed(ctx).await?)
        }),
        Priority::HIGH,
    );
    manager.add_processing_interceptor(
        processing_interceptor_fn(|_, _| async {
            Err::<EventResults, BoxError>("inner failure".into())
        }),
        Priority::LOW,
    );

    let err = manager.dispatch(TestMessage::text("hi").boxed()).await.unwrap_err();
    assert_eq!(err.to_string(), "processing interceptor failed: inner failure");
}
