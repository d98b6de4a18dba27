// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for specialist dispatch.
//!
//! Scripted in-process workers stand in for remote specialists so each test
//! controls exactly which chunks are streamed, which tasks are reported done
//! and how the invocation ends.

use async_trait::async_trait;
use scratchpad_core::application::dispatcher::{DispatchOutcome, DispatchRequest, Dispatcher};
use scratchpad_core::application::shared_document::{SharedDocument, EMPTY_DOCUMENT};
use scratchpad_core::application::specialist::{BlockingWorker, SpecialistContext, SpecialistWorker};
use scratchpad_core::application::taskboard::TaskBoard;
use scratchpad_core::domain::config::ScratchpadConfig;
use scratchpad_core::domain::document::{SlotKey, TimeSlot};
use scratchpad_core::domain::events::{EventType, ScratchpadEvent};
use scratchpad_core::domain::task::{StatusSummary, TaskId, TaskSpec};
use scratchpad_core::domain::worker::{ChunkSink, WorkerError, WorkerRequest};
use scratchpad_core::infrastructure::event_bus::{EventBus, EventReceiver};
use scratchpad_core::infrastructure::worker_registry::{RoleDefinition, WorkerRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Streams `chunks`, reports `completes` through the tool surface, then
/// returns `result`.
struct Scripted {
    chunks: Vec<String>,
    completes: Vec<TaskId>,
    result: Result<String, WorkerError>,
}

impl Scripted {
    fn ok(result: &str) -> Self {
        Self {
            chunks: Vec::new(),
            completes: Vec::new(),
            result: Ok(result.to_string()),
        }
    }

    fn failing(error: WorkerError) -> Self {
        Self {
            chunks: Vec::new(),
            completes: Vec::new(),
            result: Err(error),
        }
    }

    fn streaming(mut self, chunks: &[&str]) -> Self {
        self.chunks = chunks.iter().map(|c| c.to_string()).collect();
        self
    }

    fn completing(mut self, ids: &[u64]) -> Self {
        self.completes = ids.iter().copied().map(TaskId).collect();
        self
    }
}

#[async_trait]
impl SpecialistWorker for Scripted {
    async fn invoke(
        &self,
        context: SpecialistContext,
        _request: WorkerRequest,
        chunks: ChunkSink,
    ) -> Result<String, WorkerError> {
        for chunk in &self.chunks {
            chunks.send(chunk.clone()).await?;
            tokio::task::yield_now().await;
        }
        for id in &self.completes {
            context
                .complete_task(*id)
                .await
                .map_err(|e| WorkerError::Remote(e.to_string()))?;
        }
        self.result.clone()
    }
}

struct Sleeper;

#[async_trait]
impl SpecialistWorker for Sleeper {
    async fn invoke(
        &self,
        _context: SpecialistContext,
        _request: WorkerRequest,
        chunks: ChunkSink,
    ) -> Result<String, WorkerError> {
        chunks.send("thinking").await?;
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok("too late".to_string())
    }
}

struct Panicker;

#[async_trait]
impl SpecialistWorker for Panicker {
    async fn invoke(
        &self,
        _context: SpecialistContext,
        _request: WorkerRequest,
        _chunks: ChunkSink,
    ) -> Result<String, WorkerError> {
        panic!("specialist crashed");
    }
}

struct Harness {
    bus: EventBus,
    taskboard: Arc<TaskBoard>,
    document: Arc<SharedDocument>,
    dispatcher: Dispatcher,
    events: JoinHandle<Vec<ScratchpadEvent>>,
}

impl Harness {
    fn new(registry: WorkerRegistry, config: ScratchpadConfig) -> Self {
        let bus = EventBus::new(config.event_bus_capacity);
        let receiver: EventReceiver = bus.subscribe().unwrap();
        let events = tokio::spawn(receiver.collect_all());
        let taskboard = Arc::new(TaskBoard::new(bus.clone()));
        let document = Arc::new(SharedDocument::new(bus.clone()));
        let dispatcher = Dispatcher::new(
            Arc::clone(&taskboard),
            Arc::clone(&document),
            bus.clone(),
            Arc::new(registry),
            &config,
        );
        Self {
            bus,
            taskboard,
            document,
            dispatcher,
            events,
        }
    }

    fn with_worker(role: &str, worker: impl SpecialistWorker + 'static) -> Self {
        let registry = WorkerRegistry::new().with_worker(RoleDefinition::new(role), Arc::new(worker));
        Self::new(registry, ScratchpadConfig::default())
    }

    async fn finish(self) -> Vec<ScratchpadEvent> {
        self.bus.close();
        self.events.await.unwrap()
    }
}

fn of_source<'a>(events: &'a [ScratchpadEvent], source: &str) -> Vec<&'a ScratchpadEvent> {
    events.iter().filter(|e| e.source == source).collect()
}

#[tokio::test]
async fn test_success_auto_completes_unreported_tasks() {
    let harness = Harness::with_worker("A", Scripted::ok("Itinerary for A"));
    harness
        .taskboard
        .create_tasks(vec![
            TaskSpec::new("one", "A"),
            TaskSpec::new("two", "A"),
            TaskSpec::new("three", "A"),
        ])
        .await
        .unwrap();

    let outcome = harness
        .dispatcher
        .dispatch(DispatchRequest::new("A", vec![TaskId(1), TaskId(2)], "Do your part."))
        .await
        .unwrap();

    let DispatchOutcome::Completed {
        summary,
        version,
        auto_completed,
        ..
    } = outcome
    else {
        panic!("expected success, got {outcome:?}");
    };
    assert_eq!(auto_completed, vec![TaskId(1), TaskId(2)]);
    assert_eq!(version, 1);
    assert!(summary.starts_with("A completed 2 tasks in "));
    assert!(summary.ends_with("s. Results written to the shared document."));

    assert_eq!(
        harness.taskboard.status_summary(),
        StatusSummary {
            done: 2,
            total: 3,
            pending_ids: vec![TaskId(3)],
        }
    );
    assert_eq!(harness.document.render(true), "## General\n[A] Itinerary for A");

    let events = harness.finish().await;
    let auto_updates: Vec<_> = events
        .iter()
        .filter(|e| e.event_type == EventType::TaskUpdated)
        .map(|e| (e.data["task_id"].as_u64(), e.data["auto_completed"].as_bool()))
        .collect();
    assert_eq!(auto_updates, vec![(Some(1), Some(true)), (Some(2), Some(true))]);
}

#[tokio::test]
async fn test_reported_tasks_are_not_auto_completed() {
    let harness = Harness::with_worker("hotels", Scripted::ok("The Hoxton").completing(&[1]));
    harness
        .taskboard
        .create_tasks(vec![TaskSpec::new("Book hotel", "hotels"), TaskSpec::new("Late checkout", "hotels")])
        .await
        .unwrap();

    let outcome = harness
        .dispatcher
        .dispatch(DispatchRequest::new("hotels", vec![TaskId(1), TaskId(2)], "Find a hotel."))
        .await
        .unwrap();

    match outcome {
        DispatchOutcome::Completed { auto_completed, .. } => assert_eq!(auto_completed, vec![TaskId(2)]),
        other => panic!("expected success, got {other:?}"),
    }
    assert!(harness.taskboard.status_summary().is_complete());

    let events = harness.finish().await;
    let flags: Vec<_> = events
        .iter()
        .filter(|e| e.event_type == EventType::TaskUpdated)
        .map(|e| e.data["auto_completed"].as_bool())
        .collect();
    assert_eq!(flags, vec![Some(false), Some(true)]);
}

#[tokio::test]
async fn test_failure_writes_nothing_and_completes_nothing() {
    let harness = Harness::with_worker(
        "food",
        Scripted::failing(WorkerError::Remote("model refused".to_string())).streaming(&["partial"]),
    );
    harness
        .taskboard
        .create_tasks(vec![TaskSpec::new("Find dinner", "food")])
        .await
        .unwrap();

    let outcome = harness
        .dispatcher
        .dispatch(DispatchRequest::new("food", vec![TaskId(1)], "Dinner please."))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        DispatchOutcome::Failed {
            role: "food".to_string(),
            error: "Remote specialist error: model refused".to_string(),
            retryable: false,
        }
    );
    assert_eq!(harness.document.version(), 0);
    assert_eq!(harness.document.render(true), EMPTY_DOCUMENT);
    assert_eq!(harness.taskboard.status_summary().pending_ids, vec![TaskId(1)]);

    let events = harness.finish().await;
    let kinds: Vec<EventType> = of_source(&events, "food").iter().map(|e| e.event_type).collect();
    assert_eq!(
        kinds,
        vec![EventType::AgentStarted, EventType::AgentStreaming, EventType::AgentError]
    );
    assert!(!events.iter().any(|e| e.event_type == EventType::DocumentUpdated));
    let error = of_source(&events, "food").last().map(|e| e.data.clone()).unwrap();
    assert_eq!(error["retryable"], false);
}

#[tokio::test]
async fn test_stream_order_and_chunk_fallback() {
    let harness = Harness::with_worker(
        "flights",
        Scripted::ok("").streaming(&["BA ", "117 ", "09:40"]),
    );
    harness
        .taskboard
        .create_tasks(vec![TaskSpec::new("Outbound flight", "flights")])
        .await
        .unwrap();

    let request = DispatchRequest::new("flights", vec![TaskId(1)], "Book flights.")
        .with_slot(SlotKey::new(1, TimeSlot::Morning));
    assert!(harness.dispatcher.dispatch(request).await.unwrap().is_success());
    assert_eq!(harness.document.render(false), "## Day 1\n### Morning\nBA 117 09:40");

    let events = harness.finish().await;
    let agent = of_source(&events, "flights");
    let kinds: Vec<EventType> = agent.iter().map(|e| e.event_type).collect();
    assert_eq!(
        kinds,
        vec![
            EventType::AgentStarted,
            EventType::AgentStreaming,
            EventType::AgentStreaming,
            EventType::AgentStreaming,
            EventType::AgentCompleted,
        ]
    );
    let deltas: Vec<&str> = agent[1..4].iter().filter_map(|e| e.data["delta"].as_str()).collect();
    assert_eq!(deltas, vec!["BA ", "117 ", "09:40"]);

    let started = &agent[0].data;
    assert_eq!(started["task_ids"], serde_json::json!([1]));
    assert_eq!(started["display_name"], "flights");
    assert_eq!(
        started["instruction"],
        "Book flights.\n\nYour assigned tasks:\n- Task 1: Outbound flight"
    );

    let completed = &agent[4].data;
    assert_eq!(completed["output_length"], 12);
    assert_eq!(completed["auto_completed"], serde_json::json!([1]));
    assert_eq!(completed["version"], 1);

    // The document write lands before the completion event.
    let position = |kind: EventType| events.iter().position(|e| e.event_type == kind).unwrap();
    assert!(position(EventType::DocumentUpdated) < position(EventType::AgentCompleted));
}

#[tokio::test]
async fn test_unknown_role_fails_without_retry() {
    let harness = Harness::with_worker("flights", Scripted::ok("unused"));

    let outcome = harness
        .dispatcher
        .dispatch(DispatchRequest::new("chef", vec![], "Cook."))
        .await
        .unwrap();
    match outcome {
        DispatchOutcome::Failed { error, retryable, .. } => {
            assert_eq!(error, "No worker registered for role 'chef'");
            assert!(!retryable);
        }
        other => panic!("expected failure, got {other:?}"),
    }

    let events = harness.finish().await;
    let kinds: Vec<EventType> = events.iter().map(|e| e.event_type).collect();
    assert_eq!(kinds, vec![EventType::AgentStarted, EventType::AgentError]);
}

#[tokio::test]
async fn test_timeout_fails_retryable() {
    let registry = WorkerRegistry::new().with_worker(RoleDefinition::new("slow"), Arc::new(Sleeper));
    let config = ScratchpadConfig {
        worker_timeout_secs: 1,
        ..ScratchpadConfig::default()
    };
    let harness = Harness::new(registry, config);
    harness
        .taskboard
        .create_tasks(vec![TaskSpec::new("Wait", "slow")])
        .await
        .unwrap();

    let outcome = harness
        .dispatcher
        .dispatch(DispatchRequest::new("slow", vec![TaskId(1)], "Take your time."))
        .await
        .unwrap();
    match outcome {
        DispatchOutcome::Failed { retryable, error, .. } => {
            assert!(retryable);
            assert!(error.starts_with("Worker call timed out"));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(harness.document.version(), 0);
    assert!(!harness.taskboard.status_summary().is_complete());

    let events = harness.finish().await;
    assert_eq!(events.last().map(|e| e.event_type), Some(EventType::AgentError));
}

#[tokio::test]
async fn test_panicking_worker_is_contained() {
    let harness = Harness::with_worker("crashy", Panicker);

    let outcome = harness
        .dispatcher
        .dispatch(DispatchRequest::new("crashy", vec![], "Go."))
        .await
        .unwrap();
    match outcome {
        DispatchOutcome::Failed { error, retryable, .. } => {
            assert!(error.starts_with("Worker task aborted"));
            assert!(!retryable);
        }
        other => panic!("expected failure, got {other:?}"),
    }
    harness.finish().await;
}

#[tokio::test]
async fn test_blocking_worker_streams_across_threads() {
    let worker = BlockingWorker::new(|request: &WorkerRequest, chunks: &ChunkSink| {
        for word in ["Tate ", "Modern"] {
            chunks.blocking_send(word)?;
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(request.instruction.contains("- Task 1: Museums"));
        Ok(String::new())
    });
    let harness = Harness::with_worker("activities", worker);
    harness
        .taskboard
        .create_tasks(vec![TaskSpec::new("Museums", "activities")])
        .await
        .unwrap();

    let outcome = harness
        .dispatcher
        .dispatch(DispatchRequest::new("activities", vec![TaskId(1)], "Plan visits."))
        .await
        .unwrap();
    assert!(outcome.is_success());
    assert_eq!(harness.document.render(false), "## General\nTate Modern");

    let events = harness.finish().await;
    let streamed = events
        .iter()
        .filter(|e| e.event_type == EventType::AgentStreaming)
        .count();
    assert_eq!(streamed, 2);
}

#[tokio::test]
async fn test_strict_reads_reject_unknown_ids() {
    let registry = WorkerRegistry::new().with_worker(RoleDefinition::new("A"), Arc::new(Scripted::ok("x")));
    let config = ScratchpadConfig {
        strict_task_reads: true,
        ..ScratchpadConfig::default()
    };
    let harness = Harness::new(registry, config);
    harness
        .taskboard
        .create_tasks(vec![TaskSpec::new("one", "A")])
        .await
        .unwrap();

    let outcome = harness
        .dispatcher
        .dispatch(DispatchRequest::new("A", vec![TaskId(1), TaskId(9)], "Go."))
        .await
        .unwrap();
    match outcome {
        DispatchOutcome::Failed { error, retryable, .. } => {
            assert_eq!(error, "Task(s) not found: 9");
            assert!(!retryable);
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(harness.taskboard.status_summary().done, 0);
    harness.finish().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_dispatches_deliver_every_event() {
    const DISPATCHES: usize = 8;
    let mut registry = WorkerRegistry::new();
    for i in 0..DISPATCHES {
        let chunks: Vec<String> = (0..=i).map(|n| format!("{i}:{n} ")).collect();
        let chunk_refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
        registry.register(
            RoleDefinition::new(format!("role-{i}")).with_display_name(format!("Role {i}")),
            Arc::new(Scripted::ok("").streaming(&chunk_refs)),
        );
    }
    // Small buffers force producers to wait on the consumer.
    let config = ScratchpadConfig {
        event_bus_capacity: 4,
        chunk_buffer: 2,
        ..ScratchpadConfig::default()
    };
    let harness = Arc::new(Harness::new(registry, config));

    let handles: Vec<_> = (0..DISPATCHES)
        .map(|i| {
            let harness = Arc::clone(&harness);
            tokio::spawn(async move {
                harness
                    .dispatcher
                    .dispatch(DispatchRequest::new(format!("role-{i}"), vec![], "Go."))
                    .await
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().is_success());
    }

    let harness = Arc::into_inner(harness).unwrap();
    let events = harness.finish().await;

    let count = |kind: EventType| events.iter().filter(|e| e.event_type == kind).count();
    assert_eq!(count(EventType::AgentStarted), DISPATCHES);
    assert_eq!(count(EventType::AgentCompleted), DISPATCHES);
    assert_eq!(count(EventType::AgentError), 0);
    assert_eq!(count(EventType::AgentStreaming), (1..=DISPATCHES).sum::<usize>());

    for i in 0..DISPATCHES {
        let source = format!("role-{i}");
        let deltas: Vec<String> = of_source(&events, &source)
            .iter()
            .filter(|e| e.event_type == EventType::AgentStreaming)
            .filter_map(|e| e.data["delta"].as_str().map(str::to_string))
            .collect();
        let expected: Vec<String> = (0..=i).map(|n| format!("{i}:{n} ")).collect();
        assert_eq!(deltas, expected, "per-dispatch order for {source}");
    }
}

#[tokio::test]
async fn test_slow_consumer_does_not_time_out_finished_worker() {
    let registry = WorkerRegistry::new().with_worker(
        RoleDefinition::new("A"),
        Arc::new(Scripted::ok("done").streaming(&["first ", "second"])),
    );
    let config = ScratchpadConfig {
        event_bus_capacity: 1,
        worker_timeout_secs: 1,
        ..ScratchpadConfig::default()
    };
    let bus = EventBus::new(config.event_bus_capacity);
    let receiver = bus.subscribe().unwrap();
    let taskboard = Arc::new(TaskBoard::new(bus.clone()));
    let document = Arc::new(SharedDocument::new(bus.clone()));
    let dispatcher = Dispatcher::new(
        Arc::clone(&taskboard),
        Arc::clone(&document),
        bus.clone(),
        Arc::new(registry),
        &config,
    );

    // The consumer only starts draining after the worker deadline has passed,
    // so the relay sits on a full bus well past it.
    let consumer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        receiver.collect_all().await
    });
    let outcome = dispatcher
        .dispatch(DispatchRequest::new("A", vec![], "Go."))
        .await
        .unwrap();

    assert!(outcome.is_success(), "expected success, got {outcome:?}");
    assert_eq!(document.version(), 1);
    assert_eq!(document.render(false), "## General\ndone");

    bus.close();
    let events = consumer.await.unwrap();
    let kinds: Vec<EventType> = of_source(&events, "A").iter().map(|e| e.event_type).collect();
    assert_eq!(
        kinds,
        vec![
            EventType::AgentStarted,
            EventType::AgentStreaming,
            EventType::AgentStreaming,
            EventType::AgentCompleted,
        ]
    );
}
