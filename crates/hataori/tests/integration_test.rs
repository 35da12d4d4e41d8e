use async_trait::async_trait;
use hataori::prelude::*;
use hataori::{ActivityExecution, InputProvider};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Journal {
    id: String,
    log: Vec<String>,
    approved: bool,
}

impl Journal {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }
}

type Append = DelegateActivity<String, String>;

/// Suspends until resumed with `{"approved": bool}`.
#[derive(Debug, Default)]
struct Approval;

#[async_trait]
impl Activity for Approval {
    type Input = ();
    type Output = String;
    type FailOutput = String;

    async fn execute(
        &self,
        _execution_id: Uuid,
        _input: (),
        _sink: &mut OutputSink<String, String>,
    ) -> Result<ActivityResult, ActivityError> {
        Ok(ActivityResult::Pending)
    }

    async fn resume(
        &self,
        _execution_id: Uuid,
        sink: &mut OutputSink<String, String>,
        closure: &Value,
    ) -> Result<ActivityResult, ActivityError> {
        if closure["approved"].as_bool().unwrap_or(false) {
            sink.success("approved".to_string());
            Ok(ActivityResult::Succeeded)
        } else {
            sink.fail("rejected".to_string());
            Ok(ActivityResult::Failed)
        }
    }
}

#[derive(Debug, Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    fn record(&self, event: &str, node: &str, activity_type: &str, value: Option<&Value>) {
        let value = value.map_or_else(|| "-".to_string(), Value::to_string);
        self.events
            .lock()
            .unwrap()
            .push(format!("{event} {node} ({activity_type}) {value}"));
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl ExecutionObserver for RecordingObserver {
    fn activity_started(&self, _id: Uuid, node: &str, activity_type: &str, input: Option<&Value>) {
        self.record("started", node, activity_type, input);
    }

    fn activity_finished(&self, _id: Uuid, node: &str, activity_type: &str, output: Option<&Value>) {
        self.record("finished", node, activity_type, output);
    }

    fn activity_failed(&self, _id: Uuid, node: &str, activity_type: &str, output: Option<&Value>) {
        self.record("failed", node, activity_type, output);
    }

    fn activity_corrupted(&self, _id: Uuid, node: &str, activity_type: &str) {
        self.record("corrupted", node, activity_type, None);
    }
}

fn registry() -> ActivityRegistry {
    ActivityRegistry::new()
        .with("Append", || Append::new(|line: String| Ok::<_, String>(line)))
        .with("Refuse", || {
            Append::new(|_: String| Err::<String, _>("refused"))
        })
        .with_default::<Approval>("Approval")
}

fn append(line: &'static str) -> ActivitySlot<Journal, Append> {
    ActivitySlot::new("Append", move |_: &Journal| line.to_string())
        .process_output(|journal: &mut Journal, line: String| journal.log.push(line))
}

fn refuse() -> ActivitySlot<Journal, Append> {
    ActivitySlot::new("Refuse", |_: &Journal| String::new()).process_fail_output(
        |journal: &mut Journal, error: String| journal.log.push(format!("error: {error}")),
    )
}

fn approval() -> ActivitySlot<Journal, Approval> {
    ActivitySlot::without_input("Approval")
        .process_output(|journal: &mut Journal, line: String| journal.log.push(line))
        .process_fail_output(|journal: &mut Journal, line: String| journal.log.push(line))
}

fn in_memory() -> Arc<InMemoryPersister<Journal>> {
    Arc::new(InMemoryPersister::new(|journal: &Journal| journal.id.clone()))
}

fn base() -> WorkflowBuilder<Journal> {
    Workflow::builder()
        .factory(Arc::new(registry()))
        .persister(in_memory())
}

fn straight() -> WorkflowBuilder<Journal> {
    base()
        .node("node1")
        .node("node2")
        .activity("node1", append("node1"))
        .activity("node2", append("node2"))
        .on_success("start", "node1")
        .on_success("node1", "node2")
        .on_success("node2", "end")
}

/// `1 -> 2 -> approval -> 4 -> end`, with `approval` suspending.
fn with_approval() -> WorkflowBuilder<Journal> {
    base()
        .node("1")
        .node("2")
        .node("approval")
        .node("4")
        .activity("1", append("1"))
        .activity("2", append("2"))
        .activity("approval", approval())
        .activity("4", append("4"))
        .on_success("start", "1")
        .on_success("1", "2")
        .on_success("2", "approval")
        .on_success("approval", "4")
        .on_fail("approval", "fail")
        .on_success("4", "end")
}

#[tokio::test]
async fn test_straight_flow_completes() {
    let workflow = straight().build().expect("valid workflow");

    let mut journal = Journal::new("straight");
    let execution = workflow.run(&mut journal).await.expect("persisted");

    assert_eq!(execution.state, WorkflowState::Complete);
    assert_eq!(execution.error, None);
    assert!(execution.executing_activities.is_empty());
    assert_eq!(journal.log, vec!["node1", "node2"]);
}

#[tokio::test]
async fn test_ambiguous_transition_corrupts() {
    let workflow = base()
        .node("node1")
        .node("node2")
        .activity("node1", append("node1"))
        .activity("node2", append("node2"))
        .on_success("start", "node1")
        .always("node1", "node2", "Success")
        .always("node1", "end", "Success")
        .on_success("node2", "end")
        .build()
        .expect("valid workflow");

    let mut journal = Journal::new("ambiguous");
    let execution = workflow.run(&mut journal).await.expect("persisted");

    assert_eq!(execution.state, WorkflowState::Corrupted);
    assert_eq!(
        execution.error.as_deref(),
        Some(
            "Failed to get next node - more then one transition condition was met: \n\
             [node1]-Success-> [node2]\n\
             [node1]-Success-> [end]"
        )
    );
    assert_eq!(journal.log, vec!["node1"]);
}

#[tokio::test]
async fn test_dead_end_lists_all_edges() {
    let workflow = base()
        .node("node1")
        .node("node2")
        .activity("node1", refuse())
        .on_success("start", "node1")
        .on_success("node1", "end")
        .when("node1", "node2", "Approved", |journal: &Journal| journal.approved)
        .on_success("node2", "end")
        .build()
        .expect("valid workflow");

    let mut journal = Journal::new("dead-end");
    let execution = workflow.run(&mut journal).await.expect("persisted");

    assert_eq!(execution.state, WorkflowState::Corrupted);
    assert_eq!(
        execution.error.as_deref(),
        Some(
            "Failed to get next node - none of transition condition was met: \n\
             [node1]-Success-> [end]\n\
             [node1]-Approved-> [node2]"
        )
    );
    assert_eq!(journal.log, vec!["error: refused"]);
}

#[tokio::test]
async fn test_fail_branch() {
    let workflow = base()
        .node("node1")
        .activity("node1", refuse())
        .on_success("start", "node1")
        .on_success("node1", "end")
        .on_fail("node1", "fail")
        .build()
        .expect("valid workflow");

    let mut journal = Journal::new("fail");
    let execution = workflow.run(&mut journal).await.expect("persisted");

    assert_eq!(execution.state, WorkflowState::Failed);
    assert_eq!(execution.error, None);
}

#[tokio::test]
async fn test_fail_node_finalizes_regardless_of_its_activity() {
    let workflow = base()
        .node("node1")
        .activity("node1", refuse())
        .activity("fail", refuse())
        .on_success("start", "node1")
        .on_fail("node1", "fail")
        .build()
        .expect("valid workflow");

    let mut journal = Journal::new("fail-activity");
    let execution = workflow.run(&mut journal).await.expect("persisted");

    assert_eq!(execution.state, WorkflowState::Failed);
    assert_eq!(journal.log, vec!["error: refused", "error: refused"]);
}

#[tokio::test]
async fn test_end_with_failed_activity_corrupts() {
    let workflow = base()
        .activity("end", refuse())
        .on_success("start", "end")
        .build()
        .expect("valid workflow");

    let mut journal = Journal::new("bad-end");
    let execution = workflow.run(&mut journal).await.expect("persisted");

    assert_eq!(execution.state, WorkflowState::Corrupted);
    assert_eq!(
        execution.error.as_deref(),
        Some("Node 'end' reached with activity result Failed")
    );
}

#[tokio::test]
async fn test_failure_routed_through_fail_edge_to_recovery() {
    let workflow = base()
        .node("node1")
        .node("recover")
        .activity("node1", refuse())
        .activity("recover", append("recover"))
        .on_success("start", "node1")
        .on_success("node1", "end")
        .on_fail("node1", "recover")
        .on_success("recover", "end")
        .build()
        .expect("valid workflow");

    let mut journal = Journal::new("recover");
    let execution = workflow.run(&mut journal).await.expect("persisted");

    assert_eq!(execution.state, WorkflowState::Complete);
    assert_eq!(journal.log, vec!["error: refused", "recover"]);
}

#[tokio::test]
async fn test_context_conditions_choose_branch() {
    let workflow = base()
        .node("check")
        .node("ship")
        .node("hold")
        .activity("ship", append("ship"))
        .activity("hold", append("hold"))
        .on_success("start", "check")
        .when("check", "ship", "Approved", |journal: &Journal| journal.approved)
        .when("check", "hold", "Rejected", |journal: &Journal| !journal.approved)
        .on_success("ship", "end")
        .on_success("hold", "end")
        .build()
        .expect("valid workflow");

    let mut approved = Journal {
        approved: true,
        ..Journal::new("approved")
    };
    let mut rejected = Journal::new("rejected");

    workflow.run(&mut approved).await.expect("persisted");
    workflow.run(&mut rejected).await.expect("persisted");

    assert_eq!(approved.log, vec!["ship"]);
    assert_eq!(rejected.log, vec!["hold"]);
}

#[tokio::test]
async fn test_aliases_can_be_transition_targets() {
    let workflow = base()
        .node_with_aliases("node1", &["first"])
        .activity("first", append("node1"))
        .on_success("start", "first")
        .on_success("node1", "end")
        .build()
        .expect("valid workflow");

    let mut journal = Journal::new("alias");
    let execution = workflow.run(&mut journal).await.expect("persisted");

    assert_eq!(execution.state, WorkflowState::Complete);
    assert_eq!(journal.log, vec!["node1"]);
}

#[tokio::test]
async fn test_pending_then_resume() {
    let persister = in_memory();
    let workflow = with_approval()
        .persister(persister.clone())
        .build()
        .expect("valid workflow");

    let mut journal = Journal::new("approval");
    let suspended = workflow.run(&mut journal).await.expect("persisted");

    assert_eq!(suspended.state, WorkflowState::InProgress);
    assert_eq!(suspended.executing_activities.len(), 1);
    let pending: &ActivityExecution = &suspended.executing_activities[0];
    assert_eq!(pending.node, "approval");
    assert_eq!(journal.log, vec!["1", "2"]);
    assert_eq!(persister.get("approval").await, Some(suspended.clone()));

    let resumed = workflow
        .resume(&mut journal, pending.id, json!({ "approved": true }))
        .await
        .expect("persisted");

    assert_eq!(resumed.state, WorkflowState::Complete);
    assert!(resumed.executing_activities.is_empty());
    assert_eq!(journal.log, vec!["1", "2", "approved", "4"]);
    assert_eq!(persister.get("approval").await, Some(resumed));
}

#[tokio::test]
async fn test_resume_rejection_takes_fail_edge() {
    let workflow = with_approval().build().expect("valid workflow");

    let mut journal = Journal::new("rejection");
    let suspended = workflow.run(&mut journal).await.expect("persisted");
    let id = suspended.executing_activities[0].id;

    let resumed = workflow
        .resume(&mut journal, id, json!({ "approved": false }))
        .await
        .expect("persisted");

    assert_eq!(resumed.state, WorkflowState::Failed);
    assert_eq!(journal.log, vec!["1", "2", "rejected"]);
}

#[tokio::test]
async fn test_resume_with_unknown_id_leaves_graph_untouched() {
    let workflow = with_approval().build().expect("valid workflow");

    let mut journal = Journal::new("unknown-id");
    let suspended = workflow.run(&mut journal).await.expect("persisted");

    let bogus = Uuid::new_v4();
    let execution = workflow
        .resume(&mut journal, bogus, json!({ "approved": true }))
        .await
        .expect("persisted");

    assert_eq!(execution.state, WorkflowState::Corrupted);
    assert_eq!(
        execution.error,
        Some(format!(
            "Failed to resume. Provided activity execution id '{bogus}' not found"
        ))
    );
    assert_eq!(execution.executing_activities, suspended.executing_activities);
    assert_eq!(journal.log, vec!["1", "2"]);
}

#[tokio::test]
async fn test_resume_from_and_resume_after() {
    let workflow = with_approval().build().expect("valid workflow");

    let mut journal = Journal::new("overrides");
    let first = workflow.run(&mut journal).await.expect("persisted");

    let again = workflow
        .resume_from(&mut journal, "2", Some(json!("77")))
        .await
        .expect("persisted");
    assert_eq!(again.state, WorkflowState::InProgress);
    assert_eq!(journal.log, vec!["1", "2", "77"]);
    assert_eq!(again.executing_activities.len(), 1);
    assert_ne!(again.executing_activities[0].id, first.executing_activities[0].id);

    let done = workflow
        .resume_after_with(&mut journal, "approval", json!("waived"))
        .await
        .expect("persisted");
    assert_eq!(done.state, WorkflowState::Complete);
    assert!(done.executing_activities.is_empty());
    assert_eq!(journal.log, vec!["1", "2", "77", "waived", "4"]);
}

#[tokio::test]
async fn test_resume_from_provider() {
    let workflow = straight().build().expect("valid workflow");
    let mut journal = Journal::new("provider");
    workflow.run(&mut journal).await.expect("persisted");

    let calls = AtomicUsize::new(0);
    let provider = || -> Option<Value> {
        calls.fetch_add(1, Ordering::SeqCst);
        Some(json!("provided"))
    };
    let execution = workflow
        .resume_from_provider(&mut journal, "node1", &provider)
        .await
        .expect("persisted");

    assert_eq!(execution.state, WorkflowState::Complete);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(journal.log, vec!["node1", "node2", "provided", "node2"]);

    // no value keeps the node's own input
    let nothing = || -> Option<Value> { None };
    let provider: &dyn InputProvider = &nothing;
    workflow
        .resume_from_provider(&mut journal, "node2", provider)
        .await
        .expect("persisted");
    assert_eq!(journal.log.last().map(String::as_str), Some("node2"));
}

#[tokio::test]
async fn test_resume_from_with_mismatched_input_corrupts() {
    let workflow = straight().build().expect("valid workflow");
    let mut journal = Journal::new("mismatch");
    workflow.run(&mut journal).await.expect("persisted");

    let execution = workflow
        .resume_from(&mut journal, "node1", Some(json!({ "not": "a string" })))
        .await
        .expect("persisted");

    assert_eq!(execution.state, WorkflowState::Corrupted);
    assert!(execution
        .error
        .as_deref()
        .is_some_and(|e| e.starts_with("Activity 'Append' failed in node 'node1'")));
}

#[tokio::test]
async fn test_observer_sees_every_visit() {
    let observer = Arc::new(RecordingObserver::default());
    let workflow = straight()
        .observer(observer.clone())
        .build()
        .expect("valid workflow");

    let mut journal = Journal::new("observed");
    workflow.run(&mut journal).await.expect("persisted");

    assert_eq!(
        observer.events(),
        vec![
            "started start (start) -",
            "finished start (start) -",
            "started node1 (Append) \"node1\"",
            "finished node1 (Append) \"node1\"",
            "started node2 (Append) \"node2\"",
            "finished node2 (Append) \"node2\"",
            "started end (end) -",
            "finished end (end) -",
        ]
    );
}

#[tokio::test]
async fn test_observer_sees_fake_start_and_failures() {
    let observer = Arc::new(RecordingObserver::default());
    let workflow = with_approval()
        .observer(observer.clone())
        .build()
        .expect("valid workflow");

    let mut journal = Journal::new("fake");
    workflow.run(&mut journal).await.expect("persisted");
    observer.events.lock().unwrap().clear();

    workflow
        .resume_after_with(&mut journal, "approval", json!("waived"))
        .await
        .expect("persisted");

    let events = observer.events();
    assert_eq!(events[0], "started approval (Approval [FAKE]) -");
    assert_eq!(events[1], "finished approval (Approval) \"waived\"");
}

#[tokio::test]
async fn test_input_failure_is_observed_and_recorded() {
    let observer = Arc::new(RecordingObserver::default());
    let workflow = base()
        .node("node1")
        .activity(
            "node1",
            ActivitySlot::<Journal, Append>::try_new("Append", |_: &Journal| {
                Err(ActivityError::input("FAIL!!!"))
            }),
        )
        .on_success("start", "node1")
        .on_success("node1", "end")
        .observer(observer.clone())
        .build()
        .expect("valid workflow");

    let mut journal = Journal::new("input");
    let execution = workflow.run(&mut journal).await.expect("persisted");

    assert_eq!(execution.state, WorkflowState::Corrupted);
    assert_eq!(
        execution.error.as_deref(),
        Some("Activity 'Append' failed in node 'node1': FAIL!!!")
    );
    assert!(observer
        .events()
        .contains(&"started node1 (Append) \"Failed to get activity input: FAIL!!!\"".to_string()));
}

#[tokio::test]
async fn test_unregistered_activity_corrupts() {
    let workflow = base()
        .node("node1")
        .activity("node1", ActivitySlot::<Journal, Append>::new("Missing", |_| String::new()))
        .on_success("start", "node1")
        .on_success("node1", "end")
        .build()
        .expect("valid workflow");

    let mut journal = Journal::new("unregistered");
    let execution = workflow.run(&mut journal).await.expect("persisted");

    assert_eq!(execution.state, WorkflowState::Corrupted);
    assert_eq!(
        execution.error.as_deref(),
        Some("Activity 'Missing' failed in node 'node1': Activity type 'Missing' is not registered")
    );
}

#[tokio::test]
async fn test_transition_limit_stops_cycles() {
    let workflow = base()
        .node("node1")
        .activity("node1", append("tick"))
        .on_success("start", "node1")
        .on_success("node1", "node1")
        .max_transitions(10)
        .build()
        .expect("valid workflow");

    let mut journal = Journal::new("cycle");
    let execution = workflow.run(&mut journal).await.expect("persisted");

    assert_eq!(execution.state, WorkflowState::Corrupted);
    assert_eq!(
        execution.error.as_deref(),
        Some("Transition limit of 10 exceeded")
    );
    assert_eq!(journal.log.len(), 10);
}

#[tokio::test]
async fn test_json_file_persister_resumes_in_new_instance() {
    let dir = tempfile::tempdir().expect("temp dir");
    let build = || {
        with_approval()
            .persister(Arc::new(JsonFilePersister::new(
                dir.path(),
                |journal: &Journal| journal.id.clone(),
            )))
            .build()
            .expect("valid workflow")
    };

    let mut journal = Journal::new("durable");
    let suspended = build().run(&mut journal).await.expect("persisted");
    assert!(dir.path().join("durable.json").exists());

    let id = suspended.executing_activities[0].id;
    let resumed = build()
        .resume(&mut journal, id, json!({ "approved": true }))
        .await
        .expect("persisted");

    assert_eq!(resumed.state, WorkflowState::Complete);
    assert_eq!(journal.log, vec!["1", "2", "approved", "4"]);
}

#[tokio::test]
async fn test_missing_execution_is_an_error() {
    let workflow = with_approval().build().expect("valid workflow");
    let mut journal = Journal::new("never-ran");

    let result = workflow
        .resume(&mut journal, Uuid::new_v4(), Value::Null)
        .await;

    assert_eq!(
        result.unwrap_err().to_string(),
        "Persistence failed: No execution persisted for 'never-ran'"
    );
}

#[tokio::test]
async fn test_graphviz_output() {
    let workflow = with_approval().build().expect("valid workflow");
    let dot = workflow.to_graphviz();

    assert!(dot.starts_with("digraph {\ngraph [ resolution=64];\n"));
    assert!(dot.contains("\"start\" [label=\"start\", shape=ellipse, style=filled,fillcolor=\"yellow\"]"));
    assert!(dot.contains("\"approval decision\"->\"4\"  [label=\"\"]"));
    assert!(dot.contains("\"approval fail\" [label=\"fail\",style=filled,fillcolor=\"red\"]"));
    assert!(dot.ends_with("\n}"));
}
