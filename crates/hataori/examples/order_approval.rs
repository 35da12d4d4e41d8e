//! Order approval that suspends for a manager decision.
//!
//! Demonstrates:
//! - Typed activities bound to nodes through slots
//! - Suspending on a pending activity and resuming with a closure payload
//! - Branching on success and failure
//! - Rendering the graph as Graphviz and yUML

use async_trait::async_trait;
use hataori::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Order {
    id: String,
    amount: u64,
    validated: bool,
    approver: Option<String>,
    rejection: Option<String>,
    tracking_number: Option<String>,
}

type Validate = DelegateActivity<u64, bool>;
type Ship = DelegateActivity<String, String>;

/// Waits for a manager; resumed with `{"approver": "...", "approved": bool}`.
#[derive(Debug, Default)]
struct ManagerApproval;

#[async_trait]
impl Activity for ManagerApproval {
    type Input = u64;
    type Output = String;
    type FailOutput = String;

    async fn execute(
        &self,
        execution_id: Uuid,
        amount: u64,
        _sink: &mut OutputSink<String, String>,
    ) -> Result<ActivityResult, ActivityError> {
        println!("Approval {execution_id} requested for amount {amount}");
        Ok(ActivityResult::Pending)
    }

    async fn resume(
        &self,
        _execution_id: Uuid,
        sink: &mut OutputSink<String, String>,
        closure: &Value,
    ) -> Result<ActivityResult, ActivityError> {
        let approver = closure["approver"]
            .as_str()
            .ok_or_else(|| ActivityError::other("approver missing"))?
            .to_string();
        if closure["approved"].as_bool().unwrap_or(false) {
            sink.success(approver);
            Ok(ActivityResult::Succeeded)
        } else {
            sink.fail(format!("rejected by {approver}"));
            Ok(ActivityResult::Failed)
        }
    }
}

fn build(persister: Arc<InMemoryPersister<Order>>) -> Result<Workflow<Order>, WorkflowError> {
    let registry = ActivityRegistry::new()
        .with("Validate", || {
            Validate::new(|amount: u64| {
                if amount == 0 {
                    Err("empty order")
                } else {
                    Ok(true)
                }
            })
        })
        .with("Ship", || {
            Ship::new(|id: String| Ok::<_, String>(format!("TRACK-{id}")))
        })
        .with_default::<ManagerApproval>("ManagerApproval");

    Workflow::builder()
        .name("order-approval")
        .node("validate")
        .node_with_aliases("approve", &["approval"])
        .node("ship")
        .activity(
            "validate",
            ActivitySlot::<Order, Validate>::new("Validate", |order| order.amount)
                .process_output(|order, valid| order.validated = valid)
                .process_fail_output(|order, reason| order.rejection = Some(reason)),
        )
        .activity(
            "approve",
            ActivitySlot::<Order, ManagerApproval>::new("ManagerApproval", |order| order.amount)
                .process_output(|order, approver| order.approver = Some(approver))
                .process_fail_output(|order, reason| order.rejection = Some(reason)),
        )
        .activity(
            "ship",
            ActivitySlot::<Order, Ship>::new("Ship", |order| order.id.clone())
                .process_output(|order, tracking| order.tracking_number = Some(tracking)),
        )
        .on_success("start", "validate")
        .on_success("validate", "approve")
        .on_fail("validate", "fail")
        .on_success("approve", "ship")
        .on_fail("approve", "fail")
        .on_success("ship", "end")
        .factory(Arc::new(registry))
        .persister(persister)
        .max_transitions(32)
        .build()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let persister = Arc::new(InMemoryPersister::new(|order: &Order| order.id.clone()));
    let workflow = build(persister.clone())?;

    println!("=== Order approval ===\n");
    println!("{}\n", workflow.to_graphviz());
    println!("{}\n", workflow.to_yuml_activity());

    let mut order = Order {
        id: "A-1001".to_string(),
        amount: 250,
        ..Order::default()
    };

    let execution = workflow.run(&mut order).await?;
    println!("After run: {}", execution.state);

    let Some(pending) = execution.executing_activities.first() else {
        eprintln!("Nothing to approve: {:?}", execution.error);
        std::process::exit(1);
    };
    println!("Waiting on node '{}' ({})", pending.node, pending.id);

    let execution = workflow
        .resume(
            &mut order,
            pending.id,
            json!({ "approver": "m.tanaka", "approved": true }),
        )
        .await?;

    match execution.state {
        WorkflowState::Complete => println!(
            "Order {} approved by {:?}, tracking {:?}",
            order.id, order.approver, order.tracking_number
        ),
        WorkflowState::Failed => println!("Order {} rejected: {:?}", order.id, order.rejection),
        state => {
            eprintln!("Order {} ended {}: {:?}", order.id, state, execution.error);
            std::process::exit(1);
        }
    }

    Ok(())
}
