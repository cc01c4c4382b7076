//! Runs the GitLab steps against fixture data and prints the resulting graph.
//!
//! ```text
//! RUST_LOG=jobgraph=debug cargo run --example gitlab_approvals
//! ```

use jobgraph::client::DetailKind;
use jobgraph::prelude::*;
use serde_json::json;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let client = InMemoryClient::new()
        .with_page_size(2)
        .with_latency(Duration::from_millis(20))
        .with_account(json!({ "id": 1, "name": "Admin", "username": "root" }))
        .with_collection(
            ResourceKind::Users,
            vec![
                json!({ "id": 7, "name": "Grace", "username": "grace", "state": "active" }),
                json!({ "id": 9, "name": "Linus", "username": "linus", "state": "active" }),
                json!({ "id": 11, "name": "Ada", "username": "ada", "state": "blocked" }),
            ],
        )
        .with_collection(
            ResourceKind::Projects,
            vec![json!({
                "id": 5, "name": "api", "path_with_namespace": "platform/api",
                "visibility": "private", "created_at": "2019-03-01T12:00:00Z"
            })],
        )
        .with_collection(
            ResourceKind::MergeRequests,
            vec![
                json!({ "id": 503, "iid": 3, "project_id": 5, "title": "Fix login", "state": "merged" }),
                json!({ "id": 504, "iid": 4, "project_id": 5, "title": "Add docs", "state": "opened" }),
            ],
        )
        .with_detail(
            DetailKind::MergeRequestApprovals,
            5,
            3,
            json!({
                "approved": true,
                "approved_by": [{ "user": { "id": 7 } }, { "user": { "id": 9 } }]
            }),
        )
        .with_detail(
            DetailKind::MergeRequestApprovals,
            5,
            4,
            json!({ "approved": false, "approved_by": [] }),
        )
        .with_transient_failures(DetailKind::MergeRequestApprovals, 5, 4, 1);

    let config = ExecutorConfig::default()
        .with_max_concurrent_requests(2)
        .with_retry_policy(RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
        });
    let client = RetryingClient::new(client, config.retry_policy);

    let executor = Executor::new(config);
    let steps = integration::steps();
    println!("{}", executor.plan(&steps)?.to_dot());

    let state = Arc::new(InMemoryJobState::new());
    let summary = executor
        .run(&steps, state.clone(), Arc::new(client))
        .await?;

    for outcome in &summary.steps {
        println!(
            "{:<50} {:?}: {} entities, {} relationships in {:?}",
            outcome.step_id.as_str(),
            outcome.status,
            outcome.entities_added,
            outcome.relationships_added,
            outcome.duration
        );
    }

    for rel in state.iter_relationships(integration::USER_APPROVED_MERGE_REQUEST_TYPE) {
        println!("{} -[{}]-> {}", rel.from_key(), rel.class(), rel.to_key());
    }

    Ok(())
}
