//! Review Flags Lambda - Opens a follow-up task when survey answers are flagged.
//!
//! Answers come from the `survey_result_{n}` contact attributes and thresholds
//! from the `flag_question_{n}` parameters. Task failures are logged; the
//! contact flow always gets a 200.

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use shared::review::flagged_answers;
use shared::{
    Config, ConnectTaskService, ContactFlowEvent, ContactFlowResponse, ReviewTask, TaskService,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

struct AppState {
    tasks: Arc<dyn TaskService>,
    contact_flow_id: String,
    instance_name: String,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let connect_client = aws_sdk_connect::Client::new(&aws_config);

        let config = Config::from_env();

        Ok(Self {
            tasks: Arc::new(ConnectTaskService::new(connect_client)),
            contact_flow_id: config.contact_flow_id()?.to_string(),
            instance_name: config.instance_name()?.to_string(),
        })
    }
}

async fn review_flags(state: &AppState, event: &ContactFlowEvent) -> ContactFlowResponse {
    let contact_id = event.details.contact_data.contact_id.as_str();
    let flagged = flagged_answers(
        &event.details.contact_data.attributes,
        &event.details.parameters,
    );

    if !flagged.is_empty() {
        info!(contact_id, flagged = flagged.len(), "Survey answers flagged for review");

        let task = ReviewTask::for_contact(
            event,
            &flagged,
            &state.contact_flow_id,
            &state.instance_name,
        );
        match task {
            Ok(task) => match state.tasks.start_task(&task).await {
                Ok(task_id) => info!(contact_id, task_id = %task_id, "Started review task"),
                Err(e) => error!(contact_id, "Failed to start review task: {}", e),
            },
            Err(e) => error!(contact_id, "Failed to build review task: {}", e),
        }
    }

    let mut response = ContactFlowResponse::new();
    response.insert("statusCode".to_string(), "200".to_string());
    response.insert("body".to_string(), "OK".to_string());
    response.insert("flaggedCount".to_string(), flagged.len().to_string());
    response
}

async fn handler(
    state: Arc<AppState>,
    event: LambdaEvent<ContactFlowEvent>,
) -> Result<ContactFlowResponse, Error> {
    Ok(review_flags(&state, &event.payload).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
