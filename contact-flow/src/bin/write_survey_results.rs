//! Survey Results Lambda - Stores the answers captured during a contact.
//!
//! Every `survey_result_*` contact attribute is written, together with the
//! survey id, contact id and capture time, as one record keyed by contact id.

use chrono::Utc;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;
use shared::{
    Config, ContactFlowEvent, ContactFlowResponse, DynamoStore, SurveyResult, TableStore,
    RESULT_PREFIX,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

struct AppState {
    store: Arc<dyn TableStore>,
    table: String,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let dynamo_client = aws_sdk_dynamodb::Client::new(&aws_config);
        let table = Config::from_env().results_table()?.to_string();

        Ok(Self {
            store: Arc::new(DynamoStore::new(dynamo_client)),
            table,
        })
    }
}

/// Collect the contact's answers into a result captured at `timestamp`.
fn result_for_contact(event: &ContactFlowEvent, timestamp: i64) -> SurveyResult {
    let answers = event
        .details
        .contact_data
        .attributes
        .iter()
        .filter(|(key, _)| key.starts_with(RESULT_PREFIX))
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect();

    SurveyResult {
        contact_id: event.details.contact_data.contact_id.clone(),
        survey_id: event.attribute("surveyId").unwrap_or_default().to_string(),
        timestamp,
        answers,
    }
}

async fn write_results(
    state: &AppState,
    event: &ContactFlowEvent,
    timestamp: i64,
) -> ContactFlowResponse {
    let result = result_for_contact(event, timestamp);

    let stored = match result.to_record() {
        Ok(record) => state.store.put_item(&state.table, record).await,
        Err(e) => Err(e),
    };

    match stored {
        Ok(()) => info!(
            contact_id = %result.contact_id,
            survey_id = %result.survey_id,
            answers = result.answers.len(),
            "Stored survey results"
        ),
        Err(e) => error!(contact_id = %result.contact_id, "Failed to store survey results: {}", e),
    }

    let mut response = ContactFlowResponse::new();
    response.insert("statusCode".to_string(), "200".to_string());
    response.insert("body".to_string(), "OK".to_string());
    response
}

async fn handler(
    state: Arc<AppState>,
    event: LambdaEvent<ContactFlowEvent>,
) -> Result<ContactFlowResponse, Error> {
    Ok(write_results(&state, &event.payload, Utc::now().timestamp()).await)
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
