//! Survey Config Lambda - Looks up a survey definition for a contact flow.
//!
//! Parameters: `surveyId`. Returns every stored attribute as a string plus
//! `surveySize` (number of questions), `statusCode` and `message`, which is
//! `OK` on a hit.

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use shared::codec;
use shared::{Config, ContactFlowEvent, ContactFlowResponse, DynamoStore, TableStore};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const SURVEY_KEY: &str = "surveyId";

struct AppState {
    store: Arc<dyn TableStore>,
    table: String,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let dynamo_client = aws_sdk_dynamodb::Client::new(&aws_config);
        let table = Config::from_env().config_table()?.to_string();

        Ok(Self {
            store: Arc::new(DynamoStore::new(dynamo_client)),
            table,
        })
    }
}

fn not_found(survey_id: &str) -> String {
    format!("Couldn't find configuration for survey with id [{}]", survey_id)
}

fn status_ok(response: &mut ContactFlowResponse) {
    response.insert("statusCode".to_string(), "200".to_string());
}

async fn survey_config(state: &AppState, event: &ContactFlowEvent) -> ContactFlowResponse {
    let mut response = ContactFlowResponse::new();
    let survey_id = event.parameter(SURVEY_KEY).unwrap_or_default();

    if survey_id.is_empty() {
        status_ok(&mut response);
        response.insert("message".to_string(), not_found(survey_id));
        return response;
    }

    let record = match state.store.get_item(&state.table, SURVEY_KEY, survey_id).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            info!(survey_id, "Survey not found");
            status_ok(&mut response);
            response.insert("message".to_string(), not_found(survey_id));
            return response;
        }
        Err(e) => {
            error!(survey_id, "Failed to load survey: {}", e);
            return response;
        }
    };

    // Stored keys go out untouched so question numbering survives.
    for (key, value) in &record {
        response.insert(key.clone(), codec::text(Some(value)));
    }

    let survey_size = codec::sorted_keys(&record, codec::QUESTION_PREFIX).len();
    response.insert("surveySize".to_string(), survey_size.to_string());
    response.insert("message".to_string(), "OK".to_string());
    status_ok(&mut response);

    response
}

async fn handler(
    state: Arc<AppState>,
    event: LambdaEvent<ContactFlowEvent>,
) -> Result<ContactFlowResponse, Error> {
    Ok(survey_config(&state, &event.payload).await)
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::{MemoryStore, SurveyDefinition, NO_FLAG};

    const TABLE: &str = "surveys-config";

    async fn state_with_survey() -> AppState {
        let store = MemoryStore::new().with_table(TABLE, SURVEY_KEY);
        let survey = SurveyDefinition {
            survey_id: "survey-1".to_string(),
            survey_name: "CSAT".to_string(),
            intro_prompt: "Hello".to_string(),
            outro_prompt: "Bye".to_string(),
            min: 1,
            max: 5,
            questions: vec!["How was it?".to_string(), "Would you call again?".to_string()],
            flags: vec![2, NO_FLAG],
        };
        store.put_item(TABLE, codec::encode(&survey)).await.unwrap();

        AppState {
            store: Arc::new(store),
            table: TABLE.to_string(),
        }
    }

    fn event(survey_id: &str) -> ContactFlowEvent {
        let mut event = ContactFlowEvent::default();
        event
            .details
            .parameters
            .insert("surveyId".to_string(), survey_id.to_string());
        event
    }

    #[tokio::test]
    async fn test_found_survey_is_flattened() {
        let state = state_with_survey().await;
        let response = survey_config(&state, &event("survey-1")).await;

        assert_eq!(response["message"], "OK");
        assert_eq!(response["surveySize"], "2");
        assert_eq!(response["surveyName"], "CSAT");
        assert_eq!(response["min"], "1");
        assert_eq!(response["max"], "5");
        assert_eq!(response["question_1"], "How was it?");
        assert_eq!(response["question_2"], "Would you call again?");
        assert_eq!(response["flag_question_1"], "2");
        assert_eq!(response["flag_question_2"], "-1");
        assert_eq!(response["statusCode"], "200");
    }

    #[tokio::test]
    async fn test_missing_survey_reports_message() {
        let state = state_with_survey().await;
        let response = survey_config(&state, &event("nope")).await;

        assert_eq!(
            response["message"],
            "Couldn't find configuration for survey with id [nope]"
        );
        assert!(!response.contains_key("surveySize"));
        assert_eq!(response["statusCode"], "200");
    }

    #[tokio::test]
    async fn test_store_failure_returns_empty_mapping() {
        let state = AppState {
            store: Arc::new(MemoryStore::new()),
            table: TABLE.to_string(),
        };
        assert!(survey_config(&state, &event("survey-1")).await.is_empty());
    }

    #[tokio::test]
    async fn test_long_survey_keeps_stored_numbering() {
        let store = MemoryStore::new().with_table(TABLE, SURVEY_KEY);
        let mut record = shared::Record::new();
        record.insert("surveyId".to_string(), json!("long"));
        record.insert("surveyType".to_string(), json!("csat"));
        for n in 1..=10 {
            record.insert(codec::question_key(n), json!(format!("Q{}", n)));
            record.insert(codec::flag_key(n), json!(NO_FLAG));
        }
        record.insert(codec::flag_key(10), json!(4));
        store.put_item(TABLE, record).await.unwrap();

        let state = AppState {
            store: Arc::new(store),
            table: TABLE.to_string(),
        };
        let response = survey_config(&state, &event("long")).await;

        assert_eq!(response["message"], "OK");
        assert_eq!(response["surveySize"], "10");
        assert_eq!(response["question_2"], "Q2");
        assert_eq!(response["question_10"], "Q10");
        assert_eq!(response["flag_question_2"], "-1");
        assert_eq!(response["flag_question_10"], "4");
        assert_eq!(response["surveyType"], "csat");
    }
}
