//! Survey Admin Lambda - Handles survey authoring and results for the admin UI.
//!
//! One endpoint, `POST` with `{ "operation": ..., "data": ... }`:
//! - create / update - Upsert a survey definition, generating its id if needed
//! - list - All survey definitions
//! - delete - Remove a survey definition
//! - results - Results collected for one survey (records, CSV or score summary)

use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::http::{error_response, json_response, preflight_response};
use shared::report::{filter_by_window, score_distribution, to_csv};
use shared::{
    codec, extract_user_from_context, scan_all, validate_token, AdminUser, ApiResponse, Config,
    DynamoStore, ScanFilter, SurveyDefinition, SurveyResult, TableStore,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use validator::Validate;

/// Primary key of the survey configuration table
const SURVEY_KEY: &str = "surveyId";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    /// Also serves `update`; both are upserts
    Create,
    List,
    Delete,
    Results,
}

impl Operation {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "create" | "update" => Some(Self::Create),
            "list" => Some(Self::List),
            "delete" => Some(Self::Delete),
            "results" => Some(Self::Results),
            _ => None,
        }
    }
}

/// Request envelope
#[derive(Debug, Deserialize)]
struct AdminRequest {
    #[serde(default)]
    operation: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// `data` of a delete request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SurveyRef {
    #[serde(default)]
    survey_id: String,
}

/// `data` of a results request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultsQuery {
    #[serde(default)]
    survey_id: String,
    /// Earliest capture time, epoch seconds
    from: Option<i64>,
    /// Latest capture time, epoch seconds
    to: Option<i64>,
    #[serde(default)]
    format: ResultsFormat,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ResultsFormat {
    #[default]
    Records,
    Csv,
    Summary,
}

/// Survey definition as listed to the UI
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SurveyListing {
    #[serde(flatten)]
    survey: SurveyDefinition,
    question_count: usize,
}

/// Score counts for one question
#[derive(Debug, Serialize)]
struct QuestionSummary {
    question: usize,
    text: String,
    scores: Vec<ScoreCount>,
}

#[derive(Debug, Serialize)]
struct ScoreCount {
    score: i64,
    count: usize,
}

/// Application state
struct AppState {
    store: Arc<dyn TableStore>,
    config: Config,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let dynamo_client = aws_sdk_dynamodb::Client::new(&aws_config);

        let config = Config::from_env();
        config.config_table()?;
        config.results_table()?;

        Ok(Self {
            store: Arc::new(DynamoStore::new(dynamo_client)),
            config,
        })
    }
}

/// Identify the caller from the Cognito authorizer claims, or from the
/// identity token when the request did not pass through an authorizer.
fn authenticate(event: &Request) -> shared::Result<AdminUser> {
    let claims = event
        .request_context_ref()
        .and_then(|ctx| ctx.authorizer())
        .and_then(|authorizer| authorizer.fields.get("claims"));

    if let Some(claims) = claims {
        return extract_user_from_context(claims);
    }

    let token = event
        .headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| shared::Error::Auth("Missing Authorization header".to_string()))?;

    validate_token(token)
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str();

    if method == "OPTIONS" {
        return preflight_response();
    }

    let user = match authenticate(&event) {
        Ok(user) => user,
        Err(e) => {
            warn!("Rejected request: {}", e);
            return error_response(401, "Authentication required");
        }
    };

    if method != "POST" {
        return error_response(400, "Unsupported operation.");
    }

    let request: AdminRequest = match serde_json::from_slice(event.body().as_ref()) {
        Ok(request) => request,
        Err(e) => {
            warn!("Invalid request body: {}", e);
            return error_response(400, "Body is not valid JSON");
        }
    };

    let name = match request.operation.as_deref() {
        Some(name) => name,
        None => return error_response(400, "No operation specified"),
    };

    let operation = match Operation::parse(name) {
        Some(operation) => operation,
        None => return error_response(400, "Unsupported operation."),
    };

    info!(operation = name, user_id = %user.user_id, "Processing survey operation");

    let result = match operation {
        Operation::Create => create_survey(&state, request.data).await,
        Operation::List => list_surveys(&state).await,
        Operation::Delete => delete_survey(&state, request.data).await,
        Operation::Results => survey_results(&state, request.data).await,
    };

    match result {
        Ok(Some(data)) => json_response(200, &ApiResponse::success(data)),
        Ok(None) => json_response(200, &ApiResponse::ok()),
        Err(e @ shared::Error::Validation(_)) | Err(e @ shared::Error::NotFound(_)) => {
            warn!(operation = name, "Rejected: {}", e);
            error_response(e.status_code(), e.to_string())
        }
        Err(e) => {
            error!(operation = name, "Operation failed: {}", e);
            error_response(e.status_code(), "Something went wrong.")
        }
    }
}

/// Parse the `data` member of the envelope.
fn parse_data<T: serde::de::DeserializeOwned>(data: Option<Value>) -> shared::Result<T> {
    let data = data.ok_or_else(|| shared::Error::Validation("Missing data".to_string()))?;
    serde_json::from_value(data)
        .map_err(|e| shared::Error::Validation(format!("Invalid data: {}", e)))
}

async fn create_survey(state: &AppState, data: Option<Value>) -> shared::Result<Option<Value>> {
    let mut survey: SurveyDefinition = parse_data(data)?;
    survey.validate()?;

    if survey.survey_id.trim().is_empty() {
        survey.survey_id = Uuid::new_v4().to_string();
    }

    state
        .store
        .put_item(state.config.config_table()?, codec::encode(&survey))
        .await?;

    info!(
        survey_id = %survey.survey_id,
        questions = survey.question_count(),
        "Saved survey"
    );

    Ok(Some(Value::String(survey.survey_id)))
}

async fn list_surveys(state: &AppState) -> shared::Result<Option<Value>> {
    let records = scan_all(state.store.as_ref(), state.config.config_table()?, None).await?;

    let surveys: Vec<SurveyListing> = records
        .iter()
        .filter_map(|record| match codec::decode(record) {
            Ok(survey) => Some(SurveyListing {
                question_count: survey.question_count(),
                survey,
            }),
            Err(e) => {
                warn!(
                    survey_id = %codec::text(record.get(SURVEY_KEY)),
                    "Skipping unreadable survey: {}",
                    e
                );
                None
            }
        })
        .collect();

    Ok(Some(serde_json::to_value(surveys)?))
}

async fn delete_survey(state: &AppState, data: Option<Value>) -> shared::Result<Option<Value>> {
    let target: SurveyRef = parse_data(data)?;
    if target.survey_id.trim().is_empty() {
        return Err(shared::Error::Validation("surveyId is required".to_string()));
    }

    state
        .store
        .delete_item(state.config.config_table()?, SURVEY_KEY, &target.survey_id)
        .await?;

    info!(survey_id = %target.survey_id, "Deleted survey");
    Ok(None)
}

async fn survey_results(state: &AppState, data: Option<Value>) -> shared::Result<Option<Value>> {
    let query: ResultsQuery = parse_data(data)?;
    if query.survey_id.trim().is_empty() {
        return Err(shared::Error::Validation("surveyId is required".to_string()));
    }

    let filter = ScanFilter::eq(SURVEY_KEY, query.survey_id.as_str());
    let records = scan_all(
        state.store.as_ref(),
        state.config.results_table()?,
        Some(&filter),
    )
    .await?;

    let results: Vec<SurveyResult> = records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(Value::Object(record)) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(survey_id = %query.survey_id, "Skipping unreadable result: {}", e);
                None
            }
        })
        .collect();
    let results = filter_by_window(results, query.from, query.to);

    info!(
        survey_id = %query.survey_id,
        count = results.len(),
        "Fetched survey results"
    );

    match query.format {
        ResultsFormat::Records => Ok(Some(serde_json::to_value(results)?)),
        ResultsFormat::Csv => Ok(Some(Value::String(to_csv(&results)?))),
        ResultsFormat::Summary => {
            let record = state
                .store
                .get_item(state.config.config_table()?, SURVEY_KEY, &query.survey_id)
                .await?
                .ok_or_else(|| {
                    shared::Error::NotFound(format!("Survey {}", query.survey_id))
                })?;
            let survey = codec::decode(&record)?;

            let summary: Vec<QuestionSummary> = survey
                .questions
                .iter()
                .enumerate()
                .map(|(i, text)| QuestionSummary {
                    question: i + 1,
                    text: text.clone(),
                    scores: score_distribution(&results, i + 1, survey.min, survey.max)
                        .into_iter()
                        .map(|(score, count)| ScoreCount { score, count })
                        .collect(),
                })
                .collect();

            Ok(Some(serde_json::to_value(summary)?))
        }
    }
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
