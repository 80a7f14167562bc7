//! Flag evaluation and follow-up review tasks in Amazon Connect.

use std::collections::BTreeMap;

use async_trait::async_trait;
use aws_sdk_connect::types::{Reference, ReferenceType};
use aws_sdk_connect::Client as ConnectClient;
use uuid::Uuid;

use crate::codec::flag_key;
use crate::models::{ContactFlowEvent, NO_FLAG, RESULT_PREFIX};
use crate::{Error, Result};

pub const TASK_NAME: &str = "Flagged Post Call Survey";

/// An answer at or below its question's threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlaggedAnswer {
    /// 1-based question number
    pub question: usize,
    pub answer: i64,
    pub threshold: i64,
}

/// Parse a threshold parameter; blank, malformed and sentinel values mean none.
pub fn parse_threshold(raw: Option<&str>) -> Option<i64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
        .filter(|threshold| *threshold != NO_FLAG)
}

pub fn is_flagged(answer: i64, threshold: Option<i64>) -> bool {
    threshold.is_some_and(|threshold| answer <= threshold)
}

/// Compare every captured answer against the threshold configured for the
/// same question number.
///
/// Answers live in `survey_result_{n}` contact attributes and thresholds in
/// `flag_question_{n}` parameters. Results are ordered by question number.
pub fn flagged_answers(
    attributes: &BTreeMap<String, String>,
    parameters: &BTreeMap<String, String>,
) -> Vec<FlaggedAnswer> {
    let mut flagged: Vec<FlaggedAnswer> = attributes
        .iter()
        .filter_map(|(key, value)| {
            let question: usize = key.strip_prefix(RESULT_PREFIX)?.parse().ok()?;
            let answer: i64 = value.trim().parse().ok()?;
            let threshold =
                parse_threshold(parameters.get(&flag_key(question)).map(String::as_str));

            is_flagged(answer, threshold).then(|| FlaggedAnswer {
                question,
                answer,
                threshold: threshold.unwrap_or(NO_FLAG),
            })
        })
        .collect();

    flagged.sort_by_key(|f| f.question);
    flagged
}

/// Human-readable summary, one line per flagged answer.
pub fn describe(flagged: &[FlaggedAnswer]) -> String {
    flagged
        .iter()
        .map(|f| format!("Question {}: {}\n", f.question, f.answer))
        .collect()
}

/// Instance id is the last path segment of the instance ARN.
pub fn instance_id_from_arn(arn: &str) -> Result<&str> {
    match arn.rsplit_once('/') {
        Some((_, id)) if !id.is_empty() => Ok(id),
        _ => Err(Error::Validation(format!("Invalid instance ARN: {:?}", arn))),
    }
}

/// Task asking an agent to follow up on a flagged survey.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewTask {
    pub instance_id: String,
    pub contact_flow_id: String,
    pub name: String,
    pub description: String,
    pub attributes: BTreeMap<String, String>,
    /// Idempotency token for the task API
    pub client_token: String,
    /// Link to the contact trace record of the surveyed contact
    pub trace_record_url: String,
}

impl ReviewTask {
    pub fn for_contact(
        event: &ContactFlowEvent,
        flagged: &[FlaggedAnswer],
        contact_flow_id: &str,
        instance_name: &str,
    ) -> Result<Self> {
        let contact = &event.details.contact_data;
        let instance_id = instance_id_from_arn(&contact.instance_arn)?;

        let mut attributes = BTreeMap::new();
        attributes.insert(
            "surveyId".to_string(),
            event.attribute("surveyId").unwrap_or_default().to_string(),
        );
        attributes.insert("contactId".to_string(), contact.contact_id.clone());

        Ok(Self {
            instance_id: instance_id.to_string(),
            contact_flow_id: contact_flow_id.to_string(),
            name: TASK_NAME.to_string(),
            description: describe(flagged),
            attributes,
            client_token: Uuid::new_v4().to_string(),
            trace_record_url: format!(
                "https://{}.my.connect.aws/contact-trace-records/details/{}",
                instance_name, contact.contact_id
            ),
        })
    }
}

/// Creates follow-up tasks in the contact center.
#[async_trait]
pub trait TaskService: Send + Sync {
    /// Start a task, returning the new task contact's id.
    async fn start_task(&self, task: &ReviewTask) -> Result<String>;
}

/// `TaskService` over the Amazon Connect API.
pub struct ConnectTaskService {
    client: ConnectClient,
}

impl ConnectTaskService {
    pub fn new(client: ConnectClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TaskService for ConnectTaskService {
    async fn start_task(&self, task: &ReviewTask) -> Result<String> {
        let reference = Reference::builder()
            .r#type(ReferenceType::Url)
            .value(&task.trace_record_url)
            .build()
            .map_err(|e| Error::Upstream(format!("Failed to build task reference: {}", e)))?;

        let mut request = self
            .client
            .start_task_contact()
            .instance_id(&task.instance_id)
            .contact_flow_id(&task.contact_flow_id)
            .name(&task.name)
            .description(&task.description)
            .client_token(&task.client_token)
            .references("CTR", reference);

        for (key, value) in &task.attributes {
            request = request.attributes(key, value);
        }

        let output = request
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("Failed to start task: {}", e)))?;

        Ok(output.contact_id().unwrap_or_default().to_string())
    }
}
