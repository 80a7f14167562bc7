//! Shared data models.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

use crate::store::Record;
use crate::{Error, Result};

/// Flag threshold meaning "never flag this question".
pub const NO_FLAG: i64 = -1;

/// Prefix of the contact attributes holding captured answers.
pub const RESULT_PREFIX: &str = "survey_result_";

/// An authored survey: metadata plus parallel question and flag lists.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_definition"))]
pub struct SurveyDefinition {
    /// Empty until the survey is first stored
    #[serde(default)]
    pub survey_id: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "surveyName is required"))]
    pub survey_name: String,
    #[serde(default)]
    pub intro_prompt: String,
    #[serde(default)]
    pub outro_prompt: String,
    /// Lowest accepted answer (inclusive)
    #[serde(default)]
    pub min: i64,
    /// Highest accepted answer (inclusive)
    #[serde(default)]
    pub max: i64,
    #[serde(default)]
    #[validate(length(min = 1, message = "at least one question is required"))]
    pub questions: Vec<String>,
    /// One threshold per question, `NO_FLAG` when the question is never flagged
    #[serde(default)]
    pub flags: Vec<i64>,
}

impl SurveyDefinition {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

fn validate_definition(definition: &SurveyDefinition) -> std::result::Result<(), ValidationError> {
    if definition.questions.len() != definition.flags.len() {
        return Err(invalid(
            "flags_mismatch",
            format!(
                "expected {} flags, got {}",
                definition.questions.len(),
                definition.flags.len()
            ),
        ));
    }

    if definition.min >= definition.max {
        return Err(invalid(
            "invalid_range",
            format!("min ({}) must be lower than max ({})", definition.min, definition.max),
        ));
    }

    Ok(())
}

fn invalid(code: &'static str, message: String) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Owned(message));
    error
}

/// One respondent's captured answers for one contact.
///
/// Answer keys are `survey_result_{n}`; every attribute that is not one of the
/// fixed fields lands in `answers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResult {
    pub contact_id: String,
    #[serde(default)]
    pub survey_id: String,
    /// Capture time, epoch seconds
    #[serde(default)]
    pub timestamp: i64,
    #[serde(flatten)]
    pub answers: BTreeMap<String, Value>,
}

impl SurveyResult {
    /// Numeric answer for the 1-based question number.
    pub fn answer(&self, question: usize) -> Option<i64> {
        match self.answers.get(&format!("{}{}", RESULT_PREFIX, question))? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// The flat table record for this result.
    pub fn to_record(&self) -> Result<Record> {
        match serde_json::to_value(self)? {
            Value::Object(record) => Ok(record),
            other => Err(Error::Internal(format!(
                "Result is not an object: {}",
                other
            ))),
        }
    }
}

/// Event sent by Amazon Connect when a contact flow invokes a function.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContactFlowEvent {
    pub details: ContactFlowDetails,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContactFlowDetails {
    /// Key/value pairs configured on the invoke block
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub contact_data: ContactData,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContactData {
    #[serde(default)]
    pub contact_id: String,
    #[serde(default, rename = "InstanceARN")]
    pub instance_arn: String,
    /// Live contact attributes
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl ContactFlowEvent {
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.details.parameters.get(key).map(String::as_str)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.details.contact_data.attributes.get(key).map(String::as_str)
    }
}

/// Flat mapping returned to a contact flow; Connect merges it into the
/// contact attributes.
pub type ContactFlowResponse = BTreeMap<String, String>;
