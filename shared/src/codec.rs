//! Conversion between survey definitions and flat table records.
//!
//! The table has no list type for us to rely on, so question `n` (1-based)
//! lives under `question_{n}` and its flag threshold under `flag_question_{n}`.
//! Decoding recovers the order by sorting those keys as strings, which only
//! matches numeric order while a survey has at most nine questions.

use serde_json::{json, Value};
use tracing::warn;

use crate::models::{SurveyDefinition, NO_FLAG};
use crate::store::Record;
use crate::{Error, Result};

pub const QUESTION_PREFIX: &str = "question_";
pub const FLAG_PREFIX: &str = "flag_question_";

/// Largest question count whose keys sort in numeric order.
pub const MAX_ORDERED_QUESTIONS: usize = 9;

pub fn question_key(number: usize) -> String {
    format!("{}{}", QUESTION_PREFIX, number)
}

pub fn flag_key(number: usize) -> String {
    format!("{}{}", FLAG_PREFIX, number)
}

/// Flatten a definition into a table record.
pub fn encode(definition: &SurveyDefinition) -> Record {
    if definition.questions.len() > MAX_ORDERED_QUESTIONS {
        warn!(
            survey_id = %definition.survey_id,
            questions = definition.questions.len(),
            "Survey has more questions than keys can keep in order"
        );
    }

    let mut record = Record::new();
    record.insert("surveyId".to_string(), json!(definition.survey_id));
    record.insert("surveyName".to_string(), json!(definition.survey_name));
    record.insert("introPrompt".to_string(), json!(definition.intro_prompt));
    record.insert("outroPrompt".to_string(), json!(definition.outro_prompt));
    record.insert("min".to_string(), json!(definition.min));
    record.insert("max".to_string(), json!(definition.max));

    for (i, question) in definition.questions.iter().enumerate() {
        record.insert(question_key(i + 1), json!(question));
    }

    for (i, flag) in definition.flags.iter().enumerate() {
        record.insert(flag_key(i + 1), json!(flag));
    }

    record
}

/// Rebuild a definition from a table record.
///
/// Missing fields take their defaults; a numeric field holding something
/// that is not a number is a validation error.
pub fn decode(record: &Record) -> Result<SurveyDefinition> {
    let questions = sorted_keys(record, QUESTION_PREFIX)
        .into_iter()
        .map(|key| text(record.get(key)))
        .collect();

    let flags = sorted_keys(record, FLAG_PREFIX)
        .into_iter()
        .map(|key| number(record.get(key), key).map(|flag| flag.unwrap_or(NO_FLAG)))
        .collect::<Result<Vec<i64>>>()?;

    Ok(SurveyDefinition {
        survey_id: text(record.get("surveyId")),
        survey_name: text(record.get("surveyName")),
        intro_prompt: text(record.get("introPrompt")),
        outro_prompt: text(record.get("outroPrompt")),
        min: number(record.get("min"), "min")?.unwrap_or_default(),
        max: number(record.get("max"), "max")?.unwrap_or_default(),
        questions,
        flags,
    })
}

/// Keys starting with `prefix`, in string order.
pub fn sorted_keys<'a>(record: &'a Record, prefix: &str) -> Vec<&'a str> {
    let mut keys: Vec<&str> = record
        .keys()
        .map(String::as_str)
        .filter(|key| key.starts_with(prefix))
        .collect();
    keys.sort_unstable();
    keys
}

/// Render an attribute as the plain string a contact flow expects.
pub fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn number(value: Option<&Value>, field: &str) -> Result<Option<i64>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| Error::Validation(format!("{} is out of range: {}", field, n))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Validation(format!("{} is not a number: {:?}", field, s))),
        Some(other) => Err(Error::Validation(format!(
            "{} is not a number: {}",
            field, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survey(count: usize) -> SurveyDefinition {
        SurveyDefinition {
            survey_id: "survey-1".to_string(),
            survey_name: "CSAT".to_string(),
            intro_prompt: "Please rate your call".to_string(),
            outro_prompt: "Thank you".to_string(),
            min: 1,
            max: 5,
            questions: (1..=count).map(|i| format!("Question text {}", i)).collect(),
            flags: (1..=count)
                .map(|i| if i % 2 == 0 { i as i64 % 5 } else { NO_FLAG })
                .collect(),
        }
    }

    #[test]
    fn test_encode_numbers_keys_from_one() {
        let record = encode(&survey(2));
        assert_eq!(record["question_1"], "Question text 1");
        assert_eq!(record["question_2"], "Question text 2");
        assert_eq!(record["flag_question_1"], NO_FLAG);
        assert_eq!(record["flag_question_2"], 2);
        assert_eq!(record["surveyName"], "CSAT");
        assert!(!record.contains_key("question_0"));
    }

    #[test]
    fn test_decode_restores_order_up_to_nine_questions() {
        for count in 1..=MAX_ORDERED_QUESTIONS {
            let original = survey(count);
            let decoded = decode(&encode(&original)).unwrap();
            assert_eq!(decoded, original, "count = {}", count);
            assert_eq!(decoded.question_count(), count);
        }
    }

    #[test]
    fn test_decode_misorders_ten_or_more_questions() {
        let decoded = decode(&encode(&survey(10))).unwrap();
        // "question_10" sorts between "question_1" and "question_2"
        assert_eq!(decoded.questions[1], "Question text 10");
        assert_eq!(decoded.question_count(), 10);
    }

    #[test]
    fn test_decode_defaults_missing_fields() {
        let mut record = Record::new();
        record.insert("surveyId".to_string(), json!("s-1"));

        let decoded = decode(&record).unwrap();
        assert_eq!(decoded.survey_id, "s-1");
        assert_eq!(decoded.survey_name, "");
        assert_eq!(decoded.min, 0);
        assert!(decoded.questions.is_empty());
        assert!(decoded.flags.is_empty());
    }

    #[test]
    fn test_decode_accepts_numeric_strings() {
        let mut record = encode(&survey(1));
        record.insert("min".to_string(), json!("2"));
        record.insert("flag_question_1".to_string(), json!(""));

        let decoded = decode(&record).unwrap();
        assert_eq!(decoded.min, 2);
        assert_eq!(decoded.flags, vec![NO_FLAG]);
    }

    #[test]
    fn test_decode_rejects_malformed_numbers() {
        let mut record = encode(&survey(1));
        record.insert("max".to_string(), json!("five"));
        assert!(matches!(decode(&record), Err(Error::Validation(_))));

        let mut record = encode(&survey(1));
        record.insert("flag_question_1".to_string(), json!(["3"]));
        assert!(matches!(decode(&record), Err(Error::Validation(_))));
    }
}
