//! Survey Utils Lambda - Drives the question loop of the survey contact flow.
//!
//! The response echoes every parameter, plus the result of `operation`:
//! - getNextSurveyQuestion - Question at `loopCounter` and the incremented counter
//! - validateInput - Whether `input` lies within `[min, max]`
//!
//! The counter is not checked against the number of questions; past the end,
//! `nextQuestion` is simply absent and the flow is expected to stop on
//! `surveySize`.

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use shared::codec::question_key;
use shared::{ContactFlowEvent, ContactFlowResponse};
use tracing::warn;
use tracing_subscriber::EnvFilter;

const LOOP_COUNTER: &str = "loopCounter";

/// Inclusive range check; anything that does not parse is invalid.
fn is_valid_input(input: &str, min: &str, max: &str) -> bool {
    match (
        input.trim().parse::<i64>(),
        min.trim().parse::<i64>(),
        max.trim().parse::<i64>(),
    ) {
        (Ok(input), Ok(min), Ok(max)) => min <= input && input <= max,
        _ => false,
    }
}

fn insert(response: &mut ContactFlowResponse, key: &str, value: impl Into<String>) {
    response.insert(key.to_string(), value.into());
}

/// Question text for the current loop counter, if there is one.
fn current_question(event: &ContactFlowEvent) -> Option<&str> {
    let counter: usize = event.attribute(LOOP_COUNTER)?.trim().parse().ok()?;
    event.parameter(&question_key(counter))
}

fn next_survey_question(event: &ContactFlowEvent, response: &mut ContactFlowResponse) {
    let counter = match event.attribute(LOOP_COUNTER).map(|c| c.trim().parse::<usize>()) {
        Some(Ok(counter)) => counter,
        other => {
            warn!("Invalid {}: {:?}", LOOP_COUNTER, other);
            insert(response, "success", "false");
            insert(response, "message", format!("{} is not a number.", LOOP_COUNTER));
            return;
        }
    };

    insert(response, "currentQuestionIndex", counter.to_string());
    if let Some(question) = event.parameter(&question_key(counter)) {
        insert(response, "nextQuestion", question);
    }
    insert(response, "newCounter", (counter + 1).to_string());
}

fn validate_input(event: &ContactFlowEvent, response: &mut ContactFlowResponse) {
    let min = event.parameter("min").unwrap_or_default();
    let max = event.parameter("max").unwrap_or_default();
    let input = event.parameter("input").unwrap_or_default();

    insert(response, "validInput", is_valid_input(input, min, max).to_string());
    insert(
        response,
        "message",
        format!("Your answer is not between {} and {}.", min, max),
    );
    if let Some(question) = current_question(event) {
        insert(response, "nextQuestion", question);
    }
}

fn survey_utils(event: &ContactFlowEvent) -> ContactFlowResponse {
    let mut response = event.details.parameters.clone();

    match event.parameter("operation").unwrap_or_default() {
        "" => {
            insert(&mut response, "success", "true");
            insert(&mut response, "message", "No operation in input. Nothing to do.");
        }
        "getNextSurveyQuestion" => next_survey_question(event, &mut response),
        "validateInput" => validate_input(event, &mut response),
        other => {
            warn!(operation = other, "Unsupported operation");
            insert(&mut response, "success", "false");
            insert(&mut response, "message", "Unsupported operation.");
        }
    }

    response
}

async fn handler(event: LambdaEvent<ContactFlowEvent>) -> Result<ContactFlowResponse, Error> {
    Ok(survey_utils(&event.payload))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    run(service_fn(handler)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(parameters: &[(&str, &str)], loop_counter: Option<&str>) -> ContactFlowEvent {
        let mut event = ContactFlowEvent::default();
        for (key, value) in parameters {
            event
                .details
                .parameters
                .insert(key.to_string(), value.to_string());
        }
        if let Some(counter) = loop_counter {
            event
                .details
                .contact_data
                .attributes
                .insert(LOOP_COUNTER.to_string(), counter.to_string());
        }
        event
    }

    #[test]
    fn test_input_bounds_are_inclusive() {
        assert!(is_valid_input("1", "1", "5"));
        assert!(is_valid_input("5", "1", "5"));
        assert!(is_valid_input("3", "1", "5"));
        assert!(!is_valid_input("0", "1", "5"));
        assert!(!is_valid_input("6", "1", "5"));
        assert!(!is_valid_input("", "1", "5"));
        assert!(!is_valid_input("#", "1", "5"));
        assert!(!is_valid_input("3", "", "5"));
    }

    #[test]
    fn test_no_operation() {
        let response = survey_utils(&event(&[("surveyId", "s-1")], None));
        assert_eq!(response["success"], "true");
        assert_eq!(response["message"], "No operation in input. Nothing to do.");
        assert_eq!(response["surveyId"], "s-1");
    }

    #[test]
    fn test_unsupported_operation() {
        let response = survey_utils(&event(&[("operation", "skip")], None));
        assert_eq!(response["success"], "false");
        assert_eq!(response["message"], "Unsupported operation.");
    }

    #[test]
    fn test_next_question_advances_counter() {
        let parameters = [
            ("operation", "getNextSurveyQuestion"),
            ("question_1", "How was it?"),
            ("question_2", "Again?"),
        ];
        let response = survey_utils(&event(&parameters, Some("2")));

        assert_eq!(response["currentQuestionIndex"], "2");
        assert_eq!(response["nextQuestion"], "Again?");
        assert_eq!(response["newCounter"], "3");
        assert_eq!(response["question_1"], "How was it?");
    }

    #[test]
    fn test_next_question_runs_past_the_end() {
        let parameters = [("operation", "getNextSurveyQuestion"), ("question_1", "Only")];
        let response = survey_utils(&event(&parameters, Some("2")));

        assert!(!response.contains_key("nextQuestion"));
        assert_eq!(response["newCounter"], "3");
    }

    #[test]
    fn test_next_question_without_counter() {
        let response = survey_utils(&event(&[("operation", "getNextSurveyQuestion")], None));
        assert_eq!(response["success"], "false");
        assert!(!response.contains_key("newCounter"));
    }

    #[test]
    fn test_validate_input() {
        let parameters = [
            ("operation", "validateInput"),
            ("min", "1"),
            ("max", "5"),
            ("input", "7"),
            ("question_1", "How was it?"),
        ];
        let response = survey_utils(&event(&parameters, Some("1")));

        assert_eq!(response["validInput"], "false");
        assert_eq!(response["message"], "Your answer is not between 1 and 5.");
        assert_eq!(response["nextQuestion"], "How was it?");

        let parameters = [
            ("operation", "validateInput"),
            ("min", "1"),
            ("max", "5"),
            ("input", "5"),
        ];
        let response = survey_utils(&event(&parameters, Some("1")));
        assert_eq!(response["validInput"], "true");
    }
}
