//! Views over collected survey results: time windows, score counts and CSV.

use std::collections::BTreeSet;

use crate::codec::text;
use crate::models::SurveyResult;
use crate::Result;

/// Keep results captured inside the inclusive `[from, to]` window of epoch
/// seconds. An open bound does not restrict.
pub fn filter_by_window(
    results: Vec<SurveyResult>,
    from: Option<i64>,
    to: Option<i64>,
) -> Vec<SurveyResult> {
    results
        .into_iter()
        .filter(|r| from.map_or(true, |from| r.timestamp >= from))
        .filter(|r| to.map_or(true, |to| r.timestamp <= to))
        .collect()
}

/// Number of answers for each score in `[min, max]` to the 1-based question.
/// Scores nobody gave are left out.
pub fn score_distribution(
    results: &[SurveyResult],
    question: usize,
    min: i64,
    max: i64,
) -> Vec<(i64, usize)> {
    (min..=max)
        .filter_map(|score| {
            let count = results
                .iter()
                .filter(|r| r.answer(question) == Some(score))
                .count();
            (count > 0).then_some((score, count))
        })
        .collect()
}

/// Render results as CSV: the header is every attribute name in sorted order
/// and absent attributes are left empty.
pub fn to_csv(results: &[SurveyResult]) -> Result<String> {
    let records = results
        .iter()
        .map(SurveyResult::to_record)
        .collect::<Result<Vec<_>>>()?;

    let columns: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.keys().map(String::as_str))
        .collect();

    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(columns.iter().map(|c| escape(c)).collect::<Vec<_>>().join(","));

    for record in &records {
        let line = columns
            .iter()
            .map(|column| escape(&text(record.get(*column))))
            .collect::<Vec<_>>()
            .join(",");
        lines.push(line);
    }

    Ok(lines.join("\n"))
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
