//! Turns parsed model output into well-formed domain values.
//!
//! Model replies are untrusted: fields may be missing, mistyped or out of
//! range. Each field is normalized on its own and every substitution is
//! logged at `warn` level. Nothing here fails except [`repair_task_draft`],
//! which has no usable default for a missing title.

use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashSet;
use taskmind_core::validation::{
    is_truthy, non_empty_string, validate_enum_checked, validate_range,
    validate_range_checked, validate_string_list, validate_string_list_checked, Normalized,
};
use taskmind_core::{
    Complexity, Impact, Insight, InsightType, Result, TaskAnalysis, TaskDraft, TaskMindError,
    TimeSlot,
};
use tracing::warn;

use crate::sentiment::analyze_sentiment;

const BASE_CONFIDENCE: i32 = 85;

fn logged<T>(field: &'static str, normalized: Normalized<T>) -> T {
    if normalized.repaired {
        warn!(field, "repaired model output field");
    }
    normalized.value
}

/// Confidence of a remote analysis, judged from how complete the raw reply
/// was before any repair.
pub fn confidence_score(raw: &Value) -> u8 {
    let mut score = BASE_CONFIDENCE;

    if !is_truthy(raw.get("priority")) {
        score -= 10;
    }
    if !is_truthy(raw.get("estimatedHours")) {
        score -= 10;
    }
    match raw.get("tags") {
        Some(Value::Array(tags)) if !tags.is_empty() => {}
        _ => score -= 5,
    }
    if !matches!(raw.get("suggestedSubtasks"), Some(Value::Array(_))) {
        score -= 5;
    }

    score.clamp(
        i32::from(TaskAnalysis::MIN_CONFIDENCE),
        i32::from(TaskAnalysis::MAX_CONFIDENCE),
    ) as u8
}

/// Build a [`TaskAnalysis`] from a parsed reply object.
///
/// Sentiment is computed from `title` and `description`; any sentiment the
/// model returned is ignored.
pub fn repair_task_analysis(raw: &Value, title: &str, description: &str) -> TaskAnalysis {
    let priority = logged(
        "priority",
        validate_range_checked(raw.get("priority"), 1.0, 10.0, 5.0),
    );
    let estimated_hours = logged(
        "estimatedHours",
        validate_range_checked(raw.get("estimatedHours"), 0.5, 40.0, 2.0),
    );
    let complexity = logged(
        "complexity",
        validate_enum_checked(raw.get("complexity"), Complexity::default()),
    );
    let tags = logged(
        "tags",
        validate_string_list_checked(raw.get("tags"), TaskAnalysis::MAX_TAGS),
    );
    let deadline_urgency = logged(
        "deadlineUrgency",
        validate_range_checked(raw.get("deadlineUrgency"), 1.0, 10.0, 5.0),
    );
    let suggested_subtasks = logged(
        "suggestedSubtasks",
        validate_string_list_checked(raw.get("suggestedSubtasks"), TaskAnalysis::MAX_SUBTASKS),
    );
    let optimal_time_slot = logged(
        "optimalTimeSlot",
        validate_enum_checked(raw.get("optimalTimeSlot"), TimeSlot::default()),
    );

    TaskAnalysis {
        priority,
        estimated_hours,
        complexity,
        sentiment: analyze_sentiment(&format!("{} {}", title, description)),
        tags,
        deadline_urgency,
        suggested_subtasks,
        optimal_time_slot,
        confidence_score: confidence_score(raw),
    }
}

/// Distinct suggestion strings, compared case-insensitively, at most `limit`.
pub fn repair_suggestions(raw: &Value, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    validate_string_list(Some(raw), usize::MAX)
        .into_iter()
        .filter(|s| seen.insert(s.to_lowercase()))
        .take(limit)
        .collect()
}

/// Keep the insights that have a known type and a title and description.
pub fn repair_insights(raw: &Value) -> Vec<Insight> {
    let Some(items) = raw.as_array() else {
        warn!("insight reply is not an array");
        return Vec::new();
    };

    let insights: Vec<Insight> = items
        .iter()
        .filter_map(repair_insight)
        .take(Insight::MAX_INSIGHTS)
        .collect();

    if insights.len() < items.len().min(Insight::MAX_INSIGHTS) {
        warn!(
            received = items.len(),
            kept = insights.len(),
            "dropped malformed insights"
        );
    }
    insights
}

fn repair_insight(item: &Value) -> Option<Insight> {
    let insight_type = item
        .get("type")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<InsightType>().ok())?;
    let title = non_empty_string(item.get("title"), Insight::MAX_TITLE_CHARS)?;
    let description = non_empty_string(item.get("description"), Insight::MAX_DESCRIPTION_CHARS)?;
    let impact = logged(
        "impact",
        validate_enum_checked(item.get("impact"), Impact::default()),
    );
    let actionable = match item.get("actionable") {
        Some(Value::Bool(b)) => *b,
        _ => true,
    };

    Some(Insight {
        insight_type,
        title,
        description,
        impact,
        actionable,
    })
}

/// Build a [`TaskDraft`] from a parsed voice reply.
pub fn repair_task_draft(raw: &Value) -> Result<TaskDraft> {
    let title = non_empty_string(raw.get("title"), TaskDraft::MAX_TITLE_CHARS).ok_or_else(|| {
        TaskMindError::VoiceProcessing("model reply has no task title".to_string())
    })?;

    let description =
        non_empty_string(raw.get("description"), TaskDraft::MAX_DESCRIPTION_CHARS)
            .unwrap_or_default();

    let due_date = raw
        .get("dueDate")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                warn!(field = "dueDate", value = s, "dropping unparseable due date");
                None
            }
        });

    Ok(TaskDraft {
        title,
        description,
        priority: validate_range(raw.get("priority"), 1.0, 10.0, 5.0),
        estimated_hours: validate_range(raw.get("estimatedHours"), 0.5, 40.0, 2.0),
        due_date,
        tags: validate_string_list(raw.get("tags"), TaskAnalysis::MAX_TAGS),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use taskmind_core::Sentiment;

    #[test]
    fn complete_reply_keeps_full_confidence() {
        let raw = json!({
            "priority": 7,
            "estimatedHours": 3,
            "tags": ["api"],
            "suggestedSubtasks": []
        });
        assert_eq!(confidence_score(&raw), 85);
    }

    #[test]
    fn confidence_penalties_accumulate_and_clamp() {
        assert_eq!(confidence_score(&json!({})), 60);
        assert_eq!(
            confidence_score(&json!({"priority": 0, "tags": [], "suggestedSubtasks": []})),
            60
        );
        assert_eq!(
            confidence_score(&json!({"priority": 8, "estimatedHours": 2, "tags": "api"})),
            75
        );
    }

    #[test]
    fn malformed_fields_fall_back_to_defaults() {
        let raw = json!({
            "priority": 42,
            "estimatedHours": "three",
            "complexity": "extreme",
            "sentiment": "positive",
            "tags": ["infra", 7, "deploy"],
            "deadlineUrgency": "8.26",
            "suggestedSubtasks": ["a", "b", "c", "d", "e", "f"],
            "optimalTimeSlot": "midnight"
        });
        let analysis = repair_task_analysis(&raw, "Rotate keys", "routine maintenance");

        assert_eq!(analysis.priority, 5.0);
        assert_eq!(analysis.estimated_hours, 2.0);
        assert_eq!(analysis.complexity, Complexity::Medium);
        assert_eq!(analysis.sentiment, Sentiment::Neutral);
        assert_eq!(analysis.tags, vec!["infra", "deploy"]);
        assert_eq!(analysis.deadline_urgency, 8.3);
        assert_eq!(analysis.suggested_subtasks.len(), 5);
        assert_eq!(analysis.optimal_time_slot, TimeSlot::Flexible);
    }

    #[test]
    fn sentiment_comes_from_task_text() {
        let raw = json!({"sentiment": "negative"});
        let analysis = repair_task_analysis(&raw, "Celebrate launch", "great success");
        assert_eq!(analysis.sentiment, Sentiment::Positive);
    }

    #[test]
    fn suggestions_are_deduplicated_and_limited() {
        let raw = json!(["Plan week", "plan week", " Review PRs ", 3, "", "Write docs"]);
        assert_eq!(
            repair_suggestions(&raw, 2),
            vec!["Plan week".to_string(), "Review PRs".to_string()]
        );
        assert!(repair_suggestions(&json!({"a": 1}), 5).is_empty());
    }

    #[test]
    fn insights_drop_unknown_types_and_missing_text() {
        let raw = json!([
            {"type": "productivity", "title": "Batch email", "description": "Check mail twice a day", "impact": "HIGH", "actionable": true},
            {"type": "astrology", "title": "x", "description": "y"},
            {"type": "wellbeing", "title": "", "description": "y"},
            {"type": "wellbeing", "title": "Breaks", "description": "Take breaks", "impact": "huge"}
        ]);
        let insights = repair_insights(&raw);
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].impact, Impact::High);
        assert_eq!(insights[1].impact, Impact::Medium);
        assert!(insights[1].actionable);
    }

    #[test]
    fn draft_requires_title() {
        let err = repair_task_draft(&json!({"description": "no title"})).unwrap_err();
        assert!(matches!(err, TaskMindError::VoiceProcessing(_)));
    }

    #[test]
    fn draft_normalizes_fields() {
        let raw = json!({
            "title": "  Renew passport ",
            "priority": "7",
            "estimatedHours": 100,
            "dueDate": "2026-05-01",
            "tags": ["travel", ""]
        });
        let draft = repair_task_draft(&raw).unwrap();
        assert_eq!(draft.title, "Renew passport");
        assert_eq!(draft.description, "");
        assert_eq!(draft.priority, 7.0);
        assert_eq!(draft.estimated_hours, 2.0);
        assert_eq!(draft.due_date, NaiveDate::from_ymd_opt(2026, 5, 1));
        assert_eq!(draft.tags, vec!["travel"]);
    }

    #[test]
    fn bad_due_date_is_dropped() {
        let draft = repair_task_draft(&json!({"title": "Call", "dueDate": "next friday"})).unwrap();
        assert_eq!(draft.due_date, None);
    }
}
