//! Prompt templates.
//!
//! Every builder is a pure function of its arguments: the same task always
//! renders the same prompt text.

use serde_json::Value;
use taskmind_core::{Complexity, ProductivitySnapshot, TaskAnalysis, TimeSlot};

/// A rendered system/user prompt pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

const ANALYSIS_SYSTEM: &str = "You are a productivity assistant that analyzes tasks. \
Respond with a single JSON object and nothing else: no prose, no markdown.";

const SUGGESTIONS_SYSTEM: &str = "You are a productivity assistant that proposes next tasks. \
Respond with a single JSON array of strings and nothing else.";

const INSIGHTS_SYSTEM: &str = "You are a productivity coach that reviews task statistics. \
Respond with a single JSON array of objects and nothing else.";

const VOICE_SYSTEM: &str = "You convert spoken task descriptions into structured tasks. \
Respond with a single JSON object and nothing else.";

/// Field-by-field description of the JSON object expected for an analysis.
pub fn analysis_schema() -> String {
    format!(
        "{{\n  \
         \"priority\": number from 1 to 10 (10 = most important),\n  \
         \"estimatedHours\": number of hours from 0.5 to 40,\n  \
         \"complexity\": {},\n  \
         \"tags\": array of at most {} short lowercase keywords,\n  \
         \"deadlineUrgency\": number from 1 to 10 (10 = due immediately),\n  \
         \"suggestedSubtasks\": array of at most {} short subtask titles,\n  \
         \"optimalTimeSlot\": {}\n\
         }}",
        Complexity::choices(),
        TaskAnalysis::MAX_TAGS,
        TaskAnalysis::MAX_SUBTASKS,
        TimeSlot::choices(),
    )
}

fn render_context(context: Option<&Value>) -> String {
    match context {
        None | Some(Value::Null) => String::new(),
        Some(value) => {
            let rendered =
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            format!("\nAdditional context:\n{}\n", rendered)
        }
    }
}

/// Prompt for analyzing a single task.
pub fn task_analysis(title: &str, description: &str, context: Option<&Value>) -> Prompt {
    let description = if description.trim().is_empty() {
        "(none)"
    } else {
        description
    };

    let user = format!(
        "Analyze the following task.\n\n\
         Title: {}\n\
         Description: {}\n{}\n\
         Return a JSON object with exactly these fields:\n{}\n\n\
         Output only the JSON object.",
        title,
        description,
        render_context(context),
        analysis_schema(),
    );

    Prompt {
        system: ANALYSIS_SYSTEM.to_string(),
        user,
    }
}

/// Prompt for proposing `limit` follow-up tasks given free-text context.
pub fn task_suggestions(context: &str, limit: usize) -> Prompt {
    let user = format!(
        "Based on the context below, suggest {} concrete, actionable tasks the user \
         could work on next. Each suggestion must be a short task title under 80 \
         characters.\n\n\
         Context:\n{}\n\n\
         Return a JSON array of {} strings, for example [\"Draft project outline\"].",
        limit, context, limit
    );

    Prompt {
        system: SUGGESTIONS_SYSTEM.to_string(),
        user,
    }
}

/// Prompt for turning a productivity snapshot into insights.
pub fn productivity_insights(snapshot: &ProductivitySnapshot) -> Prompt {
    let stats = serde_json::to_string_pretty(snapshot).unwrap_or_else(|_| "{}".to_string());

    let user = format!(
        "Review these task statistics and give at most {} insights.\n\n\
         Statistics:\n{}\n\n\
         Return a JSON array where each element is:\n\
         {{\n  \
         \"type\": {},\n  \
         \"title\": short headline,\n  \
         \"description\": one or two sentences with a concrete recommendation,\n  \
         \"impact\": {},\n  \
         \"actionable\": true or false\n\
         }}",
        taskmind_core::Insight::MAX_INSIGHTS,
        stats,
        taskmind_core::InsightType::choices(),
        taskmind_core::Impact::choices(),
    );

    Prompt {
        system: INSIGHTS_SYSTEM.to_string(),
        user,
    }
}

/// Prompt for extracting a task from a voice transcription.
///
/// `today` anchors relative dates such as "next Friday".
pub fn voice_to_task(transcription: &str, today: &str) -> Prompt {
    let user = format!(
        "Today is {}. Extract a task from this voice transcription:\n\n\
         \"{}\"\n\n\
         Return a JSON object with these fields:\n\
         {{\n  \
         \"title\": short task title (required),\n  \
         \"description\": longer description or empty string,\n  \
         \"priority\": number from 1 to 10,\n  \
         \"estimatedHours\": number of hours from 0.5 to 40,\n  \
         \"dueDate\": date as YYYY-MM-DD or null,\n  \
         \"tags\": array of at most {} short lowercase keywords\n\
         }}",
        today,
        transcription.trim(),
        TaskAnalysis::MAX_TAGS,
    );

    Prompt {
        system: VOICE_SYSTEM.to_string(),
        user,
    }
}
