//! Offline results used whenever the remote model cannot be used.
//!
//! Everything here is deterministic and depends only on its arguments.

use once_cell::sync::Lazy;
use std::collections::HashSet;
use taskmind_core::{
    Complexity, Impact, Insight, InsightType, ProductivitySnapshot, Sentiment, TaskAnalysis,
    TimeSlot,
};

pub const URGENCY_KEYWORDS: &[&str] = &[
    "urgent",
    "asap",
    "immediately",
    "critical",
    "emergency",
    "deadline",
];

pub const COMPLEXITY_KEYWORDS: &[&str] = &[
    "refactor",
    "architecture",
    "design",
    "research",
    "analysis",
    "integration",
];

pub const FALLBACK_CONFIDENCE: u8 = 70;
pub const MAX_FALLBACK_TAGS: usize = 5;

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "about", "after", "again", "also", "back", "been", "before", "being", "below", "between",
        "both", "could", "does", "doing", "done", "down", "during", "each", "even", "every",
        "from", "have", "having", "here", "into", "just", "like", "made", "make", "many", "more",
        "most", "much", "need", "needs", "only", "other", "over", "same", "should", "some",
        "still", "such", "than", "that", "their", "them", "then", "there", "these", "they",
        "this", "those", "through", "under", "until", "very", "want", "well", "were", "what",
        "when", "where", "which", "while", "will", "with", "would", "your",
    ]
    .into_iter()
    .collect()
});

const FALLBACK_SUGGESTIONS: &[&str] = &[
    "Review and prioritize your open tasks for today",
    "Block focused time for your most important task",
    "Break your largest task into smaller subtasks",
    "Clear quick wins that take under 15 minutes",
    "Follow up on tasks that are waiting on others",
    "Update deadlines for tasks that have slipped",
    "Plan tomorrow's top three priorities before signing off",
    "Schedule a short break after each focus block",
    "Archive tasks that are no longer relevant",
    "Batch similar small tasks into a single session",
];

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}

/// Keyword decision-table analysis of a task.
pub fn fallback_analysis(title: &str, description: &str) -> TaskAnalysis {
    let text = format!("{} {}", title, description).to_lowercase();
    let urgent = contains_any(&text, URGENCY_KEYWORDS);
    let complex = contains_any(&text, COMPLEXITY_KEYWORDS);

    let (priority, estimated_hours, complexity) = match (urgent, complex) {
        (true, true) => (8.0, 6.0, Complexity::High),
        (true, false) => (8.0, 2.0, Complexity::Medium),
        (false, true) => (6.0, 6.0, Complexity::High),
        (false, false) => (4.0, 2.0, Complexity::Medium),
    };

    TaskAnalysis {
        priority,
        estimated_hours,
        complexity,
        sentiment: Sentiment::Neutral,
        tags: extract_tags(&text),
        deadline_urgency: if urgent { 9.0 } else { 5.0 },
        suggested_subtasks: Vec::new(),
        optimal_time_slot: TimeSlot::Flexible,
        confidence_score: FALLBACK_CONFIDENCE,
    }
}

/// Lowercased whitespace tokens longer than three chars that are not stop
/// words, first occurrence order, at most [`MAX_FALLBACK_TAGS`].
pub fn extract_tags(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut seen = HashSet::new();

    lowered
        .split_whitespace()
        .filter(|token| token.chars().count() > 3)
        .filter(|token| !STOP_WORDS.contains(*token))
        .filter(|token| seen.insert(*token))
        .take(MAX_FALLBACK_TAGS)
        .map(str::to_string)
        .collect()
}

/// Generic planning suggestions, `limit` of them.
pub fn fallback_suggestions(limit: usize) -> Vec<String> {
    FALLBACK_SUGGESTIONS
        .iter()
        .take(limit)
        .map(|s| s.to_string())
        .collect()
}

/// Rule-based insights derived from the snapshot counters.
pub fn fallback_insights(snapshot: &ProductivitySnapshot) -> Vec<Insight> {
    let mut insights = Vec::new();

    let Some(rate) = snapshot.completion_rate() else {
        return vec![Insight {
            insight_type: InsightType::Productivity,
            title: "Start tracking your tasks".to_string(),
            description: "Add the tasks you are working on so patterns in your workload can \
                          be spotted."
                .to_string(),
            impact: Impact::Low,
            actionable: true,
        }];
    };
    let percent = (rate * 100.0).round() as u32;

    if rate < 0.5 {
        insights.push(Insight {
            insight_type: InsightType::Productivity,
            title: "Low completion rate".to_string(),
            description: format!(
                "Only {}% of your tasks are completed. Commit to fewer tasks per day and \
                 finish them before starting new ones.",
                percent
            ),
            impact: Impact::High,
            actionable: true,
        });
    } else if rate >= 0.8 {
        insights.push(Insight {
            insight_type: InsightType::Productivity,
            title: "Strong completion rate".to_string(),
            description: format!(
                "You complete {}% of your tasks. Keep the current planning rhythm.",
                percent
            ),
            impact: Impact::Low,
            actionable: false,
        });
    }

    if snapshot.overdue_tasks > 0 {
        let heavy = u64::from(snapshot.overdue_tasks) * 4 >= u64::from(snapshot.total_tasks);
        insights.push(Insight {
            insight_type: InsightType::Prioritization,
            title: "Overdue tasks need attention".to_string(),
            description: format!(
                "{} task(s) are past their deadline. Re-prioritize or renegotiate those \
                 deadlines first.",
                snapshot.overdue_tasks
            ),
            impact: if heavy { Impact::High } else { Impact::Medium },
            actionable: true,
        });
    }

    if let Some(hours) = snapshot.average_completion_hours.filter(|h| *h > 8.0) {
        insights.push(Insight {
            insight_type: InsightType::TimeManagement,
            title: "Tasks run long".to_string(),
            description: format!(
                "Tasks take {:.1} hours on average. Split work into pieces that fit a \
                 single focus session.",
                hours
            ),
            impact: Impact::Medium,
            actionable: true,
        });
    }

    if let Some(slot) = snapshot
        .most_productive_slot
        .filter(|slot| *slot != TimeSlot::Flexible)
    {
        insights.push(Insight {
            insight_type: InsightType::TimeManagement,
            title: format!("Protect your {} focus time", slot),
            description: format!(
                "You get the most done in the {}. Schedule demanding tasks there.",
                slot
            ),
            impact: Impact::Low,
            actionable: true,
        });
    }

    if insights.is_empty() {
        insights.push(Insight {
            insight_type: InsightType::Wellbeing,
            title: "Steady pace".to_string(),
            description: format!(
                "You complete {}% of your tasks with nothing overdue. Keep breaks in \
                 your schedule to sustain it.",
                percent
            ),
            impact: Impact::Low,
            actionable: false,
        });
    }

    insights.truncate(Insight::MAX_INSIGHTS);
    insights
}
