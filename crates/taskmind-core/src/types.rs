use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Declares a closed string enum with its wire spelling, `Display` and a
/// case-insensitive `FromStr` that only accepts members of the set.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// The allowed spellings joined for prompt text, e.g. `"low" | "medium"`.
            pub fn choices() -> String {
                Self::ALL
                    .iter()
                    .map(|v| format!("\"{}\"", v.as_str()))
                    .collect::<Vec<_>>()
                    .join(" | ")
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let needle = s.trim().to_ascii_lowercase();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == needle)
                    .ok_or_else(|| format!("'{}' is not a valid {}", s, stringify!($name)))
            }
        }
    };
}

string_enum!(
    /// Effort class of a task.
    Complexity {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
);

string_enum!(
    /// Tone of the task text, always computed locally.
    Sentiment {
        Positive => "positive",
        Negative => "negative",
        Neutral => "neutral",
    }
);

string_enum!(
    /// Part of the day best suited to work on a task.
    TimeSlot {
        Morning => "morning",
        Afternoon => "afternoon",
        Evening => "evening",
        Flexible => "flexible",
    }
);

string_enum!(
    InsightType {
        Productivity => "productivity",
        TimeManagement => "time_management",
        Prioritization => "prioritization",
        Wellbeing => "wellbeing",
    }
);

string_enum!(
    Impact {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
);

impl Default for Complexity {
    fn default() -> Self {
        Complexity::Medium
    }
}

impl Default for Sentiment {
    fn default() -> Self {
        Sentiment::Neutral
    }
}

impl Default for TimeSlot {
    fn default() -> Self {
        TimeSlot::Flexible
    }
}

impl Default for Impact {
    fn default() -> Self {
        Impact::Medium
    }
}

/// Enriched view of a task produced by the analysis pipeline.
///
/// Every field is always populated and within its documented bounds; see
/// [`crate::validation`] for the repair rules applied to remote output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAnalysis {
    /// 1..=10, one decimal.
    pub priority: f64,
    /// 0.5..=40 hours, one decimal.
    pub estimated_hours: f64,
    pub complexity: Complexity,
    pub sentiment: Sentiment,
    /// At most [`TaskAnalysis::MAX_TAGS`] entries.
    pub tags: Vec<String>,
    /// 1..=10, one decimal.
    pub deadline_urgency: f64,
    /// At most [`TaskAnalysis::MAX_SUBTASKS`] entries.
    pub suggested_subtasks: Vec<String>,
    pub optimal_time_slot: TimeSlot,
    /// 60..=99.
    pub confidence_score: u8,
}

impl TaskAnalysis {
    pub const MAX_TAGS: usize = 8;
    pub const MAX_SUBTASKS: usize = 5;
    pub const MIN_CONFIDENCE: u8 = 60;
    pub const MAX_CONFIDENCE: u8 = 99;
}

/// Where an analysis result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Cache,
    Remote,
    Fallback,
}

impl fmt::Display for AnalysisSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnalysisSource::Cache => "cache",
            AnalysisSource::Remote => "remote",
            AnalysisSource::Fallback => "fallback",
        };
        write!(f, "{}", s)
    }
}

/// A single productivity observation with a suggested reaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub title: String,
    pub description: String,
    pub impact: Impact,
    pub actionable: bool,
}

impl Insight {
    pub const MAX_INSIGHTS: usize = 5;
    pub const MAX_TITLE_CHARS: usize = 100;
    pub const MAX_DESCRIPTION_CHARS: usize = 500;
}

/// Aggregated task history for one user, the input to insight generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductivitySnapshot {
    pub user_id: Option<String>,
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub overdue_tasks: u32,
    pub average_completion_hours: Option<f64>,
    pub most_productive_slot: Option<TimeSlot>,
    /// Task counts keyed by category or tag.
    pub category_counts: BTreeMap<String, u32>,
}

impl ProductivitySnapshot {
    /// Fraction of tasks completed, or `None` when there are no tasks.
    pub fn completion_rate(&self) -> Option<f64> {
        if self.total_tasks == 0 {
            None
        } else {
            Some(f64::from(self.completed_tasks.min(self.total_tasks)) / f64::from(self.total_tasks))
        }
    }
}

/// Structured task extracted from a voice transcription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: f64,
    pub estimated_hours: f64,
    pub due_date: Option<NaiveDate>,
    pub tags: Vec<String>,
}

impl TaskDraft {
    pub const MAX_TITLE_CHARS: usize = 200;
    pub const MAX_DESCRIPTION_CHARS: usize = 2000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_parse_only_members() {
        assert_eq!("HIGH".parse::<Complexity>().unwrap(), Complexity::High);
        assert_eq!(" evening ".parse::<TimeSlot>().unwrap(), TimeSlot::Evening);
        assert!("urgent".parse::<Complexity>().is_err());
        assert!("".parse::<Sentiment>().is_err());
    }

    #[test]
    fn task_analysis_uses_camel_case_wire_names() {
        let analysis = TaskAnalysis {
            priority: 7.5,
            estimated_hours: 3.0,
            complexity: Complexity::High,
            sentiment: Sentiment::Neutral,
            tags: vec!["backend".into()],
            deadline_urgency: 6.0,
            suggested_subtasks: vec![],
            optimal_time_slot: TimeSlot::Morning,
            confidence_score: 85,
        };
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["estimatedHours"], 3.0);
        assert_eq!(json["optimalTimeSlot"], "morning");
        assert_eq!(json["confidenceScore"], 85);
        assert_eq!(json["complexity"], "high");
    }

    #[test]
    fn insight_type_serializes_with_snake_case_spelling() {
        let json = serde_json::to_string(&InsightType::TimeManagement).unwrap();
        assert_eq!(json, "\"time_management\"");
        assert_eq!(
            InsightType::choices(),
            "\"productivity\" | \"time_management\" | \"prioritization\" | \"wellbeing\""
        );
    }

    #[test]
    fn completion_rate_handles_empty_history() {
        let mut snapshot = ProductivitySnapshot::default();
        assert_eq!(snapshot.completion_rate(), None);
        snapshot.total_tasks = 4;
        snapshot.completed_tasks = 3;
        assert_eq!(snapshot.completion_rate(), Some(0.75));
    }
}
