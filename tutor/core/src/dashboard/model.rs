//! Dashboard data
//!
//! Read-only records served by the classroom service. The dashboard never
//! merges these; each fetch replaces what was there.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A downloadable lesson resource
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Display name
    pub name: String,
    /// File name on the server
    pub file: String,
}

impl Resource {
    /// Path the resource is served from
    #[must_use]
    pub fn download_path(&self) -> String {
        format!("/resources/{}", self.file)
    }
}

/// One student's lesson progress
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Student name
    pub student: String,
    /// Lessons completed
    pub completed: u32,
    /// Lessons assigned
    pub total: u32,
}

impl ProgressRecord {
    /// Completion as a whole percentage (0 when nothing is assigned)
    #[must_use]
    pub fn percent_complete(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        let pct = u64::from(self.completed) * 100 / u64::from(self.total);
        u32::try_from(pct).unwrap_or(u32::MAX)
    }
}

/// Helpful / not helpful counts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackTally {
    /// Verdicts marked helpful
    #[serde(default)]
    pub helpful: u64,
    /// Verdicts marked not helpful
    #[serde(default)]
    pub not_helpful: u64,
    /// All verdicts
    #[serde(default)]
    pub total: u64,
}

impl FeedbackTally {
    /// Share of helpful verdicts in `0.0..=1.0`, `None` when there are none
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn helpful_ratio(&self) -> Option<f64> {
        (self.total > 0).then(|| self.helpful as f64 / self.total as f64)
    }
}

/// Feedback analytics snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackAnalytics {
    /// Totals across all lessons
    #[serde(default)]
    pub total_feedback: FeedbackTally,
    /// Totals per lesson, ordered by lesson label
    #[serde(default)]
    pub lesson_feedback: BTreeMap<String, FeedbackTally>,
}

/// Body of `GET /resources`
#[derive(Clone, Debug, Deserialize)]
pub struct ResourcesResponse {
    /// Available resources
    pub resources: Vec<Resource>,
}

/// Body of `GET /progress`
#[derive(Clone, Debug, Deserialize)]
pub struct ProgressResponse {
    /// Per-student progress
    pub progress: Vec<ProgressRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_path() {
        let res = Resource {
            name: "Lesson 1: Climate Change".to_string(),
            file: "lesson1.pdf".to_string(),
        };
        assert_eq!(res.download_path(), "/resources/lesson1.pdf");
    }

    #[test]
    fn test_percent_complete() {
        let alice = ProgressRecord {
            student: "Alice".to_string(),
            completed: 3,
            total: 5,
        };
        assert_eq!(alice.percent_complete(), 60);

        let nobody = ProgressRecord {
            student: "New".to_string(),
            completed: 0,
            total: 0,
        };
        assert_eq!(nobody.percent_complete(), 0);
    }

    #[test]
    fn test_helpful_ratio() {
        assert_eq!(FeedbackTally::default().helpful_ratio(), None);
        let tally = FeedbackTally {
            helpful: 3,
            not_helpful: 1,
            total: 4,
        };
        assert_eq!(tally.helpful_ratio(), Some(0.75));
    }

    #[test]
    fn test_analytics_decoding() {
        let json = r#"{
            "total_feedback": {"helpful": 5, "not_helpful": 2, "total": 7},
            "lesson_feedback": {
                "Lesson 2": {"helpful": 1, "not_helpful": 1, "total": 2},
                "Lesson 1": {"helpful": 4, "not_helpful": 1, "total": 5}
            }
        }"#;
        let analytics: FeedbackAnalytics = serde_json::from_str(json).unwrap();
        assert_eq!(analytics.total_feedback.total, 7);
        let lessons: Vec<&str> = analytics.lesson_feedback.keys().map(String::as_str).collect();
        assert_eq!(lessons, vec!["Lesson 1", "Lesson 2"]);
    }

    #[test]
    fn test_empty_analytics_decoding() {
        let analytics: FeedbackAnalytics = serde_json::from_str("{}").unwrap();
        assert_eq!(analytics, FeedbackAnalytics::default());
    }
}
