//! Request and response types for the course catalog API
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// DATA MODELS
// ============================================================================

// ----- Language Models -----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub native_name: String,
}

/// Language block embedded in every course summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageInfo {
    pub code: String,
    pub name: String,
    pub native_name: String,
}

// ----- Course Models -----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub language_id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub level: i32,
    pub cefr_level: Option<String>,
    pub learning_objectives: Vec<String>,
    pub estimated_hours: Option<f64>,
    pub prerequisites: Vec<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateCourseRequest {
    pub language_id: Uuid,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    pub level: i32,
    #[serde(default)]
    pub cefr_level: Option<String>,
    #[serde(default)]
    pub learning_objectives: Option<Vec<String>>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub prerequisites: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub level: i32,
    pub cefr_level: Option<String>,
    pub language: LanguageInfo,
    pub learning_objectives: Vec<String>,
    pub estimated_hours: Option<f64>,
    pub total_skills: i64,
    pub total_units: i64,
    pub enrollment_status: String,
    /// Present only when the listing was requested for a learner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_progress: Option<UserProgressSummary>,
}

// ----- Progress Models -----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgressSummary {
    pub completion_date: Option<DateTime<Utc>>,
    pub hours_spent: f64,
    pub skills_completed: i32,
    pub overall_score: Option<f64>,
}

impl Default for UserProgressSummary {
    fn default() -> Self {
        Self {
            completion_date: None,
            hours_spent: 0.0,
            skills_completed: 0,
            overall_score: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for ProgressStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown progress status '{other}'")),
        }
    }
}

impl std::fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ----- Enrollment Models -----

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EnrollRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub enrollment_date: DateTime<Utc>,
    pub total_skills: i64,
    pub already_enrolled: bool,
}

/// Prerequisite courses of one course, split by whether the learner has
/// completed them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrerequisiteCounts {
    pub total: usize,
    pub completed: usize,
    pub missing: usize,
}

impl PrerequisiteCounts {
    pub fn new(total: usize, completed: usize) -> Self {
        Self {
            total,
            completed,
            missing: total.saturating_sub(completed),
        }
    }

    pub fn is_met(&self) -> bool {
        self.missing == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrerequisiteCheck {
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub is_enrolled: bool,
    pub can_enroll: bool,
    pub prerequisites: PrerequisiteCounts,
    pub message: String,
}

// ============================================================================
// RESPONSE ENVELOPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseListResponse {
    pub courses: Vec<CourseSummary>,
    pub total: usize,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseCreatedResponse {
    pub course: Course,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseDetailResponse {
    pub course: CourseSummary,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageListResponse {
    pub languages: Vec<Language>,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentResponse {
    pub message: String,
    pub enrollment: Enrollment,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrerequisiteCheckResponse {
    #[serde(flatten)]
    pub check: PrerequisiteCheck,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnenrollResponse {
    pub message: String,
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prerequisite_counts() {
        let counts = PrerequisiteCounts::new(3, 1);
        assert_eq!(counts.missing, 2);
        assert!(!counts.is_met());
        assert!(PrerequisiteCounts::new(0, 0).is_met());
        assert!(PrerequisiteCounts::new(2, 2).is_met());
    }

    #[test]
    fn test_progress_status_round_trip() {
        for status in [
            ProgressStatus::NotStarted,
            ProgressStatus::InProgress,
            ProgressStatus::Completed,
            ProgressStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<ProgressStatus>(), Ok(status));
        }
        assert!("paused".parse::<ProgressStatus>().is_err());
    }

    #[test]
    fn test_summary_without_progress_omits_field() {
        let summary = CourseSummary {
            id: Uuid::nil(),
            name: "Gheg Albanian I".into(),
            code: "GHEG-1".into(),
            description: None,
            level: 1,
            cefr_level: Some("A1".into()),
            language: LanguageInfo {
                code: "gheg-al".into(),
                name: "Gheg Albanian".into(),
                native_name: "Gegnisht".into(),
            },
            learning_objectives: vec![],
            estimated_hours: None,
            total_skills: 0,
            total_units: 0,
            enrollment_status: "not_started".into(),
            user_progress: None,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("userProgress").is_none());
        assert_eq!(json["cefrLevel"], "A1");
        assert_eq!(json["language"]["nativeName"], "Gegnisht");
    }

    #[test]
    fn test_create_request_rejects_unknown_fields() {
        let body = serde_json::json!({
            "languageId": Uuid::nil(),
            "name": "Course",
            "code": "C1",
            "level": 1,
            "isAdmin": true
        });
        assert!(serde_json::from_value::<CreateCourseRequest>(body).is_err());
    }

    #[test]
    fn test_progress_summary_serializes_explicit_nulls() {
        let json = serde_json::to_value(UserProgressSummary::default()).unwrap();
        assert!(json["completionDate"].is_null());
        assert!(json["overallScore"].is_null());
        assert_eq!(json["hoursSpent"], 0.0);
        assert_eq!(json["skillsCompleted"], 0);
    }
}
