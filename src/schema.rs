//! Request payloads for each entity.
//!
//! `*Payload` types are creation bodies: every field is optional at the serde
//! level so that missing required fields are reported by `validator` next to
//! the other field issues. `New*` types are what a payload normalizes into
//! once defaults are applied. `*Changes` types are partial update bodies and
//! are never validated.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use validator::Validate;

use crate::models::SessionStatus;
use crate::validation::{Normalize, nullable};

pub const DEFAULT_SUBJECT_COLOR: &str = "#3b82f6";
pub const DEFAULT_SUBJECT_ICON: &str = "book";

#[derive(Debug, Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubjectPayload {
    #[validate(
        required(message = "Name is required"),
        length(min = 1, message = "Name must not be empty")
    )]
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub current_topic: Option<String>,
    pub progress: Option<i64>,
    pub total_hours: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct NewSubject {
    pub name: String,
    pub color: String,
    pub icon: String,
    pub current_topic: Option<String>,
    pub progress: i64,
    pub total_hours: f64,
}

impl Normalize for SubjectPayload {
    type Output = NewSubject;

    fn normalize(self) -> NewSubject {
        NewSubject {
            name: self.name.unwrap_or_default(),
            color: self
                .color
                .unwrap_or_else(|| DEFAULT_SUBJECT_COLOR.to_string()),
            icon: self.icon.unwrap_or_else(|| DEFAULT_SUBJECT_ICON.to_string()),
            current_topic: self.current_topic,
            progress: self.progress.unwrap_or(0),
            total_hours: self.total_hours.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubjectChanges {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub current_topic: Option<Option<String>>,
    pub progress: Option<i64>,
    pub total_hours: Option<f64>,
}

#[derive(Debug, Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct StudySessionPayload {
    #[validate(required(message = "Subject id is required"))]
    pub subject_id: Option<i64>,
    #[validate(
        required(message = "Title is required"),
        length(min = 1, message = "Title must not be empty")
    )]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(required(message = "Start time is required"))]
    pub start_time: Option<DateTime<Utc>>,
    #[validate(required(message = "End time is required"))]
    pub end_time: Option<DateTime<Utc>>,
    #[validate(required(message = "Date is required"))]
    pub date: Option<NaiveDate>,
    pub status: Option<SessionStatus>,
    pub actual_duration: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewStudySession {
    pub subject_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub date: NaiveDate,
    pub status: SessionStatus,
    pub actual_duration: i64,
}

impl Normalize for StudySessionPayload {
    type Output = NewStudySession;

    fn normalize(self) -> NewStudySession {
        NewStudySession {
            subject_id: self.subject_id.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            description: self.description,
            start_time: self.start_time.unwrap_or_default(),
            end_time: self.end_time.unwrap_or_default(),
            date: self.date.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            actual_duration: self.actual_duration.unwrap_or(0),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StudySessionChanges {
    pub subject_id: Option<i64>,
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub date: Option<NaiveDate>,
    pub status: Option<SessionStatus>,
    pub actual_duration: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct NotePayload {
    #[validate(required(message = "Subject id is required"))]
    pub subject_id: Option<i64>,
    #[validate(
        required(message = "Title is required"),
        length(min = 1, message = "Title must not be empty")
    )]
    pub title: Option<String>,
    #[validate(required(message = "Content is required"))]
    pub content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewNote {
    pub subject_id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Normalize for NotePayload {
    type Output = NewNote;

    fn normalize(self) -> NewNote {
        NewNote {
            subject_id: self.subject_id.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            content: self.content.unwrap_or_default(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NoteChanges {
    pub subject_id: Option<i64>,
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct GoalPayload {
    #[validate(
        required(message = "Title is required"),
        length(min = 1, message = "Title must not be empty")
    )]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(required(message = "Target date is required"))]
    pub target_date: Option<NaiveDate>,
    pub progress: Option<i64>,
    pub completed: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewGoal {
    pub title: String,
    pub description: Option<String>,
    pub target_date: NaiveDate,
    pub progress: i64,
    pub completed: bool,
}

impl Normalize for GoalPayload {
    type Output = NewGoal;

    fn normalize(self) -> NewGoal {
        NewGoal {
            title: self.title.unwrap_or_default(),
            description: self.description,
            target_date: self.target_date.unwrap_or_default(),
            progress: self.progress.unwrap_or(0),
            completed: self.completed.unwrap_or(false),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GoalChanges {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub target_date: Option<NaiveDate>,
    pub progress: Option<i64>,
    pub completed: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct StudyStatsPayload {
    #[validate(required(message = "Date is required"))]
    pub date: Option<NaiveDate>,
    pub total_minutes: Option<i64>,
    pub sessions_completed: Option<i64>,
    pub streak: Option<i64>,
}

/// Counters left as `None` keep their stored value when the date already has
/// a row, and start at 0 when it does not.
#[derive(Debug, Clone, Default)]
pub struct NewStudyStats {
    pub date: NaiveDate,
    pub total_minutes: Option<i64>,
    pub sessions_completed: Option<i64>,
    pub streak: Option<i64>,
}

impl Normalize for StudyStatsPayload {
    type Output = NewStudyStats;

    fn normalize(self) -> NewStudyStats {
        NewStudyStats {
            date: self.date.unwrap_or_default(),
            total_minutes: self.total_minutes,
            sessions_completed: self.sessions_completed,
            streak: self.streak,
        }
    }
}

/// Accounts have no HTTP surface; they are created through the store only.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
}
