use crate::errors::FieldViolation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const TITLE_MIN_LEN: usize = 3;
pub const TITLE_MAX_LEN: usize = 100;
pub const DESCRIPTION_MAX_LEN: usize = 500;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, ToSchema)]
pub struct NewTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, description: Option<String>) -> Self {
        NewTask {
            title: Some(title.into()),
            description,
        }
    }

    pub fn normalized(self) -> Self {
        NewTask {
            title: self.title.map(|t| t.trim().to_string()),
            description: self.description.map(|d| d.trim().to_string()),
        }
    }

    pub fn validate(&self) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        match &self.title {
            Some(title) => violations.extend(validate_title(title)),
            None => violations.push(FieldViolation::new("title", "Title is required")),
        }
        if let Some(description) = &self.description {
            violations.extend(validate_description(description));
        }
        violations
    }
}

/// Partial update. Absent fields are left untouched.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, ToSchema)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        TaskPatch {
            completed: Some(completed),
            ..TaskPatch::default()
        }
    }

    pub fn normalized(self) -> Self {
        TaskPatch {
            title: self.title.map(|t| t.trim().to_string()),
            description: self.description.map(|d| d.trim().to_string()),
            completed: self.completed,
        }
    }

    /// Only the fields being changed are checked.
    pub fn validate(&self) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        if let Some(title) = &self.title {
            violations.extend(validate_title(title));
        }
        if let Some(description) = &self.description {
            violations.extend(validate_description(description));
        }
        violations
    }

    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
    }
}

/// Expects an already-trimmed title.
pub fn validate_title(title: &str) -> Option<FieldViolation> {
    let len = title.chars().count();
    if len == 0 {
        Some(FieldViolation::new("title", "Title cannot be empty"))
    } else if len < TITLE_MIN_LEN {
        Some(FieldViolation::new(
            "title",
            format!("Title must be at least {} characters long", TITLE_MIN_LEN),
        ))
    } else if len > TITLE_MAX_LEN {
        Some(FieldViolation::new(
            "title",
            format!("Title must not exceed {} characters", TITLE_MAX_LEN),
        ))
    } else {
        None
    }
}

pub fn validate_description(description: &str) -> Option<FieldViolation> {
    if description.chars().count() > DESCRIPTION_MAX_LEN {
        Some(FieldViolation::new(
            "description",
            format!("Description must not exceed {} characters", DESCRIPTION_MAX_LEN),
        ))
    } else {
        None
    }
}
