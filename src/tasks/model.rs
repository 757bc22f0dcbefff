use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::UserSummary;

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            other => Err(UnknownVariant {
                kind: "status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

impl std::str::FromStr for TaskPriority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(UnknownVariant {
                kind: "priority",
                value: other.to_string(),
            }),
        }
    }
}

/// A task with both user references resolved.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub due_date: OffsetDateTime,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: UserSummary,
    pub created_by: UserSummary,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Validated input for task creation; the creator comes from the principal.
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: String,
    pub due_date: OffsetDateTime,
    pub priority: TaskPriority,
    pub assigned_to: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub due_date: OffsetDateTime,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: Uuid,
    pub created_by: Uuid,
}

impl NewTask {
    pub fn from_input(input: CreateTask, created_by: Uuid) -> Self {
        Self {
            title: input.title,
            description: input.description,
            due_date: input.due_date,
            status: TaskStatus::default(),
            priority: input.priority,
            assigned_to: input.assigned_to,
            created_by,
        }
    }
}

/// Partial update. `None` leaves the column untouched; `created_by` is not representable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<OffsetDateTime>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Uuid>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.assigned_to.is_none()
    }

    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn priority(priority: TaskPriority) -> Self {
        Self {
            priority: Some(priority),
            ..Self::default()
        }
    }

    pub fn assignee(user_id: Uuid) -> Self {
        Self {
            assigned_to: Some(user_id),
            ..Self::default()
        }
    }
}

/// `tasks` joined twice with `users`.
#[derive(Debug, FromRow)]
pub(crate) struct TaskRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub due_date: OffsetDateTime,
    pub status: String,
    pub priority: String,
    pub assigned_to: Uuid,
    pub assignee_name: Option<String>,
    pub assignee_email: Option<String>,
    pub created_by: Uuid,
    pub creator_name: Option<String>,
    pub creator_email: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<TaskRow> for Task {
    type Error = anyhow::Error;

    fn try_from(r: TaskRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            title: r.title,
            description: r.description,
            due_date: r.due_date,
            status: r.status.parse()?,
            priority: r.priority.parse()?,
            assigned_to: UserSummary {
                id: r.assigned_to,
                name: r.assignee_name,
                email: r.assignee_email,
            },
            created_by: UserSummary {
                id: r.created_by,
                name: r.creator_name,
                email: r.creator_email,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}
