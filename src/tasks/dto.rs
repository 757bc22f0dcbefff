use serde::Deserialize;
use time::{format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime};
use uuid::Uuid;

use super::{
    filter::{FilterQuery, TaskFilter},
    model::{CreateTask, TaskChanges, TaskPriority, TaskStatus},
    pagination::PageRequest,
};
use crate::error::AppError;

const TITLE_MIN: usize = 3;
const TITLE_MAX: usize = 100;
const DESCRIPTION_MAX: usize = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<String>,
    pub assigned_to: Option<String>,
}

impl CreateTaskRequest {
    pub fn validate(self) -> Result<CreateTask, AppError> {
        let title = self
            .title
            .ok_or_else(|| AppError::validation("Task title is required"))?;
        let description = self
            .description
            .ok_or_else(|| AppError::validation("Task description is required"))?;
        let due_date = self
            .due_date
            .ok_or_else(|| AppError::validation("Due date is required"))?;
        let assigned_to = self
            .assigned_to
            .ok_or_else(|| AppError::validation("Task must be assigned to a user"))?;

        Ok(CreateTask {
            title: valid_title(&title)?,
            description: valid_description(&description)?,
            due_date: parse_due_date(&due_date)?,
            priority: self
                .priority
                .as_deref()
                .map(parse_priority)
                .transpose()?
                .unwrap_or_default(),
            assigned_to: parse_user_id(&assigned_to)?,
        })
    }
}

/// Field edits; `status` is deliberately absent and is changed through its own endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<String>,
    pub assigned_to: Option<String>,
}

impl UpdateTaskRequest {
    pub fn validate(self) -> Result<TaskChanges, AppError> {
        let changes = TaskChanges {
            title: self.title.as_deref().map(valid_title).transpose()?,
            description: self.description.as_deref().map(valid_description).transpose()?,
            due_date: self.due_date.as_deref().map(parse_due_date).transpose()?,
            status: None,
            priority: self.priority.as_deref().map(parse_priority).transpose()?,
            assigned_to: self.assigned_to.as_deref().map(parse_user_id).transpose()?,
        };
        if changes.is_empty() {
            return Err(AppError::validation("At least one field must be provided"));
        }
        Ok(changes)
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: Option<String>,
}

impl StatusRequest {
    pub fn validate(self) -> Result<TaskStatus, AppError> {
        let raw = self
            .status
            .ok_or_else(|| AppError::validation("Status is required"))?;
        raw.parse()
            .map_err(|_| AppError::validation("Status must be either 'pending' or 'completed'"))
    }
}

#[derive(Debug, Deserialize)]
pub struct PriorityRequest {
    pub priority: Option<String>,
}

impl PriorityRequest {
    pub fn validate(self) -> Result<TaskPriority, AppError> {
        let raw = self
            .priority
            .ok_or_else(|| AppError::validation("Priority is required"))?;
        parse_priority(&raw)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub user_id: Option<String>,
}

impl AssignRequest {
    pub fn validate(self) -> Result<Uuid, AppError> {
        let raw = self
            .user_id
            .ok_or_else(|| AppError::validation("User ID is required"))?;
        parse_user_id(&raw)
    }
}

/// `GET /tasks` query: paging plus filter keys.
#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(rename = "assignedTo")]
    pub assigned_to: Option<String>,
}

impl ListTasksQuery {
    pub fn into_parts(self) -> Result<(PageRequest, TaskFilter), AppError> {
        let page = PageRequest::from_query(self.page.as_deref(), self.limit.as_deref());
        let filter = TaskFilter::try_from(&FilterQuery {
            status: self.status,
            priority: self.priority,
            assigned_to: self.assigned_to,
        })?;
        Ok((page, filter))
    }
}

fn valid_title(raw: &str) -> Result<String, AppError> {
    let title = raw.trim();
    let len = title.chars().count();
    if len == 0 {
        Err(AppError::validation("Task title is required"))
    } else if len < TITLE_MIN {
        Err(AppError::validation("Title must be at least 3 characters"))
    } else if len > TITLE_MAX {
        Err(AppError::validation("Title cannot exceed 100 characters"))
    } else {
        Ok(title.to_string())
    }
}

fn valid_description(raw: &str) -> Result<String, AppError> {
    let description = raw.trim();
    if description.is_empty() {
        Err(AppError::validation("Task description is required"))
    } else if description.chars().count() > DESCRIPTION_MAX {
        Err(AppError::validation("Description cannot exceed 500 characters"))
    } else {
        Ok(description.to_string())
    }
}

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub(crate) fn parse_due_date(raw: &str) -> Result<OffsetDateTime, AppError> {
    let raw = raw.trim();
    if let Ok(at) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(at);
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map(|d| d.midnight().assume_utc())
        .map_err(|_| AppError::validation("Due date must be a valid date"))
}

fn parse_priority(raw: &str) -> Result<TaskPriority, AppError> {
    raw.parse()
        .map_err(|_| AppError::validation("Priority must be 'low', 'medium', or 'high'"))
}

fn parse_user_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::validation("Invalid user ID format"))
}
