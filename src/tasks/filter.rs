use serde::Deserialize;
use uuid::Uuid;

use super::model::{TaskPriority, TaskStatus};
#[cfg(test)]
use super::model::Task;
use crate::error::AppError;

/// AND-composed constraints; `None` means unconstrained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Uuid>,
}

impl TaskFilter {
    pub fn assigned_to(user_id: Uuid) -> Self {
        Self {
            assigned_to: Some(user_id),
            ..Self::default()
        }
    }

    /// Pins the filter to one assignee, overriding any requested assignee.
    pub fn scoped_to(self, user_id: Uuid) -> Self {
        Self {
            assigned_to: Some(user_id),
            ..self
        }
    }

    #[cfg(test)]
    pub fn matches(&self, task: &Task) -> bool {
        self.status.map_or(true, |s| task.status == s)
            && self.priority.map_or(true, |p| task.priority == p)
            && self.assigned_to.map_or(true, |u| task.assigned_to.id == u)
    }
}

/// Raw filter keys as they arrive in a query string. Other keys are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(rename = "assignedTo")]
    pub assigned_to: Option<String>,
}

impl TryFrom<&FilterQuery> for TaskFilter {
    type Error = AppError;

    fn try_from(q: &FilterQuery) -> Result<Self, Self::Error> {
        let status = present(&q.status)
            .map(|s| s.parse::<TaskStatus>())
            .transpose()
            .map_err(|_| AppError::validation("Status must be either 'pending' or 'completed'"))?;
        let priority = present(&q.priority)
            .map(|s| s.parse::<TaskPriority>())
            .transpose()
            .map_err(|_| AppError::validation("Priority must be 'low', 'medium', or 'high'"))?;
        let assigned_to = present(&q.assigned_to)
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|_| AppError::validation("Invalid user ID format"))?;
        Ok(Self {
            status,
            priority,
            assigned_to,
        })
    }
}

fn present(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(status: Option<&str>, priority: Option<&str>, assigned: Option<&str>) -> FilterQuery {
        FilterQuery {
            status: status.map(Into::into),
            priority: priority.map(Into::into),
            assigned_to: assigned.map(Into::into),
        }
    }

    #[test]
    fn absent_and_blank_keys_impose_nothing() {
        let f = TaskFilter::try_from(&query(None, Some(""), Some("  "))).unwrap();
        assert_eq!(f, TaskFilter::default());
    }

    #[test]
    fn parses_all_recognised_keys() {
        let id = Uuid::new_v4();
        let f = TaskFilter::try_from(&query(Some("completed"), Some("low"), Some(&id.to_string())))
            .unwrap();
        assert_eq!(f.status, Some(TaskStatus::Completed));
        assert_eq!(f.priority, Some(TaskPriority::Low));
        assert_eq!(f.assigned_to, Some(id));
    }

    #[test]
    fn rejects_unknown_enum_values() {
        let err = TaskFilter::try_from(&query(Some("done"), None, None)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = TaskFilter::try_from(&query(None, None, Some("42"))).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn scoping_overrides_requested_assignee() {
        let me = Uuid::new_v4();
        let f = TaskFilter {
            status: Some(TaskStatus::Pending),
            assigned_to: Some(Uuid::new_v4()),
            ..TaskFilter::default()
        }
        .scoped_to(me);
        assert_eq!(f.assigned_to, Some(me));
        assert_eq!(f.status, Some(TaskStatus::Pending));
    }

    #[test]
    fn unknown_query_keys_are_ignored() {
        let q: FilterQuery =
            serde_json::from_value(serde_json::json!({"status": "pending", "color": "red"}))
                .unwrap();
        let f = TaskFilter::try_from(&q).unwrap();
        assert_eq!(f.status, Some(TaskStatus::Pending));
    }
}
