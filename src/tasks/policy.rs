//! Who may do what to a task.
//!
//! Every decision goes through [`authorize`] (or [`authorize_role`] when the
//! task has not been loaded), which reads the [`grant`] table.

use crate::{auth::Principal, error::AppError};

use super::model::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    View,
    Edit,
    Delete,
    ChangeStatus,
    ChangePriority,
    Reassign,
}

impl Action {
    fn denial(self) -> &'static str {
        match self {
            Action::Create => "Only admins can create tasks",
            Action::View => "Not authorized to view this task",
            Action::Edit => "Not authorized to update this task",
            Action::Delete => "Not authorized to delete this task",
            Action::ChangeStatus => "Not authorized to update this task status",
            Action::ChangePriority => "Not authorized to update task priority",
            Action::Reassign => "Only admins can assign tasks",
        }
    }
}

/// Relationships that unlock an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    pub admin: bool,
    pub assignee: bool,
    pub creator: bool,
}

const ADMIN_ONLY: Grant = Grant { admin: true, assignee: false, creator: false };
const ADMIN_OR_ASSIGNEE: Grant = Grant { admin: true, assignee: true, creator: false };
const ADMIN_OR_CREATOR: Grant = Grant { admin: true, assignee: false, creator: true };

pub const fn grant(action: Action) -> Grant {
    match action {
        Action::Create => ADMIN_ONLY,
        Action::View => ADMIN_OR_ASSIGNEE,
        Action::Edit => ADMIN_OR_CREATOR,
        Action::Delete => ADMIN_OR_CREATOR,
        Action::ChangeStatus => ADMIN_OR_ASSIGNEE,
        Action::ChangePriority => ADMIN_OR_CREATOR,
        Action::Reassign => ADMIN_ONLY,
    }
}

/// How a principal relates to a task. Roles overlap: a creator may also be the assignee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Relationship {
    pub admin: bool,
    pub assignee: bool,
    pub creator: bool,
}

impl Relationship {
    pub fn of(principal: &Principal, task: &Task) -> Self {
        Self {
            admin: principal.is_admin(),
            assignee: task.assigned_to.id == principal.id,
            creator: task.created_by.id == principal.id,
        }
    }

    fn role_only(principal: &Principal) -> Self {
        Self {
            admin: principal.is_admin(),
            ..Self::default()
        }
    }

    fn allows(&self, g: Grant) -> bool {
        (g.admin && self.admin) || (g.assignee && self.assignee) || (g.creator && self.creator)
    }
}

pub fn authorize(action: Action, principal: &Principal, task: &Task) -> Result<(), AppError> {
    check(action, Relationship::of(principal, task))
}

/// Decides from the role alone; used before the task is loaded.
pub fn authorize_role(action: Action, principal: &Principal) -> Result<(), AppError> {
    check(action, Relationship::role_only(principal))
}

fn check(action: Action, rel: Relationship) -> Result<(), AppError> {
    if rel.allows(grant(action)) {
        Ok(())
    } else {
        Err(AppError::forbidden(action.denial()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{Role, UserSummary};
    use time::macros::datetime;
    use uuid::Uuid;

    use crate::tasks::model::{TaskPriority, TaskStatus};

    fn task(assignee: Uuid, creator: Uuid) -> Task {
        let summary = |id| UserSummary { id, name: None, email: None };
        Task {
            id: Uuid::new_v4(),
            title: "Write report".into(),
            description: String::new(),
            due_date: datetime!(2025-03-01 0:00 UTC),
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
            assigned_to: summary(assignee),
            created_by: summary(creator),
            created_at: datetime!(2025-01-01 0:00 UTC),
            updated_at: datetime!(2025-01-01 0:00 UTC),
        }
    }

    const ALL: [Action; 7] = [
        Action::Create,
        Action::View,
        Action::Edit,
        Action::Delete,
        Action::ChangeStatus,
        Action::ChangePriority,
        Action::Reassign,
    ];

    #[test]
    fn admin_may_do_everything() {
        let admin = Principal::new(Uuid::new_v4(), Role::Admin);
        let t = task(Uuid::new_v4(), Uuid::new_v4());
        for action in ALL {
            assert!(authorize(action, &admin, &t).is_ok(), "{action:?}");
        }
    }

    #[test]
    fn assignee_may_view_and_change_status_only() {
        let me = Principal::new(Uuid::new_v4(), Role::User);
        let t = task(me.id, Uuid::new_v4());
        let allowed: Vec<_> = ALL
            .into_iter()
            .filter(|a| authorize(*a, &me, &t).is_ok())
            .collect();
        assert_eq!(allowed, vec![Action::View, Action::ChangeStatus]);
    }

    #[test]
    fn creator_may_edit_delete_and_reprioritise() {
        let me = Principal::new(Uuid::new_v4(), Role::User);
        let t = task(Uuid::new_v4(), me.id);
        let allowed: Vec<_> = ALL
            .into_iter()
            .filter(|a| authorize(*a, &me, &t).is_ok())
            .collect();
        assert_eq!(
            allowed,
            vec![Action::Edit, Action::Delete, Action::ChangePriority]
        );
    }

    #[test]
    fn creator_who_is_also_assignee_gets_both_sets() {
        let me = Principal::new(Uuid::new_v4(), Role::User);
        let t = task(me.id, me.id);
        assert!(authorize(Action::View, &me, &t).is_ok());
        assert!(authorize(Action::ChangeStatus, &me, &t).is_ok());
        assert!(authorize(Action::Edit, &me, &t).is_ok());
        assert!(authorize(Action::Reassign, &me, &t).is_err());
    }

    #[test]
    fn stranger_is_denied_with_action_specific_message() {
        let me = Principal::new(Uuid::new_v4(), Role::User);
        let t = task(Uuid::new_v4(), Uuid::new_v4());
        for action in ALL {
            match authorize(action, &me, &t) {
                Err(AppError::Forbidden(msg)) => assert_eq!(msg, action.denial()),
                other => panic!("{action:?}: expected forbidden, got {other:?}"),
            }
        }
    }

    #[test]
    fn role_only_check_ignores_relationships() {
        let user = Principal::new(Uuid::new_v4(), Role::User);
        let admin = Principal::new(Uuid::new_v4(), Role::Admin);
        assert!(authorize_role(Action::Reassign, &user).is_err());
        assert!(authorize_role(Action::Create, &user).is_err());
        assert!(authorize_role(Action::Reassign, &admin).is_ok());
    }
}
