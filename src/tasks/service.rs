use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    filter::TaskFilter,
    model::{CreateTask, NewTask, Task, TaskChanges, TaskPriority, TaskStatus},
    pagination::{Page, PageRequest},
    policy::{authorize, authorize_role, Action},
    repo::TaskRepository,
};
use crate::{auth::Principal, config::FilterScope, error::AppError, users::UserLookup};

/// Gatekeeper for every task read and mutation.
pub struct TaskService {
    tasks: Arc<dyn TaskRepository>,
    users: Arc<dyn UserLookup>,
    filter_scope: FilterScope,
}

impl TaskService {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        users: Arc<dyn UserLookup>,
        filter_scope: FilterScope,
    ) -> Self {
        Self {
            tasks,
            users,
            filter_scope,
        }
    }

    /// Role-only check for creation, usable before the request body is read.
    pub fn ensure_can_create(&self, principal: &Principal) -> Result<(), AppError> {
        self.guard_role(Action::Create, principal)
    }

    /// Role-only check for reassignment, usable before the request body is read.
    pub fn ensure_can_assign(&self, principal: &Principal) -> Result<(), AppError> {
        self.guard_role(Action::Reassign, principal)
    }

    #[instrument(skip(self, input), fields(principal = %principal.id))]
    pub async fn create_task(&self, input: CreateTask, principal: &Principal) -> Result<Task, AppError> {
        self.guard_role(Action::Create, principal)?;
        self.require_user(input.assigned_to, "Assigned user not found").await?;

        let task = self
            .tasks
            .create(NewTask::from_input(input, principal.id))
            .await?;
        info!(task_id = %task.id, assignee = %task.assigned_to.id, "task created");
        Ok(task)
    }

    #[instrument(skip(self), fields(principal = %principal.id))]
    pub async fn get_task_by_id(&self, task_id: Uuid, principal: &Principal) -> Result<Task, AppError> {
        let task = self.load(task_id).await?;
        self.guard(Action::View, principal, &task)?;
        Ok(task)
    }

    #[instrument(skip(self), fields(principal = %principal.id))]
    pub async fn list_tasks(
        &self,
        principal: &Principal,
        page: PageRequest,
        filter: TaskFilter,
    ) -> Result<Page<Task>, AppError> {
        let filter = visible_to(principal, filter);
        let page = self.tasks.find_page(filter, page).await?;
        debug!(total = page.total_items, "tasks listed");
        Ok(page)
    }

    #[instrument(skip(self, changes), fields(principal = %principal.id))]
    pub async fn update_task(
        &self,
        task_id: Uuid,
        changes: TaskChanges,
        principal: &Principal,
    ) -> Result<Task, AppError> {
        let task = self.load(task_id).await?;
        self.guard(Action::Edit, principal, &task)?;
        if let Some(user_id) = changes.assigned_to {
            self.require_user(user_id, "Assigned user not found").await?;
        }

        let updated = self.apply(task_id, changes).await?;
        info!(task_id = %task_id, "task updated");
        Ok(updated)
    }

    #[instrument(skip(self), fields(principal = %principal.id))]
    pub async fn delete_task(&self, task_id: Uuid, principal: &Principal) -> Result<(), AppError> {
        let task = self.load(task_id).await?;
        self.guard(Action::Delete, principal, &task)?;

        if !self.tasks.delete(task_id).await? {
            return Err(AppError::not_found("Task not found"));
        }
        info!(task_id = %task_id, "task deleted");
        Ok(())
    }

    /// Any transition is allowed, including completed back to pending.
    #[instrument(skip(self), fields(principal = %principal.id))]
    pub async fn update_status(
        &self,
        task_id: Uuid,
        status: TaskStatus,
        principal: &Principal,
    ) -> Result<Task, AppError> {
        let task = self.load(task_id).await?;
        self.guard(Action::ChangeStatus, principal, &task)?;

        let updated = self.apply(task_id, TaskChanges::status(status)).await?;
        info!(task_id = %task_id, status = status.as_str(), "task status changed");
        Ok(updated)
    }

    #[instrument(skip(self), fields(principal = %principal.id))]
    pub async fn update_priority(
        &self,
        task_id: Uuid,
        priority: TaskPriority,
        principal: &Principal,
    ) -> Result<Task, AppError> {
        let task = self.load(task_id).await?;
        self.guard(Action::ChangePriority, principal, &task)?;

        let updated = self.apply(task_id, TaskChanges::priority(priority)).await?;
        info!(task_id = %task_id, priority = priority.as_str(), "task priority changed");
        Ok(updated)
    }

    /// Tasks assigned to the caller, whatever their role.
    #[instrument(skip(self), fields(principal = %principal.id))]
    pub async fn get_my_tasks(&self, principal: &Principal, page: PageRequest) -> Result<Page<Task>, AppError> {
        Ok(self
            .tasks
            .find_page(TaskFilter::assigned_to(principal.id), page)
            .await?)
    }

    /// Permission is checked before the task or the new assignee is looked up.
    #[instrument(skip(self), fields(principal = %principal.id))]
    pub async fn assign_task(
        &self,
        task_id: Uuid,
        assignee: Uuid,
        principal: &Principal,
    ) -> Result<Task, AppError> {
        self.guard_role(Action::Reassign, principal)?;
        self.load(task_id).await?;
        self.require_user(assignee, "User not found").await?;

        let updated = self.apply(task_id, TaskChanges::assignee(assignee)).await?;
        info!(task_id = %task_id, assignee = %assignee, "task reassigned");
        Ok(updated)
    }

    /// Unpaginated listing. Scoped like [`Self::list_tasks`] unless configured as unscoped.
    #[instrument(skip(self), fields(principal = %principal.id))]
    pub async fn filter_tasks(&self, filter: TaskFilter, principal: &Principal) -> Result<Vec<Task>, AppError> {
        let filter = match self.filter_scope {
            FilterScope::Principal => visible_to(principal, filter),
            FilterScope::Unscoped => filter,
        };
        Ok(self.tasks.find_all(filter).await?)
    }

    async fn load(&self, task_id: Uuid) -> Result<Task, AppError> {
        self.tasks
            .find_by_id(task_id)
            .await?
            .ok_or_else(|| AppError::not_found("Task not found"))
    }

    async fn apply(&self, task_id: Uuid, changes: TaskChanges) -> Result<Task, AppError> {
        // the task may have been deleted between the check and the write
        self.tasks
            .update(task_id, changes)
            .await?
            .ok_or_else(|| AppError::not_found("Task not found"))
    }

    async fn require_user(&self, user_id: Uuid, missing: &str) -> Result<(), AppError> {
        match self.users.find_by_id(user_id).await? {
            Some(_) => Ok(()),
            None => {
                debug!(%user_id, "referenced user does not exist");
                Err(AppError::not_found(missing))
            }
        }
    }

    fn guard(&self, action: Action, principal: &Principal, task: &Task) -> Result<(), AppError> {
        authorize(action, principal, task).inspect_err(|_| {
            warn!(?action, task_id = %task.id, user_id = %principal.id, "access denied");
        })
    }

    fn guard_role(&self, action: Action, principal: &Principal) -> Result<(), AppError> {
        authorize_role(action, principal).inspect_err(|_| {
            warn!(?action, user_id = %principal.id, "access denied");
        })
    }
}

/// Admins see everything; everyone else only their own assignments.
fn visible_to(principal: &Principal, filter: TaskFilter) -> TaskFilter {
    if principal.is_admin() {
        filter
    } else {
        filter.scoped_to(principal.id)
    }
}
