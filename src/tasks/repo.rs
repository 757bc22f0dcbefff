use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    filter::TaskFilter,
    model::{NewTask, Task, TaskChanges, TaskRow},
    pagination::{Page, PageRequest},
};

/// Store-agnostic task persistence. Every read returns tasks with resolved user references,
/// newest first.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, task: NewTask) -> anyhow::Result<Task>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Task>>;
    async fn find_page(&self, filter: TaskFilter, page: PageRequest) -> anyhow::Result<Page<Task>>;
    async fn find_all(&self, filter: TaskFilter) -> anyhow::Result<Vec<Task>>;
    /// Returns `None` when the task no longer exists.
    async fn update(&self, id: Uuid, changes: TaskChanges) -> anyhow::Result<Option<Task>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

const TASK_COLUMNS: &str = "t.id, t.title, t.description, t.due_date, t.status, t.priority, \
     t.assigned_to, a.name AS assignee_name, a.email AS assignee_email, \
     t.created_by, c.name AS creator_name, c.email AS creator_email, \
     t.created_at, t.updated_at";

const USER_JOINS: &str =
    " LEFT JOIN users a ON a.id = t.assigned_to LEFT JOIN users c ON c.id = t.created_by";

const NEWEST_FIRST: &str = " ORDER BY t.created_at DESC, t.id DESC";

#[derive(Clone)]
pub struct PgTaskStore {
    db: PgPool,
}

impl PgTaskStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn select_tasks<'a>() -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new("SELECT ");
    qb.push(TASK_COLUMNS).push(" FROM tasks t").push(USER_JOINS);
    qb
}

/// Wraps a data-modifying statement in a CTE aliased `t` and selects the resolved row.
fn select_from_cte<'a>(qb: &mut QueryBuilder<'a, Postgres>) {
    qb.push(") SELECT ")
        .push(TASK_COLUMNS)
        .push(" FROM t")
        .push(USER_JOINS);
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &TaskFilter) {
    qb.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        qb.push(" AND t.status = ").push_bind(status.as_str());
    }
    if let Some(priority) = filter.priority {
        qb.push(" AND t.priority = ").push_bind(priority.as_str());
    }
    if let Some(user_id) = filter.assigned_to {
        qb.push(" AND t.assigned_to = ").push_bind(user_id);
    }
}

fn into_tasks(rows: Vec<TaskRow>) -> anyhow::Result<Vec<Task>> {
    rows.into_iter().map(Task::try_from).collect()
}

#[async_trait]
impl TaskRepository for PgTaskStore {
    async fn create(&self, task: NewTask) -> anyhow::Result<Task> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "WITH t AS (INSERT INTO tasks \
             (title, description, due_date, status, priority, assigned_to, created_by) VALUES (",
        );
        let mut values = qb.separated(", ");
        values
            .push_bind(task.title)
            .push_bind(task.description)
            .push_bind(task.due_date)
            .push_bind(task.status.as_str())
            .push_bind(task.priority.as_str())
            .push_bind(task.assigned_to)
            .push_bind(task.created_by);
        qb.push(") RETURNING *");
        select_from_cte(&mut qb);

        let row = qb.build_query_as::<TaskRow>().fetch_one(&self.db).await?;
        row.try_into()
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Task>> {
        let mut qb = select_tasks();
        qb.push(" WHERE t.id = ").push_bind(id);
        let row = qb.build_query_as::<TaskRow>().fetch_optional(&self.db).await?;
        row.map(Task::try_from).transpose()
    }

    async fn find_page(&self, filter: TaskFilter, page: PageRequest) -> anyhow::Result<Page<Task>> {
        let mut qb = select_tasks();
        push_filter(&mut qb, &filter);
        let (limit, offset) = limit_offset(page);
        qb.push(NEWEST_FIRST)
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let rows = qb.build_query_as::<TaskRow>().fetch_all(&self.db).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks t");
        push_filter(&mut count, &filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        Ok(Page::new(into_tasks(rows)?, u64::try_from(total)?, page))
    }

    async fn find_all(&self, filter: TaskFilter) -> anyhow::Result<Vec<Task>> {
        let mut qb = select_tasks();
        push_filter(&mut qb, &filter);
        qb.push(NEWEST_FIRST);
        let rows = qb.build_query_as::<TaskRow>().fetch_all(&self.db).await?;
        into_tasks(rows)
    }

    async fn update(&self, id: Uuid, changes: TaskChanges) -> anyhow::Result<Option<Task>> {
        let mut qb = QueryBuilder::<Postgres>::new("WITH t AS (UPDATE tasks SET updated_at = now()");
        if let Some(title) = changes.title {
            qb.push(", title = ").push_bind(title);
        }
        if let Some(description) = changes.description {
            qb.push(", description = ").push_bind(description);
        }
        if let Some(due_date) = changes.due_date {
            qb.push(", due_date = ").push_bind(due_date);
        }
        if let Some(status) = changes.status {
            qb.push(", status = ").push_bind(status.as_str());
        }
        if let Some(priority) = changes.priority {
            qb.push(", priority = ").push_bind(priority.as_str());
        }
        if let Some(user_id) = changes.assigned_to {
            qb.push(", assigned_to = ").push_bind(user_id);
        }
        qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");
        select_from_cte(&mut qb);

        let row = qb.build_query_as::<TaskRow>().fetch_optional(&self.db).await?;
        row.map(Task::try_from).transpose()
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

/// Offsets past `BIGINT` saturate; Postgres then returns no rows.
fn limit_offset(page: PageRequest) -> (i64, i64) {
    (
        i64::from(page.limit()),
        i64::try_from(page.offset()).unwrap_or(i64::MAX),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::model::{TaskPriority, TaskStatus};

    #[test]
    fn filter_composes_present_keys_with_and() {
        let mut qb = select_tasks();
        push_filter(
            &mut qb,
            &TaskFilter {
                status: Some(TaskStatus::Completed),
                priority: Some(TaskPriority::High),
                assigned_to: None,
            },
        );
        let sql = qb.sql();
        assert!(sql.contains("WHERE TRUE AND t.status = $1 AND t.priority = $2"));
        assert!(!sql.contains("assigned_to = $"));
    }

    #[test]
    fn empty_filter_has_no_predicates() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks t");
        push_filter(&mut qb, &TaskFilter::default());
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM tasks t WHERE TRUE");
    }

    #[test]
    fn window_saturates_instead_of_failing() {
        assert_eq!(limit_offset(PageRequest::new(3, 10)), (10, 20));
        let (limit, offset) = limit_offset(PageRequest::new(u32::MAX, u32::MAX));
        assert_eq!(limit, i64::from(u32::MAX));
        assert_eq!(offset, i64::MAX);
    }

    #[test]
    fn reads_resolve_both_user_references() {
        let sql = select_tasks().into_sql();
        assert!(sql.contains("LEFT JOIN users a ON a.id = t.assigned_to"));
        assert!(sql.contains("LEFT JOIN users c ON c.id = t.created_by"));
    }
}
