//! In-memory stores for unit and router tests.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::Principal,
    tasks::{NewTask, Page, PageRequest, Task, TaskChanges, TaskFilter, TaskRepository},
    users::{NewUser, Role, User, UserLookup, UserRegistry, UserSummary},
};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    // (insertion sequence, task); sequence breaks created_at ties
    tasks: Vec<(u64, Task)>,
    next_seq: u64,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub async fn seed_user(&self, name: &str, role: Role) -> Principal {
        let email = format!("{}@example.com", name.to_lowercase());
        let user = UserRegistry::create(
            self,
            NewUser {
                name,
                email: &email,
                role,
                password_hash: "not-a-hash",
            },
        )
        .await
        .expect("seed user");
        Principal::new(user.id, user.role)
    }

    pub async fn task_count(&self) -> usize {
        self.inner.read().await.tasks.len()
    }
}

impl Inner {
    fn summary(&self, id: Uuid) -> UserSummary {
        self.users.get(&id).map(UserSummary::from).unwrap_or(UserSummary {
            id,
            name: None,
            email: None,
        })
    }

    fn newest_first(&self, filter: &TaskFilter) -> Vec<Task> {
        let mut hits: Vec<_> = self
            .tasks
            .iter()
            .filter(|(_, t)| filter.matches(t))
            .collect();
        hits.sort_by(|(sa, a), (sb, b)| b.created_at.cmp(&a.created_at).then(sb.cmp(sa)));
        hits.into_iter().map(|(_, t)| t.clone()).collect()
    }
}

#[async_trait]
impl UserLookup for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl UserRegistry for InMemoryStore {
    async fn create(&self, user: NewUser<'_>) -> anyhow::Result<User> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == user.email) {
            anyhow::bail!("duplicate email {}", user.email);
        }
        let created = User {
            id: Uuid::new_v4(),
            name: user.name.to_string(),
            email: user.email.to_string(),
            role: user.role,
            password_hash: user.password_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        inner.users.insert(created.id, created.clone());
        Ok(created)
    }
}

#[async_trait]
impl TaskRepository for InMemoryStore {
    async fn create(&self, task: NewTask) -> anyhow::Result<Task> {
        let mut inner = self.inner.write().await;
        let now = OffsetDateTime::now_utc();
        let created = Task {
            id: Uuid::new_v4(),
            title: task.title,
            description: task.description,
            due_date: task.due_date,
            status: task.status,
            priority: task.priority,
            assigned_to: inner.summary(task.assigned_to),
            created_by: inner.summary(task.created_by),
            created_at: now,
            updated_at: now,
        };
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.tasks.push((seq, created.clone()));
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Task>> {
        let inner = self.inner.read().await;
        Ok(inner.tasks.iter().find(|(_, t)| t.id == id).map(|(_, t)| t.clone()))
    }

    async fn find_page(&self, filter: TaskFilter, page: PageRequest) -> anyhow::Result<Page<Task>> {
        let inner = self.inner.read().await;
        let all = inner.newest_first(&filter);
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit() as usize)
            .collect();
        Ok(Page::new(items, total, page))
    }

    async fn find_all(&self, filter: TaskFilter) -> anyhow::Result<Vec<Task>> {
        Ok(self.inner.read().await.newest_first(&filter))
    }

    async fn update(&self, id: Uuid, changes: TaskChanges) -> anyhow::Result<Option<Task>> {
        let mut inner = self.inner.write().await;
        let assignee = changes.assigned_to.map(|u| inner.summary(u));
        let Some((_, task)) = inner.tasks.iter_mut().find(|(_, t)| t.id == id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            task.title = title;
        }
        if let Some(description) = changes.description {
            task.description = description;
        }
        if let Some(due_date) = changes.due_date {
            task.due_date = due_date;
        }
        if let Some(status) = changes.status {
            task.status = status;
        }
        if let Some(priority) = changes.priority {
            task.priority = priority;
        }
        if let Some(assignee) = assignee {
            task.assigned_to = assignee;
        }
        task.updated_at = OffsetDateTime::now_utc();
        Ok(Some(task.clone()))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.tasks.len();
        inner.tasks.retain(|(_, t)| t.id != id);
        Ok(inner.tasks.len() < before)
    }
}
