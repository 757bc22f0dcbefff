use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::model::{Role, User, UserRow};

/// Read side used to validate user references.
#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
}

pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub role: Role,
    pub password_hash: &'a str,
}

#[async_trait]
pub trait UserRegistry: UserLookup {
    async fn create(&self, user: NewUser<'_>) -> anyhow::Result<User>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserLookup for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, role, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, role, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        row.map(User::try_from).transpose()
    }
}

#[async_trait]
impl UserRegistry for PgUserStore {
    async fn create(&self, user: NewUser<'_>) -> anyhow::Result<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (name, email, role, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, role, password_hash, created_at
            "#,
        )
        .bind(user.name)
        .bind(user.email)
        .bind(user.role.as_str())
        .bind(user.password_hash)
        .fetch_one(&self.db)
        .await?;
        row.try_into()
    }
}
