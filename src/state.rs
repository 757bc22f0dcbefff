use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::tasks::{PgTaskStore, TaskService};
use crate::users::{PgUserStore, UserRegistry};

/// Explicitly constructed collaborators handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRegistry>,
    pub tasks: Arc<TaskService>,
}

impl AppState {
    pub fn postgres(config: Arc<AppConfig>, db: PgPool) -> Self {
        let users = Arc::new(PgUserStore::new(db.clone()));
        let tasks = Arc::new(TaskService::new(
            Arc::new(PgTaskStore::new(db)),
            users.clone(),
            config.filter_scope,
        ));
        Self::from_parts(config, users, tasks)
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserRegistry>,
        tasks: Arc<TaskService>,
    ) -> Self {
        Self {
            config,
            users,
            tasks,
        }
    }

    #[cfg(test)]
    pub fn in_memory(
        store: Arc<crate::testing::InMemoryStore>,
        filter_scope: crate::config::FilterScope,
    ) -> Self {
        let config = Arc::new(AppConfig {
            database_url: "postgres://unused".into(),
            db_max_connections: 1,
            host: "127.0.0.1".into(),
            port: 0,
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            filter_scope,
            admin: None,
        });
        let tasks = Arc::new(TaskService::new(store.clone(), store.clone(), filter_scope));
        Self::from_parts(config, store, tasks)
    }
}
