mod dto;
mod filter;
pub mod handlers;
mod model;
mod pagination;
mod policy;
mod repo;
mod service;

use crate::state::AppState;
use axum::Router;

pub use repo::PgTaskStore;
pub use service::TaskService;

#[cfg(test)]
pub use filter::TaskFilter;
#[cfg(test)]
pub use model::{NewTask, Task, TaskChanges};
#[cfg(test)]
pub use pagination::{Page, PageRequest};
#[cfg(test)]
pub use repo::TaskRepository;

pub fn router() -> Router<AppState> {
    handlers::task_routes()
}
