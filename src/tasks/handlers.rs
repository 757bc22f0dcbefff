use axum::{
    extract::{Query, State},
    routing::{get, patch, put},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{
        AssignRequest, CreateTaskRequest, ListTasksQuery, PriorityRequest, StatusRequest,
        UpdateTaskRequest,
    },
    filter::{FilterQuery, TaskFilter},
    model::Task,
    pagination::{Page, PageQuery, PageRequest},
};
use crate::{
    auth::AuthUser,
    error::AppError,
    extract::{ValidJson, ValidPath},
    response::ApiResponse,
    state::AppState,
};

type Reply<T> = Result<ApiResponse<T>, AppError>;

pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/tasks/my-tasks", get(my_tasks))
        .route("/tasks/filter", get(filter_tasks))
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/tasks/:id/status", patch(update_status))
        .route("/tasks/:id/priority", patch(update_priority))
        .route("/tasks/:id/assign", put(assign_task))
}

#[instrument(skip(state, body))]
pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    body: Result<ValidJson<CreateTaskRequest>, AppError>,
) -> Reply<Task> {
    state.tasks.ensure_can_create(&principal)?;
    let ValidJson(body) = body?;
    let input = body.validate()?;
    let task = state.tasks.create_task(input, &principal).await?;
    Ok(ApiResponse::created("Task created successfully", task))
}

#[instrument(skip(state))]
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(query): Query<ListTasksQuery>,
) -> Reply<Page<Task>> {
    let (page, filter) = query.into_parts()?;
    let tasks = state.tasks.list_tasks(&principal, page, filter).await?;
    Ok(ApiResponse::ok("Tasks retrieved successfully", tasks))
}

#[instrument(skip(state))]
pub async fn get_task(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ValidPath(id): ValidPath<Uuid>,
) -> Reply<Task> {
    let task = state.tasks.get_task_by_id(id, &principal).await?;
    Ok(ApiResponse::ok("Task retrieved successfully", task))
}

#[instrument(skip(state, body))]
pub async fn update_task(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(body): ValidJson<UpdateTaskRequest>,
) -> Reply<Task> {
    let changes = body.validate()?;
    let task = state.tasks.update_task(id, changes, &principal).await?;
    Ok(ApiResponse::ok("Task updated successfully", task))
}

#[instrument(skip(state))]
pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ValidPath(id): ValidPath<Uuid>,
) -> Reply<()> {
    state.tasks.delete_task(id, &principal).await?;
    Ok(ApiResponse::message("Task deleted successfully"))
}

#[instrument(skip(state, body))]
pub async fn update_status(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(body): ValidJson<StatusRequest>,
) -> Reply<Task> {
    let status = body.validate()?;
    let task = state.tasks.update_status(id, status, &principal).await?;
    Ok(ApiResponse::ok("Task status updated successfully", task))
}

#[instrument(skip(state, body))]
pub async fn update_priority(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(body): ValidJson<PriorityRequest>,
) -> Reply<Task> {
    let priority = body.validate()?;
    let task = state.tasks.update_priority(id, priority, &principal).await?;
    Ok(ApiResponse::ok("Task priority updated successfully", task))
}

#[instrument(skip(state))]
pub async fn my_tasks(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(query): Query<PageQuery>,
) -> Reply<Page<Task>> {
    let tasks = state
        .tasks
        .get_my_tasks(&principal, PageRequest::from(&query))
        .await?;
    Ok(ApiResponse::ok("My tasks retrieved successfully", tasks))
}

#[instrument(skip(state, body))]
pub async fn assign_task(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ValidPath(id): ValidPath<Uuid>,
    body: Result<ValidJson<AssignRequest>, AppError>,
) -> Reply<Task> {
    state.tasks.ensure_can_assign(&principal)?;
    let ValidJson(body) = body?;
    let user_id = body.validate()?;
    let task = state.tasks.assign_task(id, user_id, &principal).await?;
    Ok(ApiResponse::ok("Task assigned successfully", task))
}

#[instrument(skip(state))]
pub async fn filter_tasks(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(query): Query<FilterQuery>,
) -> Reply<Vec<Task>> {
    let filter = TaskFilter::try_from(&query)?;
    let tasks = state.tasks.filter_tasks(filter, &principal).await?;
    Ok(ApiResponse::ok("Filtered tasks retrieved successfully", tasks))
}
