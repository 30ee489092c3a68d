use crate::api::auth::CurrentUser;
use crate::domain::task::driven_ports::{TaskReader, TaskWriter};
use crate::domain::task::driving_ports::{TaskError, TaskPort};
use crate::external_connections::{ExternalConnectivity, Transactable, TransactionHandle};
use crate::persistence::db_task_driven_ports::{DbTaskReader, DbTaskWriter};
use crate::routing_utils::{
    BasicErrorResponse, GenericErrorResponse, Json, NotFoundResponse, Path, Query,
    ValidationErrorResponse,
};
use crate::{AppState, SharedData, domain, dto};
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::ErrorResponse;
use axum::routing::get;
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;
use validator::Validate;

/// Defines the OpenAPI spec for task endpoints
#[derive(OpenApi)]
#[openapi(paths(list_tasks, create_task, task_stats, get_task, update_task, delete_task))]
pub struct TaskApi;

/// Used to group task endpoints together in the OpenAPI documentation
pub const TASK_API_GROUP: &str = "Tasks";

/// Builds a router for the routes under "/tasks". Every route acts on the signed-in
/// user's own tasks.
pub fn task_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/",
            get(
                |State(app_state): AppState,
                 CurrentUser(user): CurrentUser,
                 Query(query): Query<dto::TaskListQuery>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService {};

                    list_tasks(user.id, query, &mut ext_cxn, &task_service, &DbTaskReader).await
                },
            )
            .post(
                |State(app_state): AppState,
                 CurrentUser(user): CurrentUser,
                 Json(new_task): Json<dto::NewTask>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService {};

                    create_task(user.id, new_task, &mut ext_cxn, &task_service, &DbTaskWriter).await
                },
            ),
        )
        .route(
            "/stats",
            get(
                |State(app_state): AppState, CurrentUser(user): CurrentUser| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService {};

                    task_stats(user.id, &mut ext_cxn, &task_service, &DbTaskReader).await
                },
            ),
        )
        .route(
            "/:task_id",
            get(
                |State(app_state): AppState,
                 CurrentUser(user): CurrentUser,
                 Path(task_id): Path<Uuid>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService {};

                    get_task(user.id, task_id, &mut ext_cxn, &task_service, &DbTaskReader).await
                },
            )
            .patch(
                |State(app_state): AppState,
                 CurrentUser(user): CurrentUser,
                 Path(task_id): Path<Uuid>,
                 Json(update): Json<dto::UpdateTask>| async move {
                    let mut txn = app_state
                        .ext_cxn
                        .start_transaction()
                        .await
                        .map_err(GenericErrorResponse)?;
                    let task_service = domain::task::TaskService {};

                    let updated = update_task(
                        user.id,
                        task_id,
                        update,
                        &mut txn,
                        &task_service,
                        &DbTaskReader,
                        &DbTaskWriter,
                    )
                    .await?;
                    txn.commit().await.map_err(GenericErrorResponse)?;

                    Ok::<_, ErrorResponse>(updated)
                },
            )
            .delete(
                |State(app_state): AppState,
                 CurrentUser(user): CurrentUser,
                 Path(task_id): Path<Uuid>| async move {
                    let mut txn = app_state
                        .ext_cxn
                        .start_transaction()
                        .await
                        .map_err(GenericErrorResponse)?;
                    let task_service = domain::task::TaskService {};

                    let deleted = delete_task(
                        user.id,
                        task_id,
                        &mut txn,
                        &task_service,
                        &DbTaskReader,
                        &DbTaskWriter,
                    )
                    .await?;
                    txn.commit().await.map_err(GenericErrorResponse)?;

                    Ok::<_, ErrorResponse>(deleted)
                },
            ),
        )
}

fn task_error_response(err: TaskError) -> ErrorResponse {
    match err {
        TaskError::NotFound => NotFoundResponse.into(),
        TaskError::PortError(cause) => GenericErrorResponse(cause).into(),
    }
}

#[utoipa::path(
    get,
    path = "/tasks",
    tag = TASK_API_GROUP,
    params(dto::TaskListQuery),
    security(("session_token" = [])),
    responses(
        (status = 200, description = "The signed-in user's tasks, newest first", body = Vec<dto::TaskRecord>),
        (status = 400, response = BasicErrorResponse),
        (status = 401, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Lists the signed-in user's tasks, optionally narrowed by status and priority
async fn list_tasks(
    user_id: Uuid,
    query: dto::TaskListQuery,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
    task_read: &impl TaskReader,
) -> Result<Json<Vec<dto::TaskRecord>>, ErrorResponse> {
    let filter = domain::task::TaskFilter::from(query);
    let tasks = task_service
        .list_tasks(user_id, &filter, ext_cxn, task_read)
        .await
        .map_err(task_error_response)?;

    Ok(Json(tasks.into_iter().map(dto::TaskRecord::from).collect()))
}

#[utoipa::path(
    post,
    path = "/tasks",
    tag = TASK_API_GROUP,
    request_body = dto::NewTask,
    security(("session_token" = [])),
    responses(
        (status = 201, description = "Task created", body = dto::TaskRecord),
        (status = 400, response = BasicErrorResponse),
        (status = 401, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Creates a task owned by the signed-in user
async fn create_task(
    user_id: Uuid,
    new_task: dto::NewTask,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
    task_write: &impl TaskWriter,
) -> Result<(StatusCode, Json<dto::TaskRecord>), ErrorResponse> {
    info!(%user_id, "Creating task");
    new_task.validate().map_err(ValidationErrorResponse::from)?;

    let created = task_service
        .create_task(user_id, &new_task.into(), ext_cxn, task_write)
        .await
        .map_err(task_error_response)?;

    Ok((StatusCode::CREATED, Json(dto::TaskRecord::from(created))))
}

#[utoipa::path(
    get,
    path = "/tasks/stats",
    tag = TASK_API_GROUP,
    security(("session_token" = [])),
    responses(
        (status = 200, description = "Counts of the signed-in user's tasks by status", body = dto::TaskStats),
        (status = 401, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Summarizes the signed-in user's tasks for the dashboard
async fn task_stats(
    user_id: Uuid,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
    task_read: &impl TaskReader,
) -> Result<Json<dto::TaskStats>, ErrorResponse> {
    let stats = task_service
        .task_stats(user_id, ext_cxn, task_read)
        .await
        .map_err(task_error_response)?;

    Ok(Json(dto::TaskStats::from(stats)))
}

#[utoipa::path(
    get,
    path = "/tasks/{task_id}",
    tag = TASK_API_GROUP,
    params(("task_id" = Uuid, Path, description = "ID of the task")),
    security(("session_token" = [])),
    responses(
        (status = 200, description = "The task", body = dto::TaskRecord),
        (status = 401, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Retrieves one of the signed-in user's tasks
async fn get_task(
    user_id: Uuid,
    task_id: Uuid,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
    task_read: &impl TaskReader,
) -> Result<Json<dto::TaskRecord>, ErrorResponse> {
    let task = task_service
        .get_task(user_id, task_id, ext_cxn, task_read)
        .await
        .map_err(task_error_response)?;

    Ok(Json(dto::TaskRecord::from(task)))
}

#[utoipa::path(
    patch,
    path = "/tasks/{task_id}",
    tag = TASK_API_GROUP,
    params(("task_id" = Uuid, Path, description = "ID of the task")),
    request_body = dto::UpdateTask,
    security(("session_token" = [])),
    responses(
        (status = 200, description = "The task after the update", body = dto::TaskRecord),
        (status = 400, response = BasicErrorResponse),
        (status = 401, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Applies a partial update to one of the signed-in user's tasks
async fn update_task(
    user_id: Uuid,
    task_id: Uuid,
    update: dto::UpdateTask,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
    task_read: &impl TaskReader,
    task_write: &impl TaskWriter,
) -> Result<Json<dto::TaskRecord>, ErrorResponse> {
    info!(%task_id, "Updating task");
    update.validate().map_err(ValidationErrorResponse::from)?;

    let updated = task_service
        .update_task(user_id, task_id, &update.into(), ext_cxn, task_read, task_write)
        .await
        .map_err(task_error_response)?;

    Ok(Json(dto::TaskRecord::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/tasks/{task_id}",
    tag = TASK_API_GROUP,
    params(("task_id" = Uuid, Path, description = "ID of the task")),
    security(("session_token" = [])),
    responses(
        (status = 200, description = "Task deleted", body = dto::DeletedTask),
        (status = 401, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Deletes one of the signed-in user's tasks
async fn delete_task(
    user_id: Uuid,
    task_id: Uuid,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
    task_read: &impl TaskReader,
    task_write: &impl TaskWriter,
) -> Result<Json<dto::DeletedTask>, ErrorResponse> {
    info!(%task_id, "Deleting task");
    let deleted_id = task_service
        .delete_task(user_id, task_id, ext_cxn, task_read, task_write)
        .await
        .map_err(task_error_response)?;

    Ok(Json(dto::DeletedTask {
        success: true,
        id: deleted_id,
    }))
}
