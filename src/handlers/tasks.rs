use crate::db::task_repository::TaskRepository;
use crate::errors::AppError;
use crate::models::task::{NewTask, TaskPatch};
use crate::models::user::Claims;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DeleteTaskResponse {
    pub message: String,
    pub id: String,
}

/// List the caller's tasks, newest first
#[utoipa::path(
    get,
    path = "/api/tasks",
    responses(
        (status = 200, description = "Tasks owned by the caller", body = [crate::models::task::Task]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Tasks"
)]
pub async fn list_tasks(
    claims: web::ReqData<Claims>,
    task_repo: web::Data<TaskRepository>,
) -> Result<HttpResponse, AppError> {
    let tasks = task_repo.list(&claims.sub).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Create a task owned by the caller
#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = NewTask,
    responses(
        (status = 201, description = "Task created", body = crate::models::task::Task),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorBody),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Tasks"
)]
pub async fn create_task(
    claims: web::ReqData<Claims>,
    task_repo: web::Data<TaskRepository>,
    payload: web::Json<NewTask>,
) -> Result<HttpResponse, AppError> {
    let task = task_repo
        .create(&claims.sub, payload.into_inner())
        .await
        .map_err(|e| {
            if let AppError::Validation(_) = e {
                warn!(user_id = %claims.sub, error = %e, "Task rejected");
            }
            e
        })?;

    info!(user_id = %claims.sub, task_id = %task.id, "User created task");

    Ok(HttpResponse::Created().json(task))
}

/// Update any subset of title, description and completed
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    params(
        ("id" = String, Path, description = "Task id")
    ),
    request_body = TaskPatch,
    responses(
        (status = 200, description = "Task updated", body = crate::models::task::Task),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorBody),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorBody),
        (status = 404, description = "No such task for this user", body = crate::errors::ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Tasks"
)]
pub async fn update_task(
    claims: web::ReqData<Claims>,
    task_repo: web::Data<TaskRepository>,
    path: web::Path<String>,
    payload: web::Json<TaskPatch>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let task = task_repo
        .update(&claims.sub, &id, payload.into_inner())
        .await?;

    info!(user_id = %claims.sub, task_id = %id, completed = task.completed, "User updated task");

    Ok(HttpResponse::Ok().json(task))
}

/// Delete one of the caller's tasks
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    params(
        ("id" = String, Path, description = "Task id")
    ),
    responses(
        (status = 200, description = "Task deleted", body = DeleteTaskResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorBody),
        (status = 404, description = "No such task for this user", body = crate::errors::ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Tasks"
)]
pub async fn delete_task(
    claims: web::ReqData<Claims>,
    task_repo: web::Data<TaskRepository>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    task_repo.delete(&claims.sub, &id).await?;

    info!(user_id = %claims.sub, task_id = %id, "User deleted task");

    Ok(HttpResponse::Ok().json(DeleteTaskResponse {
        message: "Task deleted".to_string(),
        id,
    }))
}
