//! Task endpoints. Mutations hold the user's task lock for the duration of
//! their transaction so concurrent requests cannot leave priority gaps.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use quill_core::Task;

use crate::api_error::ApiError;
use crate::api_types::{
    MessageResponse, TaskCreateRequest, TaskListQuery, TaskReorderRequest, TaskUpdateRequest,
};
use crate::extract::AuthUser;
use crate::AppState;

pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let mut tx = state.store.begin().await?;
    let tasks = tx.list_tasks(&user.id, query.include_completed).await?;
    Ok(Json(tasks))
}

pub async fn create_task(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<TaskCreateRequest>,
) -> Result<Json<Task>, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("task title must not be empty".into()));
    }
    let mut tx = state.store.begin().await?;
    tx.lock_user_tasks(&user.id).await?;
    let task = tx
        .insert_task(
            &user.id,
            req.title.trim(),
            req.description.as_deref(),
            req.priority,
            req.due_date,
            None,
        )
        .await?;
    tx.commit().await?;
    Ok(Json(task))
}

pub async fn update_task(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(task_id): Path<String>,
    Json(req): Json<TaskUpdateRequest>,
) -> Result<Json<Task>, ApiError> {
    let mut tx = state.store.begin().await?;
    tx.lock_user_tasks(&user.id).await?;

    // Completion flows through complete_task so priorities recompact.
    let task = match req.is_completed {
        Some(true) => {
            let task = tx.complete_task(&user.id, &task_id).await?;
            if req.title.is_some() || req.description.is_some() || req.due_date.is_some() {
                tx.update_task(
                    &user.id,
                    &task_id,
                    req.title.as_deref(),
                    req.description.as_deref(),
                    req.due_date,
                )
                .await?
            } else {
                task
            }
        },
        Some(false) => {
            return Err(ApiError::Conflict("reopening a completed task is not supported".into()));
        },
        None => {
            tx.update_task(
                &user.id,
                &task_id,
                req.title.as_deref(),
                req.description.as_deref(),
                req.due_date,
            )
            .await?
        },
    };
    tx.commit().await?;
    Ok(Json(task))
}

pub async fn complete_task(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let mut tx = state.store.begin().await?;
    tx.lock_user_tasks(&user.id).await?;
    let task = tx.complete_task(&user.id, &task_id).await?;
    tx.commit().await?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(task_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut tx = state.store.begin().await?;
    tx.lock_user_tasks(&user.id).await?;
    if !tx.delete_task(&user.id, &task_id).await? {
        return Err(ApiError::NotFound("task not found".into()));
    }
    tx.commit().await?;
    Ok(Json(MessageResponse { message: "task deleted".into() }))
}

pub async fn reorder_tasks(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<TaskReorderRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut tx = state.store.begin().await?;
    tx.lock_user_tasks(&user.id).await?;
    tx.reorder_tasks(&user.id, &req.task_orders).await?;
    tx.commit().await?;
    Ok(Json(MessageResponse { message: "tasks reordered".into() }))
}
