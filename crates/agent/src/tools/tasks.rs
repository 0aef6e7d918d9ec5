//! Task tools. Same semantics as the HTTP task endpoints; every mutation
//! takes the user's task lock so concurrent turns cannot leave gaps.

use quill_storage::StorageError;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AgentError;
use crate::tools::{parse_args, ToolEnv, ToolOutcome};

#[derive(Debug, Deserialize)]
struct CreateArgs {
    title: String,
    description: Option<String>,
    priority: Option<i32>,
    due_date: Option<String>,
}

pub async fn create_task(env: &mut ToolEnv<'_>, args: &Value) -> Result<ToolOutcome, AgentError> {
    let args: CreateArgs = match parse_args(args) {
        Ok(a) => a,
        Err(outcome) => return Ok(outcome),
    };
    if args.title.trim().is_empty() {
        return Ok(ToolOutcome::error(json!({"error": "task title must not be empty"})));
    }
    let due_date = match args.due_date.as_deref().map(str::parse::<chrono::NaiveDate>) {
        None => None,
        Some(Ok(date)) => Some(date),
        Some(Err(_)) => {
            return Ok(ToolOutcome::error(json!({
                "error": "due_date must be an ISO date (YYYY-MM-DD)"
            })));
        },
    };

    let user_id = env.ctx.user_id.clone();
    let session_id = env.ctx.session_id.clone();
    env.tx.lock_user_tasks(&user_id).await?;
    let task = env
        .tx
        .insert_task(
            &user_id,
            args.title.trim(),
            args.description.as_deref(),
            args.priority,
            due_date,
            Some(session_id.as_str()),
        )
        .await?;

    Ok(ToolOutcome::ok(json!({
        "status": "created",
        "task": task,
        "message": format!("Task '{}' created at priority {}", task.title, task.priority)
    })))
}

#[derive(Debug, Deserialize, Default)]
struct ListArgs {
    #[serde(default)]
    include_completed: bool,
}

pub async fn list_tasks(env: &mut ToolEnv<'_>, args: &Value) -> Result<ToolOutcome, AgentError> {
    let args: ListArgs = match parse_args(args) {
        Ok(a) => a,
        Err(outcome) => return Ok(outcome),
    };
    let user_id = env.ctx.user_id.clone();
    let tasks = env.tx.list_tasks(&user_id, args.include_completed).await?;
    Ok(ToolOutcome::ok(json!({
        "count": tasks.len(),
        "tasks": tasks
    })))
}

#[derive(Debug, Deserialize)]
struct TaskIdArgs {
    task_id: String,
}

pub async fn complete_task(env: &mut ToolEnv<'_>, args: &Value) -> Result<ToolOutcome, AgentError> {
    let args: TaskIdArgs = match parse_args(args) {
        Ok(a) => a,
        Err(outcome) => return Ok(outcome),
    };
    let user_id = env.ctx.user_id.clone();
    env.tx.lock_user_tasks(&user_id).await?;
    match env.tx.complete_task(&user_id, &args.task_id).await {
        Ok(task) => Ok(ToolOutcome::ok(json!({
            "status": "completed",
            "task": task,
            "message": format!("Task '{}' marked as completed", task.title)
        }))),
        Err(StorageError::NotFound { .. }) => {
            Ok(ToolOutcome::error(json!({"error": "task not found"})))
        },
        Err(StorageError::Conflict(_)) => Ok(ToolOutcome::ok(json!({
            "status": "already_completed",
            "message": "that task is already completed"
        }))),
        Err(e) => Err(e.into()),
    }
}

pub async fn delete_task(env: &mut ToolEnv<'_>, args: &Value) -> Result<ToolOutcome, AgentError> {
    let args: TaskIdArgs = match parse_args(args) {
        Ok(a) => a,
        Err(outcome) => return Ok(outcome),
    };
    let user_id = env.ctx.user_id.clone();
    env.tx.lock_user_tasks(&user_id).await?;
    if env.tx.delete_task(&user_id, &args.task_id).await? {
        Ok(ToolOutcome::ok(json!({"status": "deleted"})))
    } else {
        Ok(ToolOutcome::error(json!({"error": "task not found"})))
    }
}
