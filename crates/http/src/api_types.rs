//! Request and response DTOs.

use chrono::{DateTime, Utc};
use quill_core::{SectionDefinition, TaskOrdering};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user_id: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionCreateRequest {
    pub conversation_type: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct SessionCreateResponse {
    pub session_id: String,
    pub conversation_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskCreateRequest {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<i32>,
    pub due_date: Option<chrono::NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<chrono::NaiveDate>,
    pub is_completed: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct TaskReorderRequest {
    pub task_orders: Vec<TaskOrdering>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    #[serde(default)]
    pub include_completed: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct TemplateUpdateRequest {
    pub name: Option<String>,
    pub sections: Option<Vec<SectionDefinition>>,
}

/// The template in effect for the user, with its provenance.
#[derive(Debug, Serialize)]
pub struct TemplateResponse {
    pub name: String,
    pub sections: Vec<SectionDefinition>,
    /// "user" for a stored active template, "default" for the process-wide one.
    pub source: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
