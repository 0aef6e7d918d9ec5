//! Preference and template endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use quill_core::{new_id, JournalTemplate, PreferencesUpdate, UserPreferences, UserTemplate};

use crate::api_error::ApiError;
use crate::api_types::{TemplateResponse, TemplateUpdateRequest};
use crate::extract::AuthUser;
use crate::AppState;

pub async fn get_preferences(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<UserPreferences>, ApiError> {
    let mut tx = state.store.begin().await?;
    let prefs = tx.get_or_create_preferences(&user.id).await?;
    tx.commit().await?;
    Ok(Json(prefs))
}

pub async fn update_preferences(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(update): Json<PreferencesUpdate>,
) -> Result<Json<UserPreferences>, ApiError> {
    let mut tx = state.store.begin().await?;
    let mut prefs = tx.get_or_create_preferences(&user.id).await?;
    update.apply_to(&mut prefs);
    tx.upsert_preferences(&prefs).await?;
    tx.commit().await?;
    Ok(Json(prefs))
}

pub async fn get_template(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<TemplateResponse>, ApiError> {
    let mut tx = state.store.begin().await?;
    if let Some(stored) = tx.get_active_template(&user.id).await? {
        return Ok(Json(TemplateResponse {
            name: stored.template.name,
            sections: stored.template.sections,
            source: "user",
        }));
    }
    let default = state.templates.default_template();
    Ok(Json(TemplateResponse {
        name: default.name.clone(),
        sections: default.sections.clone(),
        source: "default",
    }))
}

/// Create or update the user's active template. Absent fields fall back to
/// the template currently in effect, so partial updates compose.
pub async fn update_template(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(update): Json<TemplateUpdateRequest>,
) -> Result<Json<TemplateResponse>, ApiError> {
    if let Some(ref sections) = update.sections {
        if sections.is_empty() {
            return Err(ApiError::BadRequest("a template needs at least one section".into()));
        }
    }

    let mut tx = state.store.begin().await?;
    let existing = tx.get_active_template(&user.id).await?;
    let base: JournalTemplate = match &existing {
        Some(stored) => stored.template.clone(),
        None => (*state.templates.default_template()).clone(),
    };

    let template = JournalTemplate {
        name: update.name.unwrap_or(base.name),
        sections: update.sections.unwrap_or(base.sections),
    };
    let row = match existing {
        Some(mut stored) => {
            stored.template = template;
            stored.updated_at = chrono::Utc::now();
            stored
        },
        None => UserTemplate::new(new_id(), user.id.clone(), template),
    };
    tx.upsert_active_template(&row).await?;
    tx.commit().await?;

    Ok(Json(TemplateResponse {
        name: row.template.name,
        sections: row.template.sections,
        source: "user",
    }))
}
