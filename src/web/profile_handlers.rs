// src/web/profile_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::profile::SessionContext,
    services::user_service,
    state::AppState,
    templates::{render, ProfilePage},
    web::{redirect_error, redirect_success, FeedbackParams},
};
use axum::{
    extract::{Extension, Form, Query, State},
    response::{Html, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;

#[derive(Deserialize, Debug)]
pub struct DeleteAccountForm {
    #[serde(default)]
    confirm: Option<String>,
}

// GET /profile
pub async fn show_profile(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Query(params): Query<FeedbackParams>,
) -> AppResult<Html<String>> {
    let profile = user_service::find_profile(&state.db_pool, &ctx.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile".into()))?;
    let email = user_service::find_email(&state.db_pool, &ctx.user_id)
        .await?
        .unwrap_or_default();

    render(&ProfilePage::new(&profile, email, params.error))
}

// POST /profile/delete
pub async fn handle_delete_account(
    State(state): State<AppState>,
    session: Session,
    Extension(ctx): Extension<SessionContext>,
    Form(form): Form<DeleteAccountForm>,
) -> AppResult<Redirect> {
    if form.confirm.as_deref() != Some("yes") {
        return Ok(redirect_error("/profile", "Tick the box to confirm."));
    }

    if let Err(e) = user_service::delete_account(&state.db_pool, &ctx.user_id).await {
        tracing::error!("Account deletion failed for {}: {:?}", ctx.user_id, e);
        return Ok(redirect_error("/profile", &e.user_message()));
    }

    session
        .flush()
        .await
        .map_err(|e| AppError::SessionError(format!("Failed to clear session: {}", e)))?;

    Ok(redirect_success("/login", "Your account has been deleted."))
}
