// src/web/auth_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        profile::SessionContext,
        user::{LoginForm, RegisterForm},
    },
    services::{auth_service, marking_flow::MarkingFlow, user_service},
    state::AppState,
    templates::{render, LoginPage, RegisterPage},
    web::{redirect_success, FeedbackParams},
};
use axum::{
    extract::{Form, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

async fn is_logged_in(session: &Session) -> bool {
    session
        .get::<SessionContext>(SessionContext::SESSION_KEY)
        .await
        .ok()
        .flatten()
        .is_some()
}

/// Stores the context of a freshly authenticated student under a new session id.
async fn start_session(session: &Session, ctx: &SessionContext) -> AppResult<()> {
    session
        .cycle_id()
        .await
        .map_err(|e| AppError::SessionError(format!("Failed to cycle id: {}", e)))?;
    session
        .insert(SessionContext::SESSION_KEY, ctx)
        .await
        .map_err(|e| AppError::SessionError(format!("Failed to insert into session: {}", e)))?;
    session
        .insert(MarkingFlow::SESSION_KEY, MarkingFlow::Idle)
        .await
        .map_err(|e| AppError::SessionError(format!("Failed to insert into session: {}", e)))?;
    Ok(())
}

// GET /login
pub async fn show_login_form(
    session: Session,
    Query(params): Query<FeedbackParams>,
) -> AppResult<Response> {
    if is_logged_in(&session).await {
        tracing::debug!("GET /login: already logged in, redirecting to /home");
        return Ok(Redirect::to("/home").into_response());
    }

    let page = LoginPage {
        email: String::new(),
        error: params.error,
        success: params.success,
    };
    Ok(render(&page)?.into_response())
}

// POST /login
pub async fn handle_login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    tracing::info!("Login attempt for: {}", form.email);

    match auth_service::authenticate(&state.db_pool, &form.email, &form.password).await {
        Ok(ctx) => {
            start_session(&session, &ctx).await?;
            tracing::info!("✅ Login succeeded for: {}", ctx.user_id);
            Ok(Redirect::to("/home").into_response())
        }
        Err(e @ AppError::InvalidCredentials) => {
            let page = LoginPage {
                email: form.email,
                error: Some(e.user_message()),
                success: None,
            };
            Ok(render(&page)?.into_response())
        }
        Err(e) => Err(e),
    }
}

// GET /register
pub async fn show_register_form(session: Session) -> AppResult<Response> {
    if is_logged_in(&session).await {
        return Ok(Redirect::to("/home").into_response());
    }
    Ok(render(&RegisterPage::new(RegisterForm::default(), None))?.into_response())
}

// POST /register
pub async fn handle_register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    let user_id = match user_service::register(&state.db_pool, &form).await {
        Ok(id) => id,
        Err(e @ (AppError::Validation(_) | AppError::Conflict(_))) => {
            tracing::debug!("Registration rejected: {}", e);
            let form = RegisterForm { password: String::new(), ..form };
            return Ok(render(&RegisterPage::new(form, Some(e.user_message())))?.into_response());
        }
        Err(e) => return Err(e),
    };

    let profile = user_service::find_profile(&state.db_pool, &user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile".into()))?;
    let ctx = SessionContext::from_profile(&profile);
    start_session(&session, &ctx).await?;

    let welcome = format!("Welcome, {}!", ctx.first_name());
    Ok(redirect_success("/home", &welcome).into_response())
}

// GET /logout
pub async fn handle_logout(session: Session) -> AppResult<Redirect> {
    let ctx: Option<SessionContext> = session.get(SessionContext::SESSION_KEY).await.ok().flatten();

    session
        .flush()
        .await
        .map_err(|e| AppError::SessionError(format!("Failed to clear session: {}", e)))?;

    match ctx {
        Some(ctx) => tracing::info!("🚪 '{}' signed out.", ctx.user_id),
        None => tracing::info!("🚪 Anonymous session cleared."),
    }

    Ok(Redirect::to("/login"))
}
