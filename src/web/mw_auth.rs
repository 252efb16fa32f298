// src/web/mw_auth.rs
use crate::{error::AppError, models::profile::SessionContext};
use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

/// Lets the request through only with a logged-in student, whose
/// `SessionContext` is added to the request extensions.
pub async fn require_auth(
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match session.get::<SessionContext>(SessionContext::SESSION_KEY).await {
        Ok(Some(ctx)) => {
            tracing::debug!("Auth MW: '{}' authenticated.", ctx.user_id);
            request.extensions_mut().insert(ctx);
            Ok(next.run(request).await)
        }
        Ok(None) => {
            tracing::debug!("Auth MW: no session context, redirecting to /login");
            Ok(Redirect::to("/login").into_response())
        }
        Err(e) => {
            tracing::error!("Auth MW: failed to read session: {:?}", e);
            Err(AppError::SessionError(format!("Failed to read session: {}", e)))
        }
    }
}
