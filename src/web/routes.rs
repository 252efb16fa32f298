// src/web/routes.rs
use crate::{
    state::AppState,
    web::{attendance_handlers, auth_handlers, home_handlers, mw_auth, profile_handlers, timetable_handlers},
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub fn create_router(app_state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/login", get(auth_handlers::show_login_form).post(auth_handlers::handle_login))
        .route("/register", get(auth_handlers::show_register_form).post(auth_handlers::handle_register))
        .route("/logout", get(auth_handlers::handle_logout))
        .route("/", get(|| async { axum::response::Redirect::permanent("/login") }));

    // Each POST is one event of the marking dialog.
    let home_routes = Router::new()
        .route("/mark", post(home_handlers::handle_mark))
        .route("/swipe", post(home_handlers::handle_swipe))
        .route("/cancel", post(home_handlers::handle_cancel))
        .route("/reschedule", post(home_handlers::handle_reschedule))
        .route("/swap", post(home_handlers::handle_swap))
        .route("/back", post(home_handlers::handle_back));

    // Everything below requires a logged-in student.
    let authenticated_routes = Router::new()
        .route("/home", get(home_handlers::show_home))
        .nest("/home", home_routes)
        .route("/timetable", get(timetable_handlers::show_timetable))
        .route("/attendance", get(attendance_handlers::show_attendance))
        .route("/attendance/manual", post(attendance_handlers::handle_manual_attendance))
        .route("/holidays/toggle", post(attendance_handlers::handle_toggle_holiday))
        .route("/holidays/{id}/delete", post(attendance_handlers::handle_delete_holiday))
        .route("/profile", get(profile_handlers::show_profile))
        .route("/profile/delete", post(profile_handlers::handle_delete_account))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            mw_auth::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .with_state(app_state)
}
