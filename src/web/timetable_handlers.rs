// src/web/timetable_handlers.rs
use crate::{
    error::AppResult,
    models::profile::SessionContext,
    services::timetable_service,
    state::AppState,
    templates::{render, TimetablePage},
};
use axum::{
    extract::{Extension, State},
    response::Html,
};
use chrono::Local;

// GET /timetable
pub async fn show_timetable(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
) -> AppResult<Html<String>> {
    let entries = timetable_service::list_for_section(&state.db_pool, &ctx.section).await?;
    let today = Local::now().date_naive();

    let page = TimetablePage {
        first_name: ctx.first_name().to_string(),
        section: ctx.section.clone(),
        days: timetable_service::week_view(&entries),
        today_index: timetable_service::day_of_week(today) as usize,
    };
    render(&page)
}
