// src/web/attendance_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::{manual_attendance::ManualAttendance, profile::SessionContext},
    services::{holiday_service, manual_attendance_service, stats_service, timetable_service},
    state::AppState,
    templates::{format_percentage, render, AttendancePage, HolidayView, SubjectOption, SubjectView},
    web::{redirect_error, redirect_success, FeedbackParams},
};
use axum::{
    extract::{Extension, Form, Path, Query, State},
    response::{Html, Redirect},
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct ManualAttendanceForm {
    subject_code: String,
    classes_held: String,
    classes_attended: String,
}

#[derive(Deserialize, Debug)]
pub struct HolidayForm {
    date: String,
    #[serde(default)]
    name: Option<String>,
}

fn parse_count(raw: &str, what: &str) -> AppResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::Validation(format!("{} must be a whole number.", what)))
}

async fn save_manual(
    state: &AppState,
    ctx: &SessionContext,
    form: &ManualAttendanceForm,
) -> AppResult<ManualAttendance> {
    let held = parse_count(&form.classes_held, "Classes held")?;
    let attended = parse_count(&form.classes_attended, "Classes attended")?;
    manual_attendance_service::upsert(&state.db_pool, &ctx.user_id, &form.subject_code, held, attended).await
}

// GET /attendance
pub async fn show_attendance(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Query(params): Query<FeedbackParams>,
) -> AppResult<Html<String>> {
    let summary = stats_service::summary_for(&state.db_pool, &ctx).await?;
    let holidays = holiday_service::list_for_student(&state.db_pool, &ctx.user_id).await?;
    let entries = timetable_service::list_for_section(&state.db_pool, &ctx.section).await?;

    let mut subject_options: Vec<SubjectOption> = Vec::new();
    for entry in &entries {
        if !subject_options.iter().any(|o| o.code == entry.subject_code) {
            subject_options.push(SubjectOption {
                code: entry.subject_code.clone(),
                name: entry.subject_name.clone(),
            });
        }
    }

    let page = AttendancePage {
        first_name: ctx.first_name().to_string(),
        overall_percentage: format_percentage(summary.overall_percentage),
        present: summary.present,
        total: summary.total,
        records: summary.tally.total_records(),
        tally: AttendancePage::tally_of(&summary),
        subjects: summary.subjects.iter().map(SubjectView::from).collect(),
        subject_options,
        holidays: holidays.iter().map(HolidayView::from).collect(),
        today: Local::now().date_naive().format("%Y-%m-%d").to_string(),
        success: params.success,
        error: params.error,
    };
    render(&page)
}

// POST /attendance/manual
pub async fn handle_manual_attendance(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Form(form): Form<ManualAttendanceForm>,
) -> AppResult<Redirect> {
    match save_manual(&state, &ctx, &form).await {
        Ok(row) => Ok(redirect_success(
            "/attendance",
            &format!("Saved {}: {}/{}", row.subject_code, row.classes_attended, row.classes_held),
        )),
        Err(e) => {
            tracing::warn!("Manual attendance rejected for {}: {}", ctx.user_id, e);
            Ok(redirect_error("/attendance", &e.user_message()))
        }
    }
}

// POST /holidays/toggle
pub async fn handle_toggle_holiday(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Form(form): Form<HolidayForm>,
) -> AppResult<Redirect> {
    let Ok(date) = NaiveDate::parse_from_str(form.date.trim(), "%Y-%m-%d") else {
        return Ok(redirect_error("/attendance", "Pick a valid date."));
    };

    match holiday_service::toggle_manual(&state.db_pool, &ctx.user_id, date, form.name.as_deref()).await {
        Ok(true) => Ok(redirect_success("/attendance", &format!("{} marked as a holiday.", date))),
        Ok(false) => Ok(redirect_success("/attendance", &format!("{} is no longer a holiday.", date))),
        Err(e) => Ok(redirect_error("/attendance", &e.user_message())),
    }
}

// POST /holidays/{id}/delete
pub async fn handle_delete_holiday(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<String>,
) -> AppResult<Redirect> {
    match holiday_service::delete_manual(&state.db_pool, &ctx.user_id, &id).await {
        Ok(()) => Ok(redirect_success("/attendance", "Holiday removed.")),
        Err(e) => Ok(redirect_error("/attendance", &e.user_message())),
    }
}
