// src/web/home_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::profile::SessionContext,
    services::{
        attendance_service, holiday_service,
        marking_flow::{FlowContext, FlowEvent, MarkAction, MarkingFlow, RescheduleInput, SwipeDirection},
        stats_service,
        timetable_service::{self, parse_clock},
    },
    state::AppState,
    templates::{format_percentage, modification_note, render, CardView, DialogView, HomePage},
    web::{redirect_error, redirect_success, FeedbackParams},
};
use axum::{
    extract::{Extension, Form, Query, State},
    response::{Html, Redirect},
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tower_sessions::Session;

#[derive(Deserialize, Debug)]
pub struct MarkForm {
    timetable_id: String,
    action: MarkAction,
}

#[derive(Deserialize, Debug)]
pub struct SwipeForm {
    timetable_id: String,
    direction: SwipeDirection,
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Yes,
    No,
}

#[derive(Deserialize, Debug)]
pub struct CancelForm {
    was_rescheduled: Answer,
}

#[derive(Deserialize, Debug, Default)]
pub struct RescheduleForm {
    #[serde(default)]
    new_date: Option<String>,
    #[serde(default)]
    new_start_time: Option<String>,
    #[serde(default)]
    new_end_time: Option<String>,
    #[serde(default)]
    room: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

impl RescheduleForm {
    /// Empty fields become `None`; present but unreadable ones are rejected.
    fn parse(self) -> AppResult<RescheduleInput> {
        let new_date = match filled(self.new_date) {
            Some(raw) => Some(
                NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .map_err(|_| AppError::Validation("The new date is not a valid date.".into()))?,
            ),
            None => None,
        };
        let clock = |raw: Option<String>, what: &str| -> AppResult<_> {
            match filled(raw) {
                Some(raw) => parse_clock(&raw)
                    .map(Some)
                    .ok_or_else(|| AppError::Validation(format!("The new {} is not a valid time.", what))),
                None => Ok(None),
            }
        };
        Ok(RescheduleInput {
            new_date,
            new_start_time: clock(self.new_start_time, "start time")?,
            new_end_time: clock(self.new_end_time, "end time")?,
            room: self.room,
            notes: self.notes,
        })
    }
}

fn filled(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Deserialize, Debug)]
pub struct SwapForm {
    swapped_with: String,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

async fn load_flow(session: &Session) -> AppResult<MarkingFlow> {
    session
        .get::<MarkingFlow>(MarkingFlow::SESSION_KEY)
        .await
        .map(Option::unwrap_or_default)
        .map_err(|e| AppError::SessionError(format!("Failed to read marking flow: {}", e)))
}

async fn store_flow(session: &Session, flow: &MarkingFlow) -> AppResult<()> {
    session
        .insert(MarkingFlow::SESSION_KEY, flow)
        .await
        .map_err(|e| AppError::SessionError(format!("Failed to store marking flow: {}", e)))
}

// GET /home
pub async fn show_home(
    State(state): State<AppState>,
    session: Session,
    Extension(ctx): Extension<SessionContext>,
    Query(params): Query<FeedbackParams>,
) -> AppResult<Html<String>> {
    let now = local_now();
    let today = now.date();

    let cards = attendance_service::today_cards(&state.db_pool, &ctx, state.config.marking_window, now).await?;
    let mut card_views = Vec::with_capacity(cards.len());
    for card in &cards {
        let note = match &card.modification_id {
            Some(id) => describe_modification(&state, id).await?,
            None => None,
        };
        card_views.push(CardView::from(card).with_note(note));
    }
    let summary = stats_service::summary_for(&state.db_pool, &ctx).await?;
    let holiday = holiday_service::holiday_on(&state.db_pool, &ctx.user_id, today).await?;

    let flow_ctx = FlowContext { today, cards: &cards };
    let dialog = open_dialog(&session, &ctx, &flow_ctx).await?;

    let page = HomePage {
        first_name: ctx.first_name().to_string(),
        section: ctx.section.clone(),
        today_label: today.format("%A, %d %B").to_string(),
        window_label: state.config.marking_window.label(),
        overall_percentage: format_percentage(summary.overall_percentage),
        holiday: holiday.map(|h| h.name),
        cards: card_views,
        dialog,
        success: params.success,
        error: params.error,
    };
    render(&page)
}

/// The dialog for the stored flow state. A state whose class is gone from
/// today's list (the day rolled over) is reset to `Idle`.
async fn open_dialog(
    session: &Session,
    ctx: &SessionContext,
    flow_ctx: &FlowContext<'_>,
) -> AppResult<Option<DialogView>> {
    let flow = load_flow(session).await?;
    let dialog = DialogView::for_flow(&flow, flow_ctx);
    if dialog.is_none() && flow != MarkingFlow::Idle {
        tracing::debug!("Dropping stale marking flow {:?} for {}", flow, ctx.user_id);
        store_flow(session, &MarkingFlow::Idle).await?;
    }
    Ok(dialog)
}

async fn describe_modification(state: &AppState, id: &str) -> AppResult<Option<String>> {
    let Some(modification) = attendance_service::find_modification(&state.db_pool, id).await? else {
        return Ok(None);
    };
    let partner = match &modification.swapped_with_timetable_id {
        Some(partner_id) => timetable_service::find_by_id(&state.db_pool, partner_id).await?,
        None => None,
    };
    Ok(Some(modification_note(
        &modification,
        partner.as_ref().map(|p| p.subject_name.as_str()),
    )))
}

/// Runs one event through the marking flow and performs its writes.
///
/// The stored state only moves forward once the writes succeeded; any failure
/// comes back to the home page as a notification with the state untouched.
async fn advance(
    state: &AppState,
    session: &Session,
    ctx: &SessionContext,
    event: FlowEvent,
    now: NaiveDateTime,
) -> AppResult<Redirect> {
    let flow = load_flow(session).await?;

    let cards = match attendance_service::today_cards(&state.db_pool, ctx, state.config.marking_window, now).await {
        Ok(cards) => cards,
        Err(e) => {
            tracing::error!("Could not load today's classes for {}: {:?}", ctx.user_id, e);
            return Ok(redirect_error("/home", &e.user_message()));
        }
    };

    let flow_ctx = FlowContext { today: now.date(), cards: &cards };
    let step = match flow.apply(event, &flow_ctx) {
        Ok(step) => step,
        Err(e) => {
            tracing::debug!("Flow {:?} rejected event for {}: {}", flow, ctx.user_id, e);
            return Ok(redirect_error("/home", &e.to_string()));
        }
    };

    let Some(plan) = step.write else {
        store_flow(session, &step.next).await?;
        return Ok(Redirect::to("/home"));
    };

    match attendance_service::execute_plan(&state.db_pool, ctx, now.date(), &plan).await {
        Ok(record) => {
            store_flow(session, &step.next).await?;
            tracing::debug!("Stored {:?} after writing {} for {}", step.next, plan.status(), ctx.user_id);
            let subject = cards
                .iter()
                .find(|c| c.entry.id == plan.timetable_id())
                .map(|c| c.entry.subject_name.as_str())
                .unwrap_or("class");
            Ok(redirect_success("/home", &format!("Marked {} • {}", record.status, subject)))
        }
        Err(e) => {
            tracing::error!("Marking failed for {}: {:?}", ctx.user_id, e);
            Ok(redirect_error("/home", &e.user_message()))
        }
    }
}

// POST /home/mark
pub async fn handle_mark(
    State(state): State<AppState>,
    session: Session,
    Extension(ctx): Extension<SessionContext>,
    Form(form): Form<MarkForm>,
) -> AppResult<Redirect> {
    let event = FlowEvent::Choose { timetable_id: form.timetable_id, action: form.action };
    advance(&state, &session, &ctx, event, local_now()).await
}

// POST /home/swipe
pub async fn handle_swipe(
    State(state): State<AppState>,
    session: Session,
    Extension(ctx): Extension<SessionContext>,
    Form(form): Form<SwipeForm>,
) -> AppResult<Redirect> {
    let event = FlowEvent::Choose {
        timetable_id: form.timetable_id,
        action: form.direction.action(),
    };
    advance(&state, &session, &ctx, event, local_now()).await
}

// POST /home/cancel
pub async fn handle_cancel(
    State(state): State<AppState>,
    session: Session,
    Extension(ctx): Extension<SessionContext>,
    Form(form): Form<CancelForm>,
) -> AppResult<Redirect> {
    let was_rescheduled = matches!(form.was_rescheduled, Answer::Yes);
    advance(&state, &session, &ctx, FlowEvent::ConfirmCancelled { was_rescheduled }, local_now()).await
}

// POST /home/reschedule
pub async fn handle_reschedule(
    State(state): State<AppState>,
    session: Session,
    Extension(ctx): Extension<SessionContext>,
    Form(form): Form<RescheduleForm>,
) -> AppResult<Redirect> {
    let input = match form.parse() {
        Ok(input) => input,
        Err(e) => return Ok(redirect_error("/home", &e.user_message())),
    };
    advance(&state, &session, &ctx, FlowEvent::SubmitReschedule(input), local_now()).await
}

// POST /home/swap
pub async fn handle_swap(
    State(state): State<AppState>,
    session: Session,
    Extension(ctx): Extension<SessionContext>,
    Form(form): Form<SwapForm>,
) -> AppResult<Redirect> {
    let event = FlowEvent::SubmitSwap { swapped_with: form.swapped_with };
    advance(&state, &session, &ctx, event, local_now()).await
}

// POST /home/back
pub async fn handle_back(
    State(state): State<AppState>,
    session: Session,
    Extension(ctx): Extension<SessionContext>,
) -> AppResult<Redirect> {
    advance(&state, &session, &ctx, FlowEvent::Back, local_now()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        db::test_pool,
        models::attendance::AttendanceStatus,
        services::{
            attendance_service::tests::{class_id, monday, seed_student},
            marking_window::MarkingWindow,
        },
    };
    use axum::{http::header::LOCATION, response::IntoResponse};
    use chrono::NaiveTime;
    use sqlx::SqlitePool;
    use std::sync::Arc;
    use tower_sessions_sqlx_store::SqliteStore;

    async fn app_state() -> AppState {
        let pool = test_pool().await;
        let config = AppConfig {
            database_url: "sqlite::memory:".into(),
            session_secret: "s".repeat(64),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            marking_window: MarkingWindow::OpenEnded,
            session_inactivity_days: 1,
            timetable_csv: None,
        };
        AppState { db_pool: pool, config: Arc::new(config) }
    }

    async fn session_on(pool: &SqlitePool) -> Session {
        let store = SqliteStore::new(pool.clone());
        store.migrate().await.unwrap();
        Session::new(None, Arc::new(store), None)
    }

    // Monday, after all the sample A2 classes have started.
    fn monday_evening() -> NaiveDateTime {
        monday().and_time(NaiveTime::from_hms_opt(16, 0, 0).unwrap())
    }

    fn location(redirect: Redirect) -> String {
        let response = redirect.into_response();
        response.headers()[LOCATION].to_str().unwrap().to_string()
    }

    fn choose(timetable_id: &str, action: MarkAction) -> FlowEvent {
        FlowEvent::Choose { timetable_id: timetable_id.to_string(), action }
    }

    #[tokio::test]
    async fn failed_write_keeps_the_dialog_open() {
        let state = app_state().await;
        let session = session_on(&state.db_pool).await;
        let ctx = seed_student(&state.db_pool).await;
        let class = class_id(&state.db_pool, "CS301").await;

        advance(&state, &session, &ctx, choose(&class, MarkAction::Cancelled), monday_evening())
            .await
            .unwrap();
        assert_eq!(load_flow(&session).await.unwrap(), MarkingFlow::CancelFlow { timetable_id: class.clone() });

        sqlx::query(
            "CREATE TRIGGER reject_modifications BEFORE INSERT ON class_modifications \
             BEGIN SELECT RAISE(ABORT, 'modifications unavailable'); END;",
        )
        .execute(&state.db_pool)
        .await
        .unwrap();

        let event = FlowEvent::ConfirmCancelled { was_rescheduled: false };
        let redirect = advance(&state, &session, &ctx, event, monday_evening()).await.unwrap();

        assert!(location(redirect).starts_with("/home?error="));
        assert_eq!(load_flow(&session).await.unwrap(), MarkingFlow::CancelFlow { timetable_id: class });
        let records = attendance_service::list_for_date(&state.db_pool, &ctx.user_id, monday()).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn successful_write_returns_to_idle() {
        let state = app_state().await;
        let session = session_on(&state.db_pool).await;
        let ctx = seed_student(&state.db_pool).await;
        let class = class_id(&state.db_pool, "CS302").await;

        advance(&state, &session, &ctx, choose(&class, MarkAction::Cancelled), monday_evening())
            .await
            .unwrap();
        let event = FlowEvent::ConfirmCancelled { was_rescheduled: false };
        let redirect = advance(&state, &session, &ctx, event, monday_evening()).await.unwrap();

        assert!(location(redirect).starts_with("/home?success="));
        assert_eq!(load_flow(&session).await.unwrap(), MarkingFlow::Idle);
        let records = attendance_service::list_for_date(&state.db_pool, &ctx.user_id, monday()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, AttendanceStatus::Cancelled);
    }

    #[tokio::test]
    async fn unknown_swap_partner_keeps_the_swap_dialog() {
        let state = app_state().await;
        let session = session_on(&state.db_pool).await;
        let ctx = seed_student(&state.db_pool).await;
        let class = class_id(&state.db_pool, "CS301").await;
        let partner = class_id(&state.db_pool, "CS303").await;
        let swap = MarkingFlow::SwapFlow { timetable_id: class.clone() };

        advance(&state, &session, &ctx, choose(&class, MarkAction::Swapped), monday_evening())
            .await
            .unwrap();
        assert_eq!(load_flow(&session).await.unwrap(), swap);

        for bad in ["no-such-class", class.as_str()] {
            let event = FlowEvent::SubmitSwap { swapped_with: bad.to_string() };
            let redirect = advance(&state, &session, &ctx, event, monday_evening()).await.unwrap();
            assert!(location(redirect).starts_with("/home?error="));
            assert_eq!(load_flow(&session).await.unwrap(), swap);
        }

        let event = FlowEvent::SubmitSwap { swapped_with: partner };
        advance(&state, &session, &ctx, event, monday_evening()).await.unwrap();
        assert_eq!(load_flow(&session).await.unwrap(), MarkingFlow::Idle);
    }

    #[tokio::test]
    async fn stale_dialog_is_reset_to_idle() {
        let state = app_state().await;
        let session = session_on(&state.db_pool).await;
        let ctx = seed_student(&state.db_pool).await;
        let class = class_id(&state.db_pool, "CS301").await;
        let cards = attendance_service::today_cards(&state.db_pool, &ctx, MarkingWindow::OpenEnded, monday_evening())
            .await
            .unwrap();
        let flow_ctx = FlowContext { today: monday(), cards: &cards };

        store_flow(&session, &MarkingFlow::RescheduleDetails { timetable_id: class.clone() }).await.unwrap();
        let dialog = open_dialog(&session, &ctx, &flow_ctx).await.unwrap();
        assert!(dialog.is_some_and(|d| d.is_reschedule()));

        store_flow(&session, &MarkingFlow::CancelFlow { timetable_id: "from-yesterday".into() }).await.unwrap();
        let dialog = open_dialog(&session, &ctx, &flow_ctx).await.unwrap();
        assert!(dialog.is_none());
        assert_eq!(load_flow(&session).await.unwrap(), MarkingFlow::Idle);
    }

    #[test]
    fn reschedule_form_blank_fields_are_missing() {
        let form = RescheduleForm {
            new_date: Some("2025-03-05".into()),
            new_start_time: Some("".into()),
            new_end_time: Some("11:30".into()),
            ..Default::default()
        };

        let input = form.parse().unwrap();

        assert_eq!(input.new_date, NaiveDate::from_ymd_opt(2025, 3, 5));
        assert_eq!(input.new_start_time, None);
        assert_eq!(input.new_end_time, NaiveTime::from_hms_opt(11, 30, 0));
    }

    #[test]
    fn reschedule_form_rejects_garbage() {
        let form = RescheduleForm { new_date: Some("next tuesday".into()), ..Default::default() };
        assert!(matches!(form.parse(), Err(AppError::Validation(_))));

        let form = RescheduleForm { new_start_time: Some("25:99".into()), ..Default::default() };
        assert!(matches!(form.parse(), Err(AppError::Validation(_))));
    }
}
