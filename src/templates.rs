// src/templates.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        attendance::{AttendanceStatus, ClassCard, ClassModification, ModificationType},
        holiday::Holiday,
        profile::Profile,
        stats::{AttendanceSummary, SubjectStats},
        timetable::DaySchedule,
        user::RegisterForm,
    },
    services::marking_flow::{FlowContext, MarkingFlow},
};
use askama::Template;
use axum::response::Html;

/// Renders a page, logging template failures.
pub fn render<T: Template>(template: &T) -> AppResult<Html<String>> {
    template.render().map(Html).map_err(|e| {
        tracing::error!("Failed to render template: {}", e);
        AppError::InternalServerError
    })
}

pub fn format_percentage(value: f64) -> String {
    format!("{:.1}", value)
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    pub email: String,
    pub error: Option<String>,
    pub success: Option<String>,
}

pub struct BranchOption {
    pub name: &'static str,
    pub selected: bool,
    pub sections: Vec<SectionOption>,
}

pub struct SectionOption {
    pub name: &'static str,
    pub selected: bool,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterPage {
    pub form: RegisterForm,
    pub branches: Vec<BranchOption>,
    pub error: Option<String>,
}

impl RegisterPage {
    pub fn new(form: RegisterForm, error: Option<String>) -> Self {
        let branches = crate::services::user_service::BRANCH_SECTIONS
            .iter()
            .map(|&(name, sections)| BranchOption {
                name,
                selected: form.branch == name,
                sections: sections
                    .iter()
                    .map(|&section| SectionOption {
                        name: section,
                        selected: form.branch == name && form.section == section,
                    })
                    .collect(),
            })
            .collect();
        Self { form, branches, error }
    }
}

/// A class of today's list, ready for display.
pub struct CardView {
    pub id: String,
    pub subject_code: String,
    pub subject_name: String,
    pub professor_name: String,
    pub room: String,
    pub time_range: String,
    pub class_type: String,
    pub status: Option<&'static str>,
    pub note: Option<String>,
    pub can_mark: bool,
    pub is_past: bool,
    pub is_current: bool,
}

impl From<&ClassCard> for CardView {
    fn from(card: &ClassCard) -> Self {
        Self {
            id: card.entry.id.clone(),
            subject_code: card.entry.subject_code.clone(),
            subject_name: card.entry.subject_name.clone(),
            professor_name: card.entry.professor_name.clone(),
            room: card.entry.room_label().to_string(),
            time_range: card.entry.time_range(),
            class_type: card.entry.class_type.clone(),
            status: card.status.map(|s| s.as_str()),
            note: None,
            can_mark: card.can_mark,
            is_past: card.is_past,
            is_current: card.is_current,
        }
    }
}

impl CardView {
    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }

    /// Why an unmarked card shows no actions.
    pub fn locked_label(&self) -> &'static str {
        if self.is_past {
            "Not marked"
        } else if self.is_current {
            "Marking window closed"
        } else {
            "Not open for marking yet"
        }
    }
}

/// One line describing what happened to a modified class.
pub fn modification_note(modification: &ClassModification, swapped_with: Option<&str>) -> String {
    match modification.modification_type {
        ModificationType::Cancelled => "Cancelled".to_string(),
        ModificationType::Rescheduled => {
            let mut note = String::from("Rescheduled");
            if let Some(date) = modification.rescheduled_date {
                note.push_str(&format!(" to {}", date.format("%a %d %b")));
            }
            if let (Some(start), Some(end)) =
                (modification.rescheduled_start_time, modification.rescheduled_end_time)
            {
                note.push_str(&format!(", {}-{}", start.format("%H:%M"), end.format("%H:%M")));
            }
            if let Some(room) = &modification.rescheduled_room {
                note.push_str(&format!(" in {}", room));
            }
            if let Some(notes) = &modification.notes {
                note.push_str(&format!(" ({})", notes));
            }
            note
        }
        ModificationType::Swapped => match swapped_with {
            Some(subject) => format!("Swapped with {}", subject),
            None => "Swapped".to_string(),
        },
    }
}

pub struct PartnerView {
    pub id: String,
    pub label: String,
}

/// The dialog opened by the current marking flow state.
pub struct DialogView {
    kind: MarkingFlow,
    pub class_label: String,
    pub today: String,
    pub partners: Vec<PartnerView>,
}

impl DialogView {
    /// None when the flow is idle or its class is no longer on today's list.
    pub fn for_flow(flow: &MarkingFlow, ctx: &FlowContext<'_>) -> Option<Self> {
        let timetable_id = flow.timetable_id()?;
        let card = ctx.cards.iter().find(|c| c.entry.id == timetable_id)?;
        let partners = ctx
            .swap_partners(timetable_id)
            .into_iter()
            .map(|c| PartnerView {
                id: c.entry.id.clone(),
                label: format!("{} ({})", c.entry.subject_name, c.entry.time_range()),
            })
            .collect();
        Some(Self {
            kind: flow.clone(),
            class_label: format!("{} ({})", card.entry.subject_name, card.entry.time_range()),
            today: ctx.today.format("%Y-%m-%d").to_string(),
            partners,
        })
    }

    pub fn is_cancel(&self) -> bool {
        matches!(self.kind, MarkingFlow::CancelFlow { .. })
    }

    pub fn is_reschedule(&self) -> bool {
        matches!(self.kind, MarkingFlow::RescheduleDetails { .. })
    }

    pub fn is_swap(&self) -> bool {
        matches!(self.kind, MarkingFlow::SwapFlow { .. })
    }
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomePage {
    pub first_name: String,
    pub section: String,
    pub today_label: String,
    pub window_label: String,
    pub overall_percentage: String,
    pub holiday: Option<String>,
    pub cards: Vec<CardView>,
    pub dialog: Option<DialogView>,
    pub success: Option<String>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "timetable.html")]
pub struct TimetablePage {
    pub first_name: String,
    pub section: String,
    pub days: Vec<DaySchedule>,
    pub today_index: usize, // 6 on Sundays, matching no column
}

pub struct SubjectView {
    pub subject_code: String,
    pub subject_name: String,
    pub present: usize,
    pub absent: usize,
    pub total: usize,
    pub percentage: String,
    pub manual: Option<String>,
}

impl From<&SubjectStats> for SubjectView {
    fn from(stats: &SubjectStats) -> Self {
        Self {
            subject_code: stats.subject_code.clone(),
            subject_name: stats.subject_name.clone(),
            present: stats.present,
            absent: stats.absent,
            total: stats.total,
            percentage: format_percentage(stats.percentage),
            manual: stats.manual.as_ref().map(|m| {
                format!(
                    "{}/{} ({}%)",
                    m.classes_attended,
                    m.classes_held,
                    format_percentage(m.percentage)
                )
            }),
        }
    }
}

pub struct TallyView {
    pub label: &'static str,
    pub count: usize,
}

pub struct HolidayView {
    pub id: String,
    pub date: String,
    pub name: String,
    pub is_manual: bool,
}

impl From<&Holiday> for HolidayView {
    fn from(holiday: &Holiday) -> Self {
        Self {
            id: holiday.id.clone(),
            date: holiday.date.format("%a %d %b %Y").to_string(),
            name: holiday.name.clone(),
            is_manual: holiday.is_manual(),
        }
    }
}

pub struct SubjectOption {
    pub code: String,
    pub name: String,
}

#[derive(Template)]
#[template(path = "attendance.html")]
pub struct AttendancePage {
    pub first_name: String,
    pub overall_percentage: String,
    pub present: usize,
    pub total: usize,
    pub records: usize,
    pub tally: Vec<TallyView>,
    pub subjects: Vec<SubjectView>,
    pub subject_options: Vec<SubjectOption>,
    pub holidays: Vec<HolidayView>,
    pub today: String,
    pub success: Option<String>,
    pub error: Option<String>,
}

impl AttendancePage {
    pub fn tally_of(summary: &AttendanceSummary) -> Vec<TallyView> {
        let t = &summary.tally;
        [
            (AttendanceStatus::Present, t.present),
            (AttendanceStatus::Absent, t.absent),
            (AttendanceStatus::Cancelled, t.cancelled),
            (AttendanceStatus::Swapped, t.swapped),
            (AttendanceStatus::Rescheduled, t.rescheduled),
        ]
        .into_iter()
        .map(|(status, count)| TallyView { label: status.as_str(), count })
        .collect()
    }
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfilePage {
    pub first_name: String,
    pub email: String,
    pub full_name: String,
    pub college_id: String,
    pub branch: String,
    pub section: String,
    pub roll_number: String,
    pub batch: String,
    pub year: String,
    pub semester: String,
    pub error: Option<String>,
}

fn or_dash<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

impl ProfilePage {
    pub fn new(profile: &Profile, email: String, error: Option<String>) -> Self {
        Self {
            first_name: profile.first_name().to_string(),
            email,
            full_name: profile.full_name.clone(),
            college_id: profile.college_id.clone(),
            branch: or_dash(&profile.branch),
            section: profile.section.clone(),
            roll_number: or_dash(&profile.roll_number),
            batch: or_dash(&profile.batch),
            year: or_dash(&profile.year),
            semester: or_dash(&profile.semester),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::timetable::TimetableEntry;
    use chrono::{NaiveDate, NaiveTime};

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    fn card(id: &str, name: &str, hour: u32) -> ClassCard {
        ClassCard {
            entry: TimetableEntry {
                id: id.into(),
                section: "A2".into(),
                day_of_week: 0,
                start_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(hour + 1, 0, 0).unwrap(),
                subject_code: id.to_uppercase(),
                subject_name: name.into(),
                professor_name: "Prof".into(),
                room: None,
                class_type: "lecture".into(),
            },
            status: None,
            modification_id: None,
            can_mark: true,
            is_past: false,
            is_current: false,
        }
    }

    #[test]
    fn swap_dialog_lists_the_other_classes() {
        let cards = vec![card("a", "Networks", 9), card("b", "Compilers", 11)];
        let flow = MarkingFlow::SwapFlow { timetable_id: "a".into() };

        let ctx = FlowContext { today: monday(), cards: &cards };

        let dialog = DialogView::for_flow(&flow, &ctx).unwrap();

        assert!(dialog.is_swap());
        assert_eq!(dialog.today, "2025-03-03");
        assert_eq!(dialog.class_label, "Networks (09:00-10:00)");
        assert_eq!(dialog.partners.len(), 1);
        assert_eq!(dialog.partners[0].id, "b");
    }

    #[test]
    fn no_dialog_when_idle_or_class_gone() {
        let cards = vec![card("a", "Networks", 9)];
        let ctx = FlowContext { today: monday(), cards: &cards };
        assert!(DialogView::for_flow(&MarkingFlow::Idle, &ctx).is_none());

        let stale = MarkingFlow::CancelFlow { timetable_id: "zzz".into() };
        assert!(DialogView::for_flow(&stale, &ctx).is_none());
    }

    #[test]
    fn rescheduled_note_lists_the_new_slot() {
        let modification = ClassModification {
            id: "m1".into(),
            student_id: "stu-1".into(),
            original_timetable_id: "a".into(),
            original_date: chrono::NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            modification_type: ModificationType::Rescheduled,
            rescheduled_date: chrono::NaiveDate::from_ymd_opt(2025, 3, 5),
            rescheduled_start_time: NaiveTime::from_hms_opt(14, 0, 0),
            rescheduled_end_time: NaiveTime::from_hms_opt(15, 0, 0),
            rescheduled_room: Some("L-110".into()),
            notes: None,
            swapped_with_timetable_id: None,
        };

        assert_eq!(modification_note(&modification, None), "Rescheduled to Wed 05 Mar, 14:00-15:00 in L-110");
    }

    #[test]
    fn home_page_renders_cards_and_dialog() {
        let cards = vec![card("a", "Networks", 9), card("b", "Compilers", 11)];
        let flow = MarkingFlow::CancelFlow { timetable_id: "b".into() };
        let page = HomePage {
            first_name: "Asha".into(),
            section: "A2".into(),
            today_label: "Monday, 03 March".into(),
            window_label: "open until midnight".into(),
            overall_percentage: format_percentage(75.0),
            holiday: None,
            cards: cards.iter().map(CardView::from).collect(),
            dialog: DialogView::for_flow(&flow, &FlowContext { today: monday(), cards: &cards }),
            success: None,
            error: Some("Oops".into()),
        };

        let html = page.render().unwrap();

        assert!(html.contains("Networks"));
        assert!(html.contains("75.0%"));
        assert!(html.contains("Was this class rescheduled?"));
        assert!(html.contains("Oops"));
    }

    #[test]
    fn unmarkable_cards_say_why() {
        let mut not_started = card("a", "Networks", 9);
        not_started.can_mark = false;
        let mut window_closed = card("b", "Compilers", 11);
        window_closed.can_mark = false;
        window_closed.is_current = true;
        let mut ended = card("c", "Databases", 13);
        ended.can_mark = false;
        ended.is_past = true;
        let cards = vec![not_started, window_closed, ended];
        let views: Vec<CardView> = cards.iter().map(CardView::from).collect();

        assert_eq!(views[0].locked_label(), "Not open for marking yet");
        assert_eq!(views[1].locked_label(), "Marking window closed");
        assert_eq!(views[2].locked_label(), "Not marked");

        let page = HomePage {
            first_name: "Asha".into(),
            section: "A2".into(),
            today_label: "Monday, 03 March".into(),
            window_label: "within 30 minutes of class start".into(),
            overall_percentage: format_percentage(0.0),
            holiday: None,
            cards: views,
            dialog: None,
            success: None,
            error: None,
        };
        let html = page.render().unwrap();

        assert!(html.contains("Marking window closed"));
        assert!(html.contains("Not open for marking yet"));
        assert!(!html.contains("Present →"));
    }
}
