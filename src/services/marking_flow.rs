// src/services/marking_flow.rs
//! The multi-step dialog a student goes through when marking a class.
//!
//! ```text
//! Idle --choose present/absent-------------------------------> write, Idle
//! Idle --choose cancelled--> CancelFlow --no------------------> modification(cancelled) + write, Idle
//!                            CancelFlow --yes--> RescheduleDetails --submit--> modification(rescheduled) + write, Idle
//! Idle --choose swapped----> SwapFlow --pick partner----------> modification(swapped) + write, Idle
//! any dialog --back--> Idle (partial input discarded)
//! ```
//!
//! `apply` never touches storage: it returns the next state and the writes to
//! perform. The caller stores the next state only after the writes succeed.
use crate::models::attendance::{AttendanceStatus, ClassCard, ModificationKind, NewModification};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where the student is in the marking dialog. Stored in the session between requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MarkingFlow {
    #[default]
    Idle,
    /// "Was it actually rescheduled?"
    CancelFlow { timetable_id: String },
    RescheduleDetails { timetable_id: String },
    /// Picking the class it was swapped with.
    SwapFlow { timetable_id: String },
}

impl MarkingFlow {
    pub const SESSION_KEY: &'static str = "marking_flow";

    /// The class the open dialog is about, if any.
    pub fn timetable_id(&self) -> Option<&str> {
        match self {
            MarkingFlow::Idle => None,
            MarkingFlow::CancelFlow { timetable_id }
            | MarkingFlow::RescheduleDetails { timetable_id }
            | MarkingFlow::SwapFlow { timetable_id } => Some(timetable_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkAction {
    Present,
    Absent,
    Cancelled,
    Swapped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    Left,
    Right,
}

impl SwipeDirection {
    /// Swiping is a shortcut for present (right) and absent (left) only.
    pub fn action(self) -> MarkAction {
        match self {
            SwipeDirection::Right => MarkAction::Present,
            SwipeDirection::Left => MarkAction::Absent,
        }
    }
}

/// Reschedule form as submitted; missing fields are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RescheduleInput {
    pub new_date: Option<NaiveDate>,
    pub new_start_time: Option<NaiveTime>,
    pub new_end_time: Option<NaiveTime>,
    pub room: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    Choose { timetable_id: String, action: MarkAction },
    ConfirmCancelled { was_rescheduled: bool },
    SubmitReschedule(RescheduleInput),
    SubmitSwap { swapped_with: String },
    Back,
}

/// Writes to perform, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WritePlan {
    Attendance { timetable_id: String, status: AttendanceStatus },
    WithModification { modification: NewModification, status: AttendanceStatus },
}

impl WritePlan {
    pub fn timetable_id(&self) -> &str {
        match self {
            WritePlan::Attendance { timetable_id, .. } => timetable_id,
            WritePlan::WithModification { modification, .. } => &modification.original_timetable_id,
        }
    }

    pub fn status(&self) -> AttendanceStatus {
        match self {
            WritePlan::Attendance { status, .. } | WritePlan::WithModification { status, .. } => *status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub next: MarkingFlow,
    pub write: Option<WritePlan>,
}

impl Step {
    fn to(next: MarkingFlow) -> Self {
        Self { next, write: None }
    }

    fn write(plan: WritePlan) -> Self {
        Self { next: MarkingFlow::Idle, write: Some(plan) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("That class is not on today's timetable.")]
    UnknownClass,
    #[error("That class cannot be marked right now.")]
    NotMarkable,
    #[error("Finish or go back from the open dialog first.")]
    DialogOpen,
    #[error("There is no open dialog for that action.")]
    UnexpectedEvent,
    #[error("{0}")]
    MissingField(&'static str),
    #[error("The new date cannot be before today.")]
    DateInPast,
    #[error("Pick another class from today's list.")]
    InvalidSwapPartner,
}

/// What `apply` needs to know about today.
pub struct FlowContext<'a> {
    pub today: NaiveDate,
    pub cards: &'a [ClassCard],
}

impl FlowContext<'_> {
    fn card(&self, timetable_id: &str) -> Option<&ClassCard> {
        self.cards.iter().find(|c| c.entry.id == timetable_id)
    }

    /// Classes the given one can be marked as swapped with.
    pub fn swap_partners(&self, timetable_id: &str) -> Vec<&ClassCard> {
        self.cards.iter().filter(|c| c.entry.id != timetable_id).collect()
    }
}

impl MarkingFlow {
    pub fn apply(&self, event: FlowEvent, ctx: &FlowContext<'_>) -> Result<Step, FlowError> {
        match (self, event) {
            (_, FlowEvent::Back) => Ok(Step::to(MarkingFlow::Idle)),

            (MarkingFlow::Idle, FlowEvent::Choose { timetable_id, action }) => {
                let card = ctx.card(&timetable_id).ok_or(FlowError::UnknownClass)?;
                if !card.can_mark {
                    return Err(FlowError::NotMarkable);
                }
                Ok(match action {
                    MarkAction::Present => Step::write(WritePlan::Attendance {
                        timetable_id,
                        status: AttendanceStatus::Present,
                    }),
                    MarkAction::Absent => Step::write(WritePlan::Attendance {
                        timetable_id,
                        status: AttendanceStatus::Absent,
                    }),
                    MarkAction::Cancelled => Step::to(MarkingFlow::CancelFlow { timetable_id }),
                    MarkAction::Swapped => Step::to(MarkingFlow::SwapFlow { timetable_id }),
                })
            }
            (_, FlowEvent::Choose { .. }) => Err(FlowError::DialogOpen),

            (MarkingFlow::CancelFlow { timetable_id }, FlowEvent::ConfirmCancelled { was_rescheduled }) => {
                if was_rescheduled {
                    return Ok(Step::to(MarkingFlow::RescheduleDetails {
                        timetable_id: timetable_id.clone(),
                    }));
                }
                Ok(Step::write(WritePlan::WithModification {
                    modification: NewModification {
                        original_timetable_id: timetable_id.clone(),
                        original_date: ctx.today,
                        kind: ModificationKind::Cancelled,
                    },
                    status: AttendanceStatus::Cancelled,
                }))
            }

            (MarkingFlow::RescheduleDetails { timetable_id }, FlowEvent::SubmitReschedule(input)) => {
                let date = input.new_date.ok_or(FlowError::MissingField("The new date is required."))?;
                let start_time = input
                    .new_start_time
                    .ok_or(FlowError::MissingField("The new start time is required."))?;
                let end_time = input
                    .new_end_time
                    .ok_or(FlowError::MissingField("The new end time is required."))?;
                if date < ctx.today {
                    return Err(FlowError::DateInPast);
                }
                Ok(Step::write(WritePlan::WithModification {
                    modification: NewModification {
                        original_timetable_id: timetable_id.clone(),
                        original_date: ctx.today,
                        kind: ModificationKind::Rescheduled {
                            date,
                            start_time,
                            end_time,
                            room: non_blank(input.room),
                            notes: non_blank(input.notes),
                        },
                    },
                    status: AttendanceStatus::Rescheduled,
                }))
            }

            (MarkingFlow::SwapFlow { timetable_id }, FlowEvent::SubmitSwap { swapped_with }) => {
                if !ctx.swap_partners(timetable_id).iter().any(|c| c.entry.id == swapped_with) {
                    return Err(FlowError::InvalidSwapPartner);
                }
                Ok(Step::write(WritePlan::WithModification {
                    modification: NewModification {
                        original_timetable_id: timetable_id.clone(),
                        original_date: ctx.today,
                        kind: ModificationKind::Swapped { swapped_with_timetable_id: swapped_with },
                    },
                    status: AttendanceStatus::Swapped,
                }))
            }

            _ => Err(FlowError::UnexpectedEvent),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
