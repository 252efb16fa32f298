// src/services/stats_service.rs
use crate::{
    error::AppResult,
    models::{
        attendance::AttendanceRecord,
        manual_attendance::ManualAttendance,
        profile::SessionContext,
        stats::{percentage, AttendanceSummary, ManualStats, StatusTally, SubjectStats},
        timetable::TimetableEntry,
    },
    services::{attendance_service, manual_attendance_service, timetable_service},
};
use sqlx::SqlitePool;
use std::collections::HashMap;

/// Per-subject and overall attendance.
///
/// Cancelled and swapped classes are left out of the denominator, rescheduled
/// classes count as present. Records of classes that are not on the section's
/// timetable are ignored. Manual counts are shown next to a subject, never
/// merged into it.
pub fn summarize(
    entries: &[TimetableEntry],
    records: &[AttendanceRecord],
    manual: &[ManualAttendance],
) -> AttendanceSummary {
    let class_subject: HashMap<&str, &str> = entries
        .iter()
        .map(|e| (e.id.as_str(), e.subject_code.as_str()))
        .collect();

    // Subjects in first-seen timetable order.
    let mut subjects: Vec<SubjectStats> = Vec::new();
    let mut index_of: HashMap<&str, usize> = HashMap::new();
    for entry in entries {
        if !index_of.contains_key(entry.subject_code.as_str()) {
            index_of.insert(entry.subject_code.as_str(), subjects.len());
            subjects.push(SubjectStats {
                subject_code: entry.subject_code.clone(),
                subject_name: entry.subject_name.clone(),
                total: 0,
                present: 0,
                absent: 0,
                percentage: 0.0,
                manual: None,
            });
        }
    }

    let mut tally = StatusTally::default();
    for record in records {
        tally.add(record.status);

        let Some(code) = class_subject.get(record.timetable_id.as_str()) else {
            continue;
        };
        if !record.status.is_counted() {
            continue;
        }
        let stats = &mut subjects[index_of[code]];
        stats.total += 1;
        if record.status.is_attended() {
            stats.present += 1;
        } else {
            stats.absent += 1;
        }
    }

    for row in manual {
        if let Some(&i) = index_of.get(row.subject_code.as_str()) {
            subjects[i].manual = Some(ManualStats {
                classes_held: row.classes_held,
                classes_attended: row.classes_attended,
                percentage: row.percentage(),
            });
        }
    }

    for stats in &mut subjects {
        stats.percentage = percentage(stats.present, stats.total);
    }
    subjects.retain(|s| s.total > 0 || s.manual.is_some());

    let total: usize = subjects.iter().map(|s| s.total).sum();
    let present: usize = subjects.iter().map(|s| s.present).sum();

    AttendanceSummary {
        overall_percentage: percentage(present, total),
        total,
        present,
        tally,
        subjects,
    }
}

/// Loads everything the summary needs for the logged-in student.
pub async fn summary_for(db_pool: &SqlitePool, ctx: &SessionContext) -> AppResult<AttendanceSummary> {
    let entries = timetable_service::list_for_section(db_pool, &ctx.section).await?;
    let records = attendance_service::list_for_student(db_pool, &ctx.user_id).await?;
    let manual = manual_attendance_service::list(db_pool, &ctx.user_id).await?;

    let summary = summarize(&entries, &records, &manual);
    tracing::debug!(
        "Attendance for {}: {:.1}% over {} counted classes",
        ctx.user_id,
        summary.overall_percentage,
        summary.total
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attendance::AttendanceStatus;
    use chrono::{NaiveDate, NaiveTime};

    fn entry(id: &str, code: &str) -> TimetableEntry {
        TimetableEntry {
            id: id.into(),
            section: "A2".into(),
            day_of_week: 0,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            subject_code: code.into(),
            subject_name: format!("{} name", code),
            professor_name: "Prof".into(),
            room: None,
            class_type: "lecture".into(),
        }
    }

    fn record(class: &str, day: u32, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            id: format!("{}-{}", class, day),
            student_id: "stu-1".into(),
            timetable_id: class.into(),
            date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            status,
            marked_at: None,
            modification_id: None,
        }
    }

    #[test]
    fn rescheduled_counts_as_present_and_cancelled_is_excluded() {
        use AttendanceStatus::*;
        let entries = vec![entry("t1", "CS301"), entry("t2", "CS301")];
        let records = vec![
            record("t1", 3, Present),
            record("t1", 10, Present),
            record("t2", 4, Rescheduled),
            record("t2", 11, Absent),
            record("t1", 17, Cancelled),
            record("t2", 18, Swapped),
        ];

        let summary = summarize(&entries, &records, &[]);

        assert_eq!(summary.subjects.len(), 1);
        let os = &summary.subjects[0];
        assert_eq!((os.total, os.present, os.absent), (4, 3, 1));
        assert!((os.percentage - 75.0).abs() < f64::EPSILON);
        assert!((summary.overall_percentage - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn tally_accounts_for_every_record() {
        use AttendanceStatus::*;
        let entries = vec![entry("t1", "CS301")];
        let records = vec![
            record("t1", 3, Present),
            record("t1", 4, Absent),
            record("t1", 5, Cancelled),
            record("t1", 6, Swapped),
            record("t1", 7, Rescheduled),
            record("other-section", 8, Present),
        ];

        let summary = summarize(&entries, &records, &[]);

        assert_eq!(summary.tally.total_records(), records.len());
        assert_eq!(summary.tally.present, 2);
        // the unknown class does not reach the subject counts
        assert_eq!(summary.subjects[0].total, 3);
    }

    #[test]
    fn overall_is_weighted_by_classes_not_subjects() {
        use AttendanceStatus::*;
        let entries = vec![entry("t1", "A"), entry("t2", "B")];
        let records = vec![
            record("t1", 3, Present),
            record("t2", 3, Absent),
            record("t2", 4, Absent),
            record("t2", 5, Present),
        ];

        let summary = summarize(&entries, &records, &[]);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.present, 2);
        assert!((summary.overall_percentage - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_history_is_zero_percent() {
        let summary = summarize(&[entry("t1", "A")], &[], &[]);
        assert!(summary.subjects.is_empty());
        assert_eq!(summary.overall_percentage, 0.0);
    }

    #[test]
    fn manual_counts_sit_next_to_recorded_counts() {
        use AttendanceStatus::*;
        let entries = vec![entry("t1", "A"), entry("t2", "B")];
        let records = vec![record("t1", 3, Present), record("t1", 4, Absent)];
        let manual = vec![ManualAttendance {
            id: "m1".into(),
            student_id: "stu-1".into(),
            subject_code: "B".into(),
            classes_held: 10,
            classes_attended: 8,
        }];

        let summary = summarize(&entries, &records, &manual);

        assert_eq!(summary.subjects.len(), 2);
        let b = summary.subjects.iter().find(|s| s.subject_code == "B").unwrap();
        assert_eq!(b.total, 0);
        let manual = b.manual.as_ref().unwrap();
        assert!((manual.percentage - 80.0).abs() < f64::EPSILON);
        // manual numbers never change the overall figure
        assert!((summary.overall_percentage - 50.0).abs() < f64::EPSILON);
    }
}
