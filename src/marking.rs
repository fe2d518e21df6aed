use crate::calc::find_grade;
use crate::model::{
    AttendanceDraft, AttendancePatch, AttendanceRecord, AttendanceStatus, Grade, GradeDraft,
    GradePatch, RecordId, Student,
};
use crate::store::{Store, StoreError};
use chrono::{NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkAction {
    Created,
    Updated,
    Unchanged,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Marked<T> {
    pub action: MarkAction,
    pub record: T,
}

/// Set one student's status for a day: the first existing record for the
/// pair is updated, otherwise a new one is created with empty notes.
pub fn mark_attendance(
    store: &mut Store,
    student_id: RecordId,
    date: NaiveDate,
    status: AttendanceStatus,
) -> Result<Marked<AttendanceRecord>, StoreError> {
    let existing = store
        .attendance_by_date(date)?
        .into_iter()
        .find(|r| r.student_id == student_id);
    match existing {
        Some(rec) => {
            let record = store.update::<AttendanceRecord>(
                rec.id,
                AttendancePatch {
                    status: Some(status),
                    ..Default::default()
                },
            )?;
            Ok(Marked {
                action: MarkAction::Updated,
                record,
            })
        }
        None => {
            let record = store.create::<AttendanceRecord>(AttendanceDraft {
                student_id,
                date,
                status,
                notes: String::new(),
            })?;
            Ok(Marked {
                action: MarkAction::Created,
                record,
            })
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcome {
    pub student_id: RecordId,
    pub action: MarkAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BulkOutcome {
    fn failed(student_id: RecordId, e: &StoreError) -> Self {
        tracing::warn!(student_id, error = %e, "mark present failed");
        BulkOutcome {
            student_id,
            action: MarkAction::Failed,
            record_id: None,
            error: Some(e.to_string()),
        }
    }
}

/// Mark every student present for `date`, one store call per student.
/// A failure is recorded for that student and the loop moves on; earlier
/// writes stay in place.
pub fn mark_all_present(store: &mut Store, date: NaiveDate) -> Result<Vec<BulkOutcome>, StoreError> {
    let students: Vec<Student> = store.get_all()?;
    let day = store.attendance_by_date(date)?;

    let mut outcomes = Vec::with_capacity(students.len());
    for student in &students {
        let existing = day.iter().find(|r| r.student_id == student.id);
        let outcome = match existing {
            Some(rec) if rec.status == AttendanceStatus::Present => BulkOutcome {
                student_id: student.id,
                action: MarkAction::Unchanged,
                record_id: Some(rec.id),
                error: None,
            },
            Some(rec) => match store.update::<AttendanceRecord>(
                rec.id,
                AttendancePatch {
                    status: Some(AttendanceStatus::Present),
                    ..Default::default()
                },
            ) {
                Ok(updated) => BulkOutcome {
                    student_id: student.id,
                    action: MarkAction::Updated,
                    record_id: Some(updated.id),
                    error: None,
                },
                Err(e) => BulkOutcome::failed(student.id, &e),
            },
            None => match store.create::<AttendanceRecord>(AttendanceDraft {
                student_id: student.id,
                date,
                status: AttendanceStatus::Present,
                notes: String::new(),
            }) {
                Ok(created) => BulkOutcome {
                    student_id: student.id,
                    action: MarkAction::Created,
                    record_id: Some(created.id),
                    error: None,
                },
                Err(e) => BulkOutcome::failed(student.id, &e),
            },
        };
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

/// Record a score: updates the first grade for (student, assignment) or
/// creates one stamped with the current time.
pub fn set_grade(
    store: &mut Store,
    student_id: RecordId,
    assignment_id: RecordId,
    score: f64,
) -> Result<Marked<Grade>, StoreError> {
    let grades = store.grades_by_student(student_id)?;
    match find_grade(&grades, student_id, assignment_id) {
        Some(existing) => {
            let record = store.update::<Grade>(
                existing.id,
                GradePatch {
                    score: Some(score),
                    ..Default::default()
                },
            )?;
            Ok(Marked {
                action: MarkAction::Updated,
                record,
            })
        }
        None => {
            let record = store.create::<Grade>(GradeDraft {
                student_id,
                assignment_id,
                score,
                submitted_date: Some(Utc::now()),
            })?;
            Ok(Marked {
                action: MarkAction::Created,
                record,
            })
        }
    }
}
