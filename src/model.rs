use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type RecordId = i64;

/// A record kind the store can hold.
///
/// `Draft` is what callers submit on create (everything but the id) and
/// `Patch` is the sparse set of fields an update merges over a stored record.
pub trait Entity: Clone + fmt::Debug + Serialize + DeserializeOwned {
    const KIND: &'static str;
    type Draft: Clone + fmt::Debug + Serialize + DeserializeOwned;
    type Patch: Clone + fmt::Debug + Default + Serialize + DeserializeOwned;

    fn id(&self) -> RecordId;
    fn from_draft(id: RecordId, draft: Self::Draft) -> Self;
    fn apply(&mut self, patch: Self::Patch);
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ParseEnumError {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    #[default]
    Active,
    Inactive,
}

string_enum!(StudentStatus, "student status", {
    Active => "active",
    Inactive => "inactive",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

string_enum!(AttendanceStatus, "attendance status", {
    Present => "present",
    Absent => "absent",
    Late => "late",
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentCategory {
    #[default]
    Homework,
    Quiz,
    Test,
    Project,
    Participation,
}

string_enum!(AssignmentCategory, "assignment category", {
    Homework => "homework",
    Quiz => "quiz",
    Test => "test",
    Project => "project",
    Participation => "participation",
});

/// Current calendar day in UTC, the day an ISO timestamp of "now" starts with.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn default_grade_level() -> i64 {
    9
}

fn default_total_points() -> f64 {
    100.0
}

// ---- students ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    pub grade_level: i64,
    pub email: String,
    pub phone: String,
    pub status: StudentStatus,
    pub enrollment_date: NaiveDate,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDraft {
    pub first_name: String,
    pub last_name: String,
    #[serde(default = "default_grade_level")]
    pub grade_level: i64,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StudentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrollment_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade_level: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StudentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrollment_date: Option<NaiveDate>,
}

impl Entity for Student {
    const KIND: &'static str = "student";
    type Draft = StudentDraft;
    type Patch = StudentPatch;

    fn id(&self) -> RecordId {
        self.id
    }

    fn from_draft(id: RecordId, draft: StudentDraft) -> Self {
        Student {
            id,
            first_name: draft.first_name,
            last_name: draft.last_name,
            grade_level: draft.grade_level,
            email: draft.email,
            phone: draft.phone,
            status: draft.status.unwrap_or_default(),
            enrollment_date: draft.enrollment_date.unwrap_or_else(today),
        }
    }

    fn apply(&mut self, patch: StudentPatch) {
        if let Some(v) = patch.first_name {
            self.first_name = v;
        }
        if let Some(v) = patch.last_name {
            self.last_name = v;
        }
        if let Some(v) = patch.grade_level {
            self.grade_level = v;
        }
        if let Some(v) = patch.email {
            self.email = v;
        }
        if let Some(v) = patch.phone {
            self.phone = v;
        }
        if let Some(v) = patch.status {
            self.status = v;
        }
        if let Some(v) = patch.enrollment_date {
            self.enrollment_date = v;
        }
    }
}

// ---- attendance ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: RecordId,
    pub student_id: RecordId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceDraft {
    pub student_id: RecordId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendancePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AttendanceStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Entity for AttendanceRecord {
    const KIND: &'static str = "attendance";
    type Draft = AttendanceDraft;
    type Patch = AttendancePatch;

    fn id(&self) -> RecordId {
        self.id
    }

    fn from_draft(id: RecordId, draft: AttendanceDraft) -> Self {
        AttendanceRecord {
            id,
            student_id: draft.student_id,
            date: draft.date,
            status: draft.status,
            notes: draft.notes,
        }
    }

    fn apply(&mut self, patch: AttendancePatch) {
        if let Some(v) = patch.student_id {
            self.student_id = v;
        }
        if let Some(v) = patch.date {
            self.date = v;
        }
        if let Some(v) = patch.status {
            self.status = v;
        }
        if let Some(v) = patch.notes {
            self.notes = v;
        }
    }
}

// ---- assignments ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: RecordId,
    pub title: String,
    pub category: AssignmentCategory,
    pub total_points: f64,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentDraft {
    pub title: String,
    #[serde(default)]
    pub category: AssignmentCategory,
    #[serde(default = "default_total_points")]
    pub total_points: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<AssignmentCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_points: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

impl Entity for Assignment {
    const KIND: &'static str = "assignment";
    type Draft = AssignmentDraft;
    type Patch = AssignmentPatch;

    fn id(&self) -> RecordId {
        self.id
    }

    fn from_draft(id: RecordId, draft: AssignmentDraft) -> Self {
        Assignment {
            id,
            title: draft.title,
            category: draft.category,
            total_points: draft.total_points,
            due_date: draft.due_date.unwrap_or_else(today),
        }
    }

    fn apply(&mut self, patch: AssignmentPatch) {
        if let Some(v) = patch.title {
            self.title = v;
        }
        if let Some(v) = patch.category {
            self.category = v;
        }
        if let Some(v) = patch.total_points {
            self.total_points = v;
        }
        if let Some(v) = patch.due_date {
            self.due_date = v;
        }
    }
}

// ---- grades ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: RecordId,
    pub student_id: RecordId,
    pub assignment_id: RecordId,
    pub score: f64,
    pub submitted_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeDraft {
    pub student_id: RecordId,
    pub assignment_id: RecordId,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_date: Option<DateTime<Utc>>,
}

impl Entity for Grade {
    const KIND: &'static str = "grade";
    type Draft = GradeDraft;
    type Patch = GradePatch;

    fn id(&self) -> RecordId {
        self.id
    }

    fn from_draft(id: RecordId, draft: GradeDraft) -> Self {
        Grade {
            id,
            student_id: draft.student_id,
            assignment_id: draft.assignment_id,
            score: draft.score,
            submitted_date: draft.submitted_date.unwrap_or_else(Utc::now),
        }
    }

    fn apply(&mut self, patch: GradePatch) {
        if let Some(v) = patch.student_id {
            self.student_id = v;
        }
        if let Some(v) = patch.assignment_id {
            self.assignment_id = v;
        }
        if let Some(v) = patch.score {
            self.score = v;
        }
        if let Some(v) = patch.submitted_date {
            self.submitted_date = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn student_draft_fills_defaults() {
        let draft: StudentDraft = serde_json::from_value(json!({
            "firstName": "Ada",
            "lastName": "Lovelace"
        }))
        .expect("draft");
        let s = Student::from_draft(7, draft);
        assert_eq!(s.id, 7);
        assert_eq!(s.grade_level, 9);
        assert_eq!(s.status, StudentStatus::Active);
        assert_eq!(s.email, "");
        assert_eq!(s.enrollment_date, today());
    }

    #[test]
    fn student_draft_keeps_supplied_status_and_enrollment() {
        let draft: StudentDraft = serde_json::from_value(json!({
            "firstName": "Noah",
            "lastName": "Davis",
            "status": "inactive",
            "enrollmentDate": "2023-08-28"
        }))
        .expect("draft");
        let s = Student::from_draft(4, draft);
        assert_eq!(s.status, StudentStatus::Inactive);
        assert_eq!(s.enrollment_date, NaiveDate::from_ymd_opt(2023, 8, 28).expect("date"));
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut rec = AttendanceRecord {
            id: 1,
            student_id: 3,
            date: NaiveDate::from_ymd_opt(2024, 9, 3).expect("date"),
            status: AttendanceStatus::Absent,
            notes: "bus late".into(),
        };
        let patch: AttendancePatch =
            serde_json::from_value(json!({ "status": "late" })).expect("patch");
        rec.apply(patch);
        assert_eq!(rec.status, AttendanceStatus::Late);
        assert_eq!(rec.notes, "bus late");
        assert_eq!(rec.student_id, 3);
    }

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!(
            " Present ".parse::<AttendanceStatus>(),
            Ok(AttendanceStatus::Present)
        );
        assert_eq!(
            "QUIZ".parse::<AssignmentCategory>(),
            Ok(AssignmentCategory::Quiz)
        );
        assert!("excused".parse::<AttendanceStatus>().is_err());
    }

    #[test]
    fn wire_names_are_camel_case() {
        let g = Grade {
            id: 4,
            student_id: 1,
            assignment_id: 2,
            score: 88.0,
            submitted_date: "2024-09-10T12:00:00Z".parse().expect("ts"),
        };
        let v = serde_json::to_value(&g).expect("json");
        assert_eq!(v["studentId"], json!(1));
        assert_eq!(v["assignmentId"], json!(2));
        assert!(v.get("submittedDate").is_some());
    }
}
