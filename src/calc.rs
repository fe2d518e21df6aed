use crate::model::{Assignment, AttendanceRecord, AttendanceStatus, Grade, RecordId, Student};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Half-up rounding to a whole number: `floor(x + 0.5)`.
pub fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

fn percent_of(part: usize, whole: usize) -> i64 {
    if whole == 0 {
        return 0;
    }
    round_half_up(100.0 * part as f64 / whole as f64)
}

fn count_status(records: &[AttendanceRecord], date: NaiveDate, status: AttendanceStatus) -> usize {
    records
        .iter()
        .filter(|r| r.date == date && r.status == status)
        .count()
}

/// Percent of the roster marked present on `date`; 0 for an empty roster.
pub fn attendance_rate(records: &[AttendanceRecord], student_count: usize, date: NaiveDate) -> i64 {
    percent_of(
        count_status(records, date, AttendanceStatus::Present),
        student_count,
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub date: NaiveDate,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub unmarked: usize,
    pub total: usize,
    pub rate: i64,
}

pub fn day_summary(records: &[AttendanceRecord], student_count: usize, date: NaiveDate) -> DaySummary {
    let present = count_status(records, date, AttendanceStatus::Present);
    let absent = count_status(records, date, AttendanceStatus::Absent);
    let late = count_status(records, date, AttendanceStatus::Late);
    // Duplicate or orphaned records can push the marked count past the roster size.
    let unmarked = student_count.saturating_sub(present + absent + late);
    DaySummary {
        date,
        present,
        absent,
        late,
        unmarked,
        total: student_count,
        rate: percent_of(present, student_count),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthDay {
    pub date: NaiveDate,
    pub present: usize,
    pub rate: i64,
}

/// Present count and attendance rate for every day of `month`.
/// `None` when `year`/`month` is not a real month.
pub fn month_calendar(
    records: &[AttendanceRecord],
    student_count: usize,
    year: i32,
    month: u32,
) -> Option<Vec<MonthDay>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let days = first
        .iter_days()
        .take_while(|d| d.month() == month)
        .map(|date| MonthDay {
            date,
            present: count_status(records, date, AttendanceStatus::Present),
            rate: attendance_rate(records, student_count, date),
        })
        .collect();
    Some(days)
}

/// Student average as a percent, treating every assignment as out of 100
/// regardless of its `total_points`.
pub fn student_average(grades: &[Grade], student_id: RecordId) -> Option<i64> {
    let scores: Vec<f64> = grades
        .iter()
        .filter(|g| g.student_id == student_id)
        .map(|g| g.score)
        .collect();
    if scores.is_empty() {
        return None;
    }
    let total: f64 = scores.iter().sum();
    let max_points = scores.len() as f64 * 100.0;
    Some(round_half_up(total / max_points * 100.0))
}

/// Mean raw score for one assignment.
pub fn assignment_average(grades: &[Grade], assignment_id: RecordId) -> Option<i64> {
    let scores: Vec<f64> = grades
        .iter()
        .filter(|g| g.assignment_id == assignment_id)
        .map(|g| g.score)
        .collect();
    if scores.is_empty() {
        return None;
    }
    Some(round_half_up(scores.iter().sum::<f64>() / scores.len() as f64))
}

/// Mean of every score on record, 0 when there are none.
pub fn class_average(grades: &[Grade]) -> i64 {
    if grades.is_empty() {
        return 0;
    }
    let total: f64 = grades.iter().map(|g| g.score).sum();
    round_half_up(total / grades.len() as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    Excellent,
    Good,
    Fair,
    Failing,
}

pub fn score_percent(score: f64, total_points: f64) -> f64 {
    let out_of = if total_points > 0.0 { total_points } else { 100.0 };
    100.0 * score / out_of
}

pub fn score_band(score: f64, total_points: f64) -> ScoreBand {
    let pct = score_percent(score, total_points);
    if pct >= 90.0 {
        ScoreBand::Excellent
    } else if pct >= 80.0 {
        ScoreBand::Good
    } else if pct >= 70.0 {
        ScoreBand::Fair
    } else {
        ScoreBand::Failing
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub date: NaiveDate,
    pub total_students: usize,
    pub total_assignments: usize,
    pub present_today: usize,
    pub attendance_rate: i64,
    pub class_average: i64,
}

pub fn dashboard_stats(
    students: &[Student],
    assignments: &[Assignment],
    attendance: &[AttendanceRecord],
    grades: &[Grade],
    today: NaiveDate,
) -> DashboardStats {
    let present_today = count_status(attendance, today, AttendanceStatus::Present);
    DashboardStats {
        date: today,
        total_students: students.len(),
        total_assignments: assignments.len(),
        present_today,
        attendance_rate: attendance_rate(attendance, students.len(), today),
        class_average: class_average(grades),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayActivity {
    pub date: NaiveDate,
    pub attendance: Vec<AttendanceRecord>,
    pub grades: Vec<Grade>,
}

pub fn todays_activity(
    attendance: &[AttendanceRecord],
    grades: &[Grade],
    today: NaiveDate,
) -> TodayActivity {
    TodayActivity {
        date: today,
        attendance: attendance
            .iter()
            .filter(|r| r.date == today)
            .cloned()
            .collect(),
        grades: grades
            .iter()
            .filter(|g| g.submitted_date.date_naive() == today)
            .cloned()
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRow {
    pub student_id: RecordId,
    pub student_name: String,
    /// One entry per assignment, in `GradeSheet::assignments` order.
    pub scores: Vec<Option<f64>>,
    pub average: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetColumn {
    pub assignment_id: RecordId,
    pub title: String,
    pub total_points: f64,
    pub average: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeSheet {
    pub assignments: Vec<SheetColumn>,
    pub rows: Vec<SheetRow>,
}

/// First grade for a (student, assignment) pair, in store order.
pub fn find_grade(grades: &[Grade], student_id: RecordId, assignment_id: RecordId) -> Option<&Grade> {
    grades
        .iter()
        .find(|g| g.student_id == student_id && g.assignment_id == assignment_id)
}

pub fn grade_sheet(students: &[Student], assignments: &[Assignment], grades: &[Grade]) -> GradeSheet {
    let columns = assignments
        .iter()
        .map(|a| SheetColumn {
            assignment_id: a.id,
            title: a.title.clone(),
            total_points: a.total_points,
            average: assignment_average(grades, a.id),
        })
        .collect();
    let rows = students
        .iter()
        .map(|s| SheetRow {
            student_id: s.id,
            student_name: s.full_name(),
            scores: assignments
                .iter()
                .map(|a| find_grade(grades, s.id, a.id).map(|g| g.score))
                .collect(),
            average: student_average(grades, s.id),
        })
        .collect();
    GradeSheet {
        assignments: columns,
        rows,
    }
}
