use crate::model::{Assignment, Grade, Student};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct StudentQuery {
    pub search: Option<String>,
    pub grade_level: Option<i64>,
}

impl StudentQuery {
    pub fn matches(&self, s: &Student) -> bool {
        if let Some(level) = self.grade_level {
            if s.grade_level != level {
                return false;
            }
        }
        let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            return true;
        };
        let term = term.to_lowercase();
        s.first_name.to_lowercase().contains(&term)
            || s.last_name.to_lowercase().contains(&term)
            || s.email.to_lowercase().contains(&term)
    }

    pub fn apply(&self, students: Vec<Student>) -> Vec<Student> {
        students.into_iter().filter(|s| self.matches(s)).collect()
    }
}

/// Grades whose student name ("First Last") or assignment title contains
/// `search`, case-insensitively. Grades pointing at deleted records only match
/// through whichever side still exists.
pub fn search_grades(
    grades: Vec<Grade>,
    students: &[Student],
    assignments: &[Assignment],
    search: &str,
) -> Vec<Grade> {
    let term = search.trim().to_lowercase();
    if term.is_empty() {
        return grades;
    }
    let names: HashMap<_, _> = students
        .iter()
        .map(|s| (s.id, s.full_name().to_lowercase()))
        .collect();
    let titles: HashMap<_, _> = assignments
        .iter()
        .map(|a| (a.id, a.title.to_lowercase()))
        .collect();
    grades
        .into_iter()
        .filter(|g| {
            names
                .get(&g.student_id)
                .is_some_and(|n| n.contains(&term))
                || titles
                    .get(&g.assignment_id)
                    .is_some_and(|t| t.contains(&term))
        })
        .collect()
}

/// Serialize `rows`, keeping only `id` plus the requested keys.
pub fn project<T: Serialize>(rows: &[T], fields: Option<&[String]>) -> serde_json::Result<Vec<Value>> {
    rows.iter()
        .map(|row| {
            let value = serde_json::to_value(row)?;
            let Some(fields) = fields else {
                return Ok(value);
            };
            let Value::Object(obj) = value else {
                return Ok(value);
            };
            let kept: Map<String, Value> = obj
                .into_iter()
                .filter(|(k, _)| k == "id" || fields.iter().any(|f| f == k))
                .collect();
            Ok(Value::Object(kept))
        })
        .collect()
}
