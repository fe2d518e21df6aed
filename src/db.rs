use crate::model::{
    Assignment, AttendanceRecord, Entity, Grade, RecordId, Student,
};
use crate::store::StoreError;
use anyhow::Context;
use rusqlite::types::{Type, Value};
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DB_FILE_NAME: &str = "rollbook.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)
        .with_context(|| format!("create workspace {}", workspace.display()))?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("open {}", db_path.display()))?;

    // No foreign keys: deleting a student leaves their grades and attendance behind.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            grade_level INTEGER NOT NULL,
            email TEXT NOT NULL DEFAULT '',
            phone TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL,
            enrollment_date TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            status TEXT NOT NULL,
            notes TEXT NOT NULL DEFAULT ''
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_student ON attendance(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(date)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS assignments(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            category TEXT NOT NULL,
            total_points REAL NOT NULL,
            due_date TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS grades(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL,
            assignment_id INTEGER NOT NULL,
            score REAL NOT NULL,
            submitted_date TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_grades_student ON grades(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_grades_assignment ON grades(assignment_id)",
        [],
    )?;

    Ok(conn)
}

/// Column mapping for one entity kind. `from_row` reads `id` at index 0 and
/// `COLUMNS` after it, in order.
pub trait SqlRecord: Entity {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
    fn values(&self) -> Vec<Value>;
}

fn parse_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn text(s: impl ToString) -> Value {
    Value::Text(s.to_string())
}

impl SqlRecord for Student {
    const TABLE: &'static str = "students";
    const COLUMNS: &'static [&'static str] = &[
        "first_name",
        "last_name",
        "grade_level",
        "email",
        "phone",
        "status",
        "enrollment_date",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Student {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            grade_level: row.get(3)?,
            email: row.get(4)?,
            phone: row.get(5)?,
            status: parse_col(row, 6)?,
            enrollment_date: parse_col(row, 7)?,
        })
    }

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.first_name),
            text(&self.last_name),
            Value::Integer(self.grade_level),
            text(&self.email),
            text(&self.phone),
            text(self.status),
            text(self.enrollment_date),
        ]
    }
}

impl SqlRecord for AttendanceRecord {
    const TABLE: &'static str = "attendance";
    const COLUMNS: &'static [&'static str] = &["student_id", "date", "status", "notes"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(AttendanceRecord {
            id: row.get(0)?,
            student_id: row.get(1)?,
            date: parse_col(row, 2)?,
            status: parse_col(row, 3)?,
            notes: row.get(4)?,
        })
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.student_id),
            text(self.date),
            text(self.status),
            text(&self.notes),
        ]
    }
}

impl SqlRecord for Assignment {
    const TABLE: &'static str = "assignments";
    const COLUMNS: &'static [&'static str] = &["title", "category", "total_points", "due_date"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Assignment {
            id: row.get(0)?,
            title: row.get(1)?,
            category: parse_col(row, 2)?,
            total_points: row.get(3)?,
            due_date: parse_col(row, 4)?,
        })
    }

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.title),
            text(self.category),
            Value::Real(self.total_points),
            text(self.due_date),
        ]
    }
}

impl SqlRecord for Grade {
    const TABLE: &'static str = "grades";
    const COLUMNS: &'static [&'static str] =
        &["student_id", "assignment_id", "score", "submitted_date"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Grade {
            id: row.get(0)?,
            student_id: row.get(1)?,
            assignment_id: row.get(2)?,
            score: row.get(3)?,
            submitted_date: parse_col(row, 4)?,
        })
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.student_id),
            Value::Integer(self.assignment_id),
            Value::Real(self.score),
            text(self.submitted_date.to_rfc3339()),
        ]
    }
}

fn select_sql<E: SqlRecord>() -> String {
    format!("SELECT id, {} FROM {}", E::COLUMNS.join(", "), E::TABLE)
}

/// Workspace backend: one SQLite file per workspace directory.
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        let conn = open_db(workspace)?;
        Ok(SqliteStore {
            conn,
            path: workspace.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_all<E: SqlRecord>(&self) -> Result<Vec<E>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY id", select_sql::<E>()))?;
        let rows = stmt
            .query_map([], |r| E::from_row(r))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Rows whose integer `column` equals `value`, in id order.
    pub fn find_by<E: SqlRecord>(
        &self,
        column: &str,
        value: Value,
    ) -> Result<Vec<E>, StoreError> {
        if !E::COLUMNS.contains(&column) {
            return Err(StoreError::failed(
                "query",
                format!("unknown column {} on {}", column, E::TABLE),
            ));
        }
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE {} = ? ORDER BY id",
            select_sql::<E>(),
            column
        ))?;
        let rows = stmt
            .query_map([value], |r| E::from_row(r))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get_by_id<E: SqlRecord>(&self, id: RecordId) -> Result<E, StoreError> {
        self.conn
            .query_row(&format!("{} WHERE id = ?", select_sql::<E>()), [id], |r| {
                E::from_row(r)
            })
            .optional()?
            .ok_or_else(|| StoreError::not_found(E::KIND, id))
    }

    pub fn create<E: SqlRecord>(&self, draft: E::Draft) -> Result<E, StoreError> {
        // id is assigned by AUTOINCREMENT; the placeholder is never written.
        let record = E::from_draft(0, draft);
        let placeholders = vec!["?"; E::COLUMNS.len()].join(", ");
        self.conn.execute(
            &format!(
                "INSERT INTO {}({}) VALUES({})",
                E::TABLE,
                E::COLUMNS.join(", "),
                placeholders
            ),
            params_from_iter(record.values()),
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_by_id(id)
    }

    pub fn update<E: SqlRecord>(&self, id: RecordId, patch: E::Patch) -> Result<E, StoreError> {
        let mut record: E = self.get_by_id(id)?;
        record.apply(patch);
        let assignments = E::COLUMNS
            .iter()
            .map(|c| format!("{} = ?", c))
            .collect::<Vec<_>>()
            .join(", ");
        let mut values = record.values();
        values.push(Value::Integer(id));
        self.conn.execute(
            &format!("UPDATE {} SET {} WHERE id = ?", E::TABLE, assignments),
            params_from_iter(values),
        )?;
        Ok(record)
    }

    pub fn delete<E: SqlRecord>(&self, id: RecordId) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute(&format!("DELETE FROM {} WHERE id = ?", E::TABLE), [id])?;
        if changed == 0 {
            return Err(StoreError::not_found(E::KIND, id));
        }
        Ok(())
    }
}
