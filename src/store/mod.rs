mod error;
mod memory;

pub use error::StoreError;
pub use memory::{MemoryRecord, MemoryStore};

use crate::db::{SqlRecord, SqliteStore};
use crate::model::{AttendanceRecord, Grade, RecordId};
use crate::remote::{RemoteRecord, RemoteStore};
use chrono::NaiveDate;
use rusqlite::types::Value as SqlValue;
use serde_json::json;

/// Entity kinds every backend can hold.
pub trait Record: MemoryRecord + SqlRecord + RemoteRecord {}

impl<T: MemoryRecord + SqlRecord + RemoteRecord> Record for T {}

/// The active record store. Exactly one backend is open at a time.
pub enum Store {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
    Remote(RemoteStore),
}

impl Store {
    pub fn backend(&self) -> &'static str {
        match self {
            Store::Memory(_) => "mock",
            Store::Sqlite(_) => "sqlite",
            Store::Remote(_) => "remote",
        }
    }

    pub fn get_all<E: Record>(&mut self) -> Result<Vec<E>, StoreError> {
        match self {
            Store::Memory(s) => s.get_all(),
            Store::Sqlite(s) => s.get_all(),
            Store::Remote(s) => s.get_all(),
        }
    }

    pub fn get_by_id<E: Record>(&mut self, id: RecordId) -> Result<E, StoreError> {
        match self {
            Store::Memory(s) => s.get_by_id(id),
            Store::Sqlite(s) => s.get_by_id(id),
            Store::Remote(s) => s.get_by_id(id),
        }
    }

    pub fn create<E: Record>(&mut self, draft: E::Draft) -> Result<E, StoreError> {
        match self {
            Store::Memory(s) => s.create(draft),
            Store::Sqlite(s) => s.create(draft),
            Store::Remote(s) => s.create(draft),
        }
    }

    pub fn update<E: Record>(&mut self, id: RecordId, patch: E::Patch) -> Result<E, StoreError> {
        match self {
            Store::Memory(s) => s.update(id, patch),
            Store::Sqlite(s) => s.update(id, patch),
            Store::Remote(s) => s.update(id, patch),
        }
    }

    pub fn delete<E: Record>(&mut self, id: RecordId) -> Result<(), StoreError> {
        match self {
            Store::Memory(s) => s.delete::<E>(id),
            Store::Sqlite(s) => s.delete::<E>(id),
            Store::Remote(s) => s.delete::<E>(id),
        }
    }

    pub fn attendance_by_student(
        &mut self,
        student_id: RecordId,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        match self {
            Store::Sqlite(s) => s.find_by("student_id", SqlValue::Integer(student_id)),
            Store::Remote(s) => s.find_by("studentId", json!(student_id)),
            Store::Memory(s) => Ok(s
                .get_all::<AttendanceRecord>()?
                .into_iter()
                .filter(|r| r.student_id == student_id)
                .collect()),
        }
    }

    pub fn attendance_by_date(
        &mut self,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        match self {
            Store::Sqlite(s) => s.find_by("date", SqlValue::Text(date.to_string())),
            Store::Remote(s) => s.find_by("date", json!(date.to_string())),
            Store::Memory(s) => Ok(s
                .get_all::<AttendanceRecord>()?
                .into_iter()
                .filter(|r| r.date == date)
                .collect()),
        }
    }

    pub fn grades_by_student(&mut self, student_id: RecordId) -> Result<Vec<Grade>, StoreError> {
        match self {
            Store::Sqlite(s) => s.find_by("student_id", SqlValue::Integer(student_id)),
            Store::Remote(s) => s.find_by("studentId", json!(student_id)),
            Store::Memory(s) => Ok(s
                .get_all::<Grade>()?
                .into_iter()
                .filter(|g| g.student_id == student_id)
                .collect()),
        }
    }

    pub fn grades_by_assignment(
        &mut self,
        assignment_id: RecordId,
    ) -> Result<Vec<Grade>, StoreError> {
        match self {
            Store::Sqlite(s) => s.find_by("assignment_id", SqlValue::Integer(assignment_id)),
            Store::Remote(s) => s.find_by("assignmentId", json!(assignment_id)),
            Store::Memory(s) => Ok(s
                .get_all::<Grade>()?
                .into_iter()
                .filter(|g| g.assignment_id == assignment_id)
                .collect()),
        }
    }
}
