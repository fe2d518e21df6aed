use super::StoreError;
use crate::model::{Assignment, AttendanceRecord, Entity, Grade, RecordId, Student};
use serde::Deserialize;

const DEMO_ROSTER: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/fixtures/demo_roster.json"
));

#[derive(Debug)]
pub struct Table<E> {
    rows: Vec<E>,
    last_id: RecordId,
}

impl<E> Default for Table<E> {
    fn default() -> Self {
        Table {
            rows: Vec::new(),
            last_id: 0,
        }
    }
}

impl<E: Entity> Table<E> {
    fn from_rows(rows: Vec<E>) -> Self {
        let last_id = rows.iter().map(Entity::id).max().unwrap_or(0);
        Table { rows, last_id }
    }

    fn position(&self, id: RecordId) -> Result<usize, StoreError> {
        self.rows
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| StoreError::not_found(E::KIND, id))
    }
}

/// Mock backend: owned collections, lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    students: Table<Student>,
    attendance: Table<AttendanceRecord>,
    assignments: Table<Assignment>,
    grades: Table<Grade>,
}

pub trait MemoryRecord: Entity {
    fn table(store: &MemoryStore) -> &Table<Self>;
    fn table_mut(store: &mut MemoryStore) -> &mut Table<Self>;
}

macro_rules! memory_record {
    ($ty:ty, $field:ident) => {
        impl MemoryRecord for $ty {
            fn table(store: &MemoryStore) -> &Table<Self> {
                &store.$field
            }
            fn table_mut(store: &mut MemoryStore) -> &mut Table<Self> {
                &mut store.$field
            }
        }
    };
}

memory_record!(Student, students);
memory_record!(AttendanceRecord, attendance);
memory_record!(Assignment, assignments);
memory_record!(Grade, grades);

#[derive(Debug, Deserialize)]
struct Seed {
    students: Vec<Student>,
    attendance: Vec<AttendanceRecord>,
    assignments: Vec<Assignment>,
    grades: Vec<Grade>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the bundled demo roster.
    pub fn seeded() -> anyhow::Result<Self> {
        let seed: Seed = serde_json::from_str(DEMO_ROSTER)?;
        Ok(MemoryStore {
            students: Table::from_rows(seed.students),
            attendance: Table::from_rows(seed.attendance),
            assignments: Table::from_rows(seed.assignments),
            grades: Table::from_rows(seed.grades),
        })
    }

    pub fn get_all<E: MemoryRecord>(&self) -> Result<Vec<E>, StoreError> {
        Ok(E::table(self).rows.clone())
    }

    pub fn get_by_id<E: MemoryRecord>(&self, id: RecordId) -> Result<E, StoreError> {
        let table = E::table(self);
        let idx = table.position(id)?;
        Ok(table.rows[idx].clone())
    }

    pub fn create<E: MemoryRecord>(&mut self, draft: E::Draft) -> Result<E, StoreError> {
        let table = E::table_mut(self);
        table.last_id += 1;
        let record = E::from_draft(table.last_id, draft);
        table.rows.push(record.clone());
        Ok(record)
    }

    pub fn update<E: MemoryRecord>(
        &mut self,
        id: RecordId,
        patch: E::Patch,
    ) -> Result<E, StoreError> {
        let table = E::table_mut(self);
        let idx = table.position(id)?;
        let record = &mut table.rows[idx];
        record.apply(patch);
        Ok(record.clone())
    }

    pub fn delete<E: MemoryRecord>(&mut self, id: RecordId) -> Result<(), StoreError> {
        let table = E::table_mut(self);
        let idx = table.position(id)?;
        table.rows.remove(idx);
        Ok(())
    }
}
