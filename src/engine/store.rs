use ulid::Ulid;

use crate::model::{Appointment, Bay, Occupancy};

pub trait Record: Clone {
    fn id(&self) -> Ulid;
}

impl Record for Bay {
    fn id(&self) -> Ulid {
        self.id
    }
}

impl Record for Occupancy {
    fn id(&self) -> Ulid {
        self.id
    }
}

impl Record for Appointment {
    fn id(&self) -> Ulid {
        self.id
    }
}

/// Keyed records kept in insertion order. Upserting an existing id replaces it in place,
/// so "registry order" is the order records were first created.
#[derive(Debug, Clone)]
pub struct Table<T> {
    rows: Vec<T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<T: Record> Table<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, id: &Ulid) -> Option<&T> {
        self.rows.iter().find(|r| r.id() == *id)
    }

    pub fn contains(&self, id: &Ulid) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.rows.iter()
    }

    pub fn list(&self, filter: impl Fn(&T) -> bool) -> Vec<&T> {
        self.rows.iter().filter(|r| filter(r)).collect()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.rows
    }

    pub fn upsert(&mut self, record: T) {
        let id = record.id();
        match self.rows.iter_mut().find(|r| r.id() == id) {
            Some(existing) => *existing = record,
            None => self.rows.push(record),
        }
    }

    pub fn delete(&mut self, id: &Ulid) -> Option<T> {
        let pos = self.rows.iter().position(|r| r.id() == *id)?;
        Some(self.rows.remove(pos))
    }
}
