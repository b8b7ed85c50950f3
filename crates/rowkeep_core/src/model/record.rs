//! Row-shaped attribute containers.
//!
//! # Responsibility
//! - Hold the attributes of one row in column order.
//! - Hold eager-loaded relations next to the attributes.
//!
//! # Invariants
//! - Column names are unique within one record; `set` replaces in place.
//! - Serialized form is one flat object: attributes first, then relations.

use crate::model::value::Value;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

/// Eager-loaded relation payload attached to a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    /// `has_one` / `belongs_to` relation; `None` when no row matched.
    One(Option<Box<Record>>),
    /// `has_many` relation in key order.
    Many(Vec<Record>),
}

impl Related {
    /// Returns the single related record, if this is a populated `One`.
    pub fn as_one(&self) -> Option<&Record> {
        match self {
            Self::One(record) => record.as_deref(),
            Self::Many(_) => None,
        }
    }

    /// Returns related records as a slice; `One` yields zero or one element.
    pub fn records(&self) -> &[Record] {
        match self {
            Self::One(Some(record)) => std::slice::from_ref(&**record),
            Self::One(None) => &[],
            Self::Many(records) => records.as_slice(),
        }
    }
}

/// Ordered column/value pairs of one row, or a write payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    attributes: Vec<(String, Value)>,
    relations: BTreeMap<String, Related>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `set`.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Sets one attribute, replacing an existing column in place.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.attributes.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        let index = self.attributes.iter().position(|(name, _)| name == column)?;
        Some(self.attributes.remove(index).1)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Copies every attribute of `other` over this record.
    pub fn merge(&mut self, other: &Record) {
        for (column, value) in other.iter() {
            self.set(column, value.clone());
        }
    }

    /// Keeps only attributes whose column passes `keep`.
    pub fn retain_columns(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.attributes.retain(|(name, _)| keep(name));
    }

    pub fn relation(&self, name: &str) -> Option<&Related> {
        self.relations.get(name)
    }

    pub fn set_relation(&mut self, name: impl Into<String>, related: Related) {
        self.relations.insert(name.into(), related);
    }

    pub fn relations(&self) -> &BTreeMap<String, Related> {
        &self.relations
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (column, value) in iter {
            record.set(column, value);
        }
        record
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Record
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.attributes.len() + self.relations.len()))?;
        for (column, value) in &self.attributes {
            map.serialize_entry(column, value)?;
        }
        for (name, related) in &self.relations {
            map.serialize_entry(name, related)?;
        }
        map.end()
    }
}

impl Serialize for Related {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::One(record) => record.as_deref().serialize(serializer),
            Self::Many(records) => records.serialize(serializer),
        }
    }
}
