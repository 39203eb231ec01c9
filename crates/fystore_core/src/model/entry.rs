//! Entry model for value-set collections.
//!
//! # Responsibility
//! - Define one persisted member of a typed value-set (`Entry`).
//! - Define the insertion-ordered `ValueSet` mapping exchanged with callers.
//!
//! # Invariants
//! - The active entries of one (partition, entry type) pair form the
//!   current value-set for that type, and are only replaced as a whole.
//! - Entry types form an open set; no category is hard-wired in storage.

use crate::model::record::{RecordId, Version};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt::Formatter;

/// Entry type tag used by the location relationship collection.
pub const LOCATION_RELATIONSHIP_TYPE: &str = "locationRelationship";

/// One stored member of a value-set generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: RecordId,
    pub partition_key: String,
    pub entry_type: String,
    pub value: Value,
    pub version: Version,
    pub active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Mapping of entry type to its ordered values.
///
/// Both the order of types (first insertion) and the order of values
/// within a type are preserved, including through JSON round trips.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueSet {
    groups: Vec<(String, Vec<Value>)>,
}

impl ValueSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from `(type, values)` pairs. Repeated types are merged.
    pub fn from_groups<T, I>(groups: I) -> Self
    where
        T: Into<String>,
        I: IntoIterator<Item = (T, Vec<Value>)>,
    {
        let mut set = Self::new();
        for (entry_type, values) in groups {
            let entry_type = entry_type.into();
            for value in values {
                set.push(entry_type.as_str(), value);
            }
            set.ensure_group(entry_type.as_str());
        }
        set
    }

    /// Convenience constructor for string-only categories.
    pub fn from_strings(groups: &[(&str, &[&str])]) -> Self {
        Self::from_groups(groups.iter().map(|(entry_type, values)| {
            (
                *entry_type,
                values
                    .iter()
                    .map(|value| Value::String((*value).to_string()))
                    .collect::<Vec<_>>(),
            )
        }))
    }

    /// Appends one value to `entry_type`, creating the group on first use.
    pub fn push(&mut self, entry_type: &str, value: Value) {
        match self.groups.iter_mut().find(|(kind, _)| kind == entry_type) {
            Some((_, values)) => values.push(value),
            None => self.groups.push((entry_type.to_string(), vec![value])),
        }
    }

    /// Replaces all values of `entry_type`.
    pub fn insert(&mut self, entry_type: impl Into<String>, values: Vec<Value>) {
        let entry_type = entry_type.into();
        match self.groups.iter_mut().find(|(kind, _)| *kind == entry_type) {
            Some((_, existing)) => *existing = values,
            None => self.groups.push((entry_type, values)),
        }
    }

    pub fn get(&self, entry_type: &str) -> Option<&[Value]> {
        self.groups
            .iter()
            .find(|(kind, _)| kind == entry_type)
            .map(|(_, values)| values.as_slice())
    }

    /// Values of `entry_type` that are JSON strings, in order.
    pub fn strings(&self, entry_type: &str) -> Vec<&str> {
        self.get(entry_type)
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_str)
            .collect()
    }

    pub fn entry_types(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(kind, _)| kind.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.groups
            .iter()
            .map(|(kind, values)| (kind.as_str(), values.as_slice()))
    }

    /// Number of `(type, value)` pairs, i.e. rows one save inserts.
    pub fn value_count(&self) -> usize {
        self.groups.iter().map(|(_, values)| values.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn ensure_group(&mut self, entry_type: &str) {
        if self.get(entry_type).is_none() {
            self.groups.push((entry_type.to_string(), Vec::new()));
        }
    }
}

impl Serialize for ValueSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for (entry_type, values) in &self.groups {
            map.serialize_entry(entry_type, values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ValueSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ValueSetVisitor)
    }
}

struct ValueSetVisitor;

impl<'de> Visitor<'de> for ValueSetVisitor {
    type Value = ValueSet;

    fn expecting(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("a map of entry type to a list of values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut set = ValueSet::new();
        while let Some((entry_type, values)) = access.next_entry::<String, Vec<Value>>()? {
            set.insert(entry_type, values);
        }
        Ok(set)
    }
}

/// Location to location-code pair stored in the relationship collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRelationship {
    pub location: String,
    pub location_code: String,
}

impl LocationRelationship {
    pub fn new(location: impl Into<String>, location_code: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            location_code: location_code.into(),
        }
    }

    /// Entry value stored under `LOCATION_RELATIONSHIP_TYPE`.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "location": self.location,
            "locationCode": self.location_code,
        })
    }

    /// Parses a stored entry value; `None` for any other shape.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}
