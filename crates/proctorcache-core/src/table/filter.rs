//! Declarative field=value filtering.

use std::collections::BTreeMap;

use crate::models::{value_to_string, FieldPath, Record};

/// Value of the "All" option; selecting it deactivates a filter.
pub const ALL_OPTION: &str = "__all__";

/// A selectable filter over one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub key: FieldPath,
    pub label: String,
    pub options: Vec<String>,
}

impl FilterSpec {
    pub fn new(key: &str, label: &str, options: Vec<String>) -> Self {
        Self {
            key: FieldPath::parse(key),
            label: label.to_string(),
            options,
        }
    }

    /// Build a filter whose options are the distinct values of the field,
    /// in first-seen order. Records without a value contribute nothing.
    pub fn from_records<R: Record>(key: &str, label: &str, records: &[R]) -> Self {
        let path = FieldPath::parse(key);
        let mut options: Vec<String> = Vec::new();
        for record in records {
            if let Some(value) = value_to_string(record.get(&path).as_ref()) {
                if !options.contains(&value) {
                    options.push(value);
                }
            }
        }
        Self {
            key: path,
            label: label.to_string(),
            options,
        }
    }
}

/// Selected filter values keyed by field path. Absent keys are inactive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveFilters {
    values: BTreeMap<String, String>,
}

impl ActiveFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// The selected value for a key, if one is set and it is not "All".
    pub fn active_value(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| is_active_value(v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `"key: value"` labels for every selected filter.
    pub fn chips(&self) -> Vec<String> {
        self.iter().map(|(k, v)| format!("{}: {}", k, v)).collect()
    }
}

fn is_active_value(value: &str) -> bool {
    !value.is_empty() && value != ALL_OPTION
}

/// Keep the records that pass every active filter.
///
/// Only filters named in `specs` are consulted. A record passes an active
/// filter when the string form of its field equals the selected value;
/// records missing the field never pass.
pub fn apply<'a, R: Record>(
    records: impl IntoIterator<Item = &'a R>,
    specs: &[FilterSpec],
    active: &ActiveFilters,
) -> Vec<&'a R>
where
    R: 'a,
{
    let constraints: Vec<(&FieldPath, &str)> = specs
        .iter()
        .filter_map(|spec| active.active_value(spec.key.as_str()).map(|v| (&spec.key, v)))
        .collect();

    records
        .into_iter()
        .filter(|record| {
            constraints.iter().all(|(path, expected)| {
                value_to_string(record.get(path).as_ref()).as_deref() == Some(*expected)
            })
        })
        .collect()
}
