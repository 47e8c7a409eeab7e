//! Single-key stable sorting with type-aware comparison.

use std::cmp::Ordering;

use serde_json::Value;

use crate::models::{FieldPath, Record};
use crate::utils::cmp_locale;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn flipped(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            SortOrder::Asc => "↑",
            SortOrder::Desc => "↓",
        }
    }
}

/// The active sort. `key == None` keeps the input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortState {
    pub key: Option<FieldPath>,
    pub order: SortOrder,
}

impl SortState {
    pub fn by(key: &str, order: SortOrder) -> Self {
        Self {
            key: Some(FieldPath::parse(key)),
            order,
        }
    }

    /// Toggle sort column - if already sorting by this column, flip direction;
    /// otherwise switch to this column ascending.
    pub fn toggle(&mut self, key: &FieldPath) {
        if self.key.as_ref() == Some(key) {
            self.order = self.order.flipped();
        } else {
            self.key = Some(key.clone());
            self.order = SortOrder::Asc;
        }
    }

    pub fn clear(&mut self) {
        self.key = None;
        self.order = SortOrder::Asc;
    }
}

/// Order of value kinds when two values are not directly comparable.
/// Missing values and null sort lowest.
fn kind_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// Compare two field values: strings with locale-style collation, numbers
/// numerically, booleans false before true, anything else by kind.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => cmp_locale(x, y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

/// Stable sort by the active key. Descending flips the comparator rather
/// than reversing the output, so equal values keep their input order.
pub fn apply<'a, R: Record>(records: Vec<&'a R>, state: &SortState) -> Vec<&'a R> {
    let Some(key) = state.key.as_ref() else {
        return records;
    };

    // Resolve each row's value once instead of on every comparison
    let mut keyed: Vec<(Option<Value>, &'a R)> =
        records.into_iter().map(|r| (r.get(key), r)).collect();

    keyed.sort_by(|(a, _), (b, _)| {
        let cmp = compare_values(a.as_ref(), b.as_ref());
        match state.order {
            SortOrder::Asc => cmp,
            SortOrder::Desc => cmp.reverse(),
        }
    });

    keyed.into_iter().map(|(_, r)| r).collect()
}
