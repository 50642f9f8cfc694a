//! Column classification.
//!
//! A ranking sheet has a handful of attribute columns with well known names,
//! every other column holds the points a competitor scored in one event.

use crate::value::trim;

pub const RANK: &str = "Rank";
pub const RANK_PREV: &str = "Rank (Prev)";
pub const TOTAL_POINT: &str = "Total Point";

/// Attribute columns. Anything else with a non blank name is an event.
pub const FIXED_COLUMNS: [&str; 8] = [
    RANK,
    RANK_PREV,
    "Code",
    "Name",
    "Birth Year",
    "Team",
    "Age",
    TOTAL_POINT,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Fixed,
    Event,
    // Header cell is empty or only whitespace.
    Blank,
}

impl ColumnKind {
    pub fn of(name: &str) -> Self {
        let name = trim(name);
        if name.is_empty() {
            ColumnKind::Blank
        } else if FIXED_COLUMNS.contains(&name) {
            ColumnKind::Fixed
        } else {
            ColumnKind::Event
        }
    }
}

/// True if `name` is an event column. Missing and blank names are not.
pub fn is_event_column(name: Option<&str>) -> bool {
    name.is_some_and(is_event)
}

pub fn is_event(name: &str) -> bool {
    ColumnKind::of(name) == ColumnKind::Event
}

/// Event columns in sheet order.
pub fn event_columns(columns: &[String]) -> Vec<String> {
    columns.iter().filter(|c| is_event(c)).cloned().collect()
}

/// Column order of a record with keys `keys` (in file order).
///
/// Sheets were authored against browser `Object.keys` order: keys that are
/// array indices (`"0"`, `"2567"`, no leading zeros, below 2^32 - 1) come
/// first in ascending numeric order, all other keys follow in file order.
pub fn column_order<'a>(keys: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut indices: Vec<(u32, String)> = Vec::new();
    let mut names: Vec<String> = Vec::new();
    for key in keys {
        match array_index(key) {
            Some(idx) => indices.push((idx, key.clone())),
            None => names.push(key.clone()),
        }
    }
    indices.sort_by_key(|(idx, _)| *idx);
    indices.into_iter().map(|(_, key)| key).chain(names).collect()
}

fn array_index(key: &str) -> Option<u32> {
    let idx: u32 = key.parse().ok()?;
    (idx != u32::MAX && idx.to_string() == key).then_some(idx)
}
