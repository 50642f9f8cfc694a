//! Row selection: free text search over the whole row plus an optional
//! "scored in this event" filter.

use rayon::prelude::*;

use crate::columns;
use crate::dataset::Record;
use crate::value::{normalize_str, to_cell_string, to_number};

/// What the user asked to see. Every change is applied to the full sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub search: String,
    pub event_column: Option<String>,
    pub only_positive: bool,
}

impl FilterState {
    /// The selected event column, if a non empty one is selected.
    pub fn event_column(&self) -> Option<&str> {
        self.event_column.as_deref().filter(|c| !c.is_empty())
    }

    /// Keep the event selection only if the new sheet still has that column.
    pub fn retain_event_column(&mut self, columns: &[String]) {
        if let Some(selected) = self.event_column.take()
            && columns::event_columns(columns).contains(&selected)
        {
            self.event_column = Some(selected);
        }
    }
}

/// Decides whether one record passes a [`FilterState`].
pub struct RowPredicate<'a> {
    columns: &'a [String],
    needle: String,
    event_column: Option<&'a str>,
    only_positive: bool,
}

impl<'a> RowPredicate<'a> {
    pub fn new(columns: &'a [String], state: &'a FilterState) -> Self {
        Self {
            columns,
            needle: normalize_str(&state.search),
            event_column: state.event_column(),
            only_positive: state.only_positive,
        }
    }

    /// True if the predicate lets every record through.
    pub fn is_noop(&self) -> bool {
        self.needle.is_empty() && !(self.event_column.is_some() && self.only_positive)
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.matches_search(record) && self.matches_event(record)
    }

    fn matches_search(&self, record: &Record) -> bool {
        if self.needle.is_empty() {
            return true;
        }
        let haystack = self
            .columns
            .iter()
            .map(|c| to_cell_string(record.get(c)))
            .collect::<Vec<String>>()
            .join(" ");
        normalize_str(&haystack).contains(&self.needle)
    }

    fn matches_event(&self, record: &Record) -> bool {
        match self.event_column {
            // Selecting an event without "only positive" keeps every row.
            Some(column) if self.only_positive => to_number(record.get(column)) > 0.0,
            _ => true,
        }
    }
}

/// Indices of the records that pass, in sheet order.
pub fn matching_rows(records: &[Record], columns: &[String], state: &FilterState) -> Vec<usize> {
    let predicate = RowPredicate::new(columns, state);
    if predicate.is_noop() {
        return (0..records.len()).collect();
    }
    records
        .par_iter()
        .enumerate()
        .filter(|(_, record)| predicate.matches(record))
        .map(|(idx, _)| idx)
        .collect()
}

/// The records that pass, in sheet order. The input is left untouched.
pub fn filter_rows<'r>(
    records: &'r [Record],
    columns: &[String],
    state: &FilterState,
) -> Vec<&'r Record> {
    matching_rows(records, columns, state)
        .into_iter()
        .map(|idx| &records[idx])
        .collect()
}
