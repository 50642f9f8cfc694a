//! Turns raw sheet values into the text shown in a cell.

use serde_json::Value;

use crate::columns::{self, RANK, RANK_PREV, TOTAL_POINT};
use crate::value::{number_to_string, round_half_up, to_display_string, to_fixed, to_number};

// Event points closer to zero than this are shown as an empty cell.
const ZERO_TOLERANCE: f64 = 1e-9;
const POINT_DECIMALS: usize = 2;

/// How the values of one column are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellRule {
    /// Whole numbers.
    Rank,
    /// Two decimals.
    TotalPoint,
    /// Two decimals, zero is left blank.
    EventPoints,
    /// The value as is.
    Text,
}

impl CellRule {
    pub fn for_column(column: &str) -> Self {
        // Exact names here, only the event check tolerates padding.
        if column == RANK || column == RANK_PREV {
            CellRule::Rank
        } else if column == TOTAL_POINT {
            CellRule::TotalPoint
        } else if columns::is_event(column) {
            CellRule::EventPoints
        } else {
            CellRule::Text
        }
    }

    pub fn apply(self, raw: Option<&Value>) -> String {
        let raw = match raw {
            None | Some(Value::Null) => return String::new(),
            Some(Value::String(s)) if s.is_empty() => return String::new(),
            Some(v) => v,
        };

        match self {
            CellRule::Rank => {
                let num = to_number(Some(raw));
                if num.is_finite() {
                    number_to_string(round_half_up(num))
                } else {
                    to_display_string(raw)
                }
            }
            CellRule::TotalPoint => {
                let num = to_number(Some(raw));
                if num.is_finite() {
                    to_fixed(num, POINT_DECIMALS)
                } else {
                    to_display_string(raw)
                }
            }
            CellRule::EventPoints => {
                let num = to_number(Some(raw));
                if !num.is_finite() {
                    to_display_string(raw)
                } else if num.abs() < ZERO_TOLERANCE {
                    String::new()
                } else {
                    to_fixed(num, POINT_DECIMALS)
                }
            }
            CellRule::Text => to_display_string(raw),
        }
    }
}

/// Display text of `raw` in the column named `column`.
pub fn format_cell(column: &str, raw: Option<&Value>) -> String {
    CellRule::for_column(column).apply(raw)
}
