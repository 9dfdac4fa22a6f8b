//! Targeting reports
//!
//! A successful snap is reported as an OK status whose text is the printed
//! hole label followed by the depth, e.g. `C,2,41.5`. Failures are reported
//! as a configuration error with no text.

use std::fmt;

use crate::error::TemplateError;
use crate::protocol::types::StatusMessage;
use crate::template::grid::HoleIndex;
use crate::template::targeting::SelectedHole;

/// Device name of targeting status messages and snapped poses
pub const TARGET_DEVICE: &str = "TARGET";

/// Hole label as printed on the template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoleLabel {
    pub row: char,
    pub column: i32,
}

impl HoleLabel {
    /// Printed label of a grid hole
    pub fn from_index(index: HoleIndex) -> Self {
        HoleLabel {
            row: row_letter(index.row),
            column: printed_column(index.row, index.column),
        }
    }
}

impl fmt::Display for HoleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.column)
    }
}

/// `'A'` for row 0, `'B'` for row 1, ...
pub fn row_letter(row: i32) -> char {
    u32::try_from(row)
        .ok()
        .and_then(|r| char::from_u32('A' as u32 + r))
        .unwrap_or('?')
}

/// Column number printed on the template
///
/// Even rows are shifted half a pitch, so their numbering is offset by one
/// past the centre column.
pub fn printed_column(row: i32, column: i32) -> i32 {
    if row % 2 == 0 && column > 7 {
        column - 7
    } else {
        column - 8
    }
}

/// Format `value` like C's `%g`: 6 significant digits, trailing zeros
/// removed, scientific notation outside `[1e-4, 1e6)`
pub fn format_depth(value: f64) -> String {
    const PRECISION: i32 = 6;

    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string().to_lowercase();
    }

    // Exponent after rounding to the target precision
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, value);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exponent < -4 || exponent >= PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.abs()
        )
    } else {
        let decimals = (PRECISION - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Status text for a snapped hole: `<row>,<column>,<depth>`
pub fn targeting_label(selected: &SelectedHole) -> String {
    format!(
        "{},{}",
        HoleLabel::from_index(selected.index),
        format_depth(selected.depth)
    )
}

/// Status message reporting a targeting result
pub fn targeting_status(result: &Result<SelectedHole, TemplateError>) -> StatusMessage {
    match result {
        Ok(selected) => StatusMessage::ok(&targeting_label(selected)),
        Err(_) => StatusMessage::config_error(),
    }
}
