//! Template hole layout
//!
//! Holes are addressed by `(row, column)`. Rows are interleaved: even rows
//! are shifted by half a column pitch and hold one hole fewer than odd rows.

use crate::error::TemplateError;
use crate::template::registration::Registration;
use crate::template::{Point, Pose};

/// Hole address on the template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HoleIndex {
    pub row: i32,
    pub column: i32,
}

impl HoleIndex {
    pub const fn new(row: i32, column: i32) -> Self {
        HoleIndex { row, column }
    }
}

/// Physical layout of the template, in Z-frame local coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct GridSpec {
    /// Offset of hole (0, 0) from the Z-frame origin
    pub hole_offset: [f64; 3],
    /// Distance between neighbouring columns (negative: columns run towards -X)
    pub pitch_x: f64,
    /// Distance between neighbouring rows (negative: rows run towards -Y)
    pub pitch_y: f64,
    /// Number of rows
    pub rows: i32,
    /// Holes on an odd row; even rows hold one fewer
    pub columns: i32,
    /// Hole radius, descriptive only
    pub hole_radius: f64,
}

impl GridSpec {
    /// The production template
    pub const TEMPLATE: GridSpec = GridSpec {
        hole_offset: [40.0, 30.3, 30.0],
        pitch_x: -5.0,
        pitch_y: -4.33,
        rows: 19,
        columns: 17,
        hole_radius: 1.5,
    };

    /// Number of holes on `row`
    pub fn row_length(&self, row: i32) -> i32 {
        if row % 2 == 0 {
            self.columns - 1
        } else {
            self.columns
        }
    }

    /// Whether `(row, column)` addresses a drillable hole
    pub fn contains(&self, row: i32, column: i32) -> bool {
        (0..self.rows).contains(&row) && (0..self.row_length(row)).contains(&column)
    }

    /// All valid holes, rows ascending, columns ascending within a row
    pub fn holes(&self) -> impl Iterator<Item = HoleIndex> + '_ {
        (0..self.rows).flat_map(move |row| {
            (0..self.row_length(row)).map(move |column| HoleIndex::new(row, column))
        })
    }

    /// Total number of holes
    pub fn hole_count(&self) -> usize {
        (0..self.rows).map(|row| self.row_length(row) as usize).sum()
    }

    /// Hole position in Z-frame local coordinates
    pub fn local_position(&self, row: i32, column: i32) -> Result<Point, TemplateError> {
        if !self.contains(row, column) {
            return Err(TemplateError::HoleOutOfRange { row, column });
        }

        let shift = if row % 2 == 0 { self.pitch_x / 2.0 } else { 0.0 };
        let [x0, y0, z0] = self.hole_offset;

        Ok(Point::new(
            x0 + shift + column as f64 * self.pitch_x,
            y0 + row as f64 * self.pitch_y,
            z0,
        ))
    }

    /// Hole position in tracker coordinates
    ///
    /// # Errors
    ///
    /// - [`TemplateError::HoleOutOfRange`] - invalid `(row, column)`
    /// - [`TemplateError::NotRegistered`] - no calibration received yet
    pub fn hole_position(
        &self,
        registration: &Registration,
        row: i32,
        column: i32,
    ) -> Result<Point, TemplateError> {
        let local = self.local_position(row, column)?;
        registration.map_point(&local)
    }

    /// Hole pose in tracker coordinates
    ///
    /// Rotation is the registration's rotation; translation is the hole's
    /// tracker position.
    pub fn hole_transform(
        &self,
        registration: &Registration,
        row: i32,
        column: i32,
    ) -> Result<Pose, TemplateError> {
        let position = self.hole_position(registration, row, column)?;
        registration.pose_at(&position)
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        Self::TEMPLATE
    }
}
