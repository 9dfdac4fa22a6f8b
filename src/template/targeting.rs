//! Nearest-hole search
//!
//! The template has a few hundred holes, so every query scans all of them.

use nalgebra::distance;

use crate::error::TemplateError;
use crate::template::grid::{GridSpec, HoleIndex};
use crate::template::registration::Registration;
use crate::template::{Point, Pose};

/// Hole chosen for a target point
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedHole {
    /// Grid address of the hole
    pub index: HoleIndex,
    /// Distance from the hole entry to the requested target (mm)
    pub depth: f64,
    /// Hole pose in tracker coordinates
    pub pose: Pose,
}

impl SelectedHole {
    /// Hole entry position in tracker coordinates
    pub fn position(&self) -> Point {
        Point::new(self.pose[(0, 3)], self.pose[(1, 3)], self.pose[(2, 3)])
    }
}

/// Snap `target` to the nearest hole of `grid`
///
/// Holes are scanned row by row, columns ascending, and the best candidate
/// only changes on a strictly smaller distance, so ties go to the first
/// hole in that order.
///
/// # Errors
///
/// - [`TemplateError::NotRegistered`] - no calibration received yet
/// - [`TemplateError::HoleOutOfRange`] - the grid has no hole at all
pub fn find_nearest_hole(
    grid: &GridSpec,
    registration: &Registration,
    target: &Point,
) -> Result<SelectedHole, TemplateError> {
    let mut candidates = Vec::with_capacity(grid.hole_count());
    for hole in grid.holes() {
        candidates.push((hole, grid.hole_position(registration, hole.row, hole.column)?));
    }

    let (index, depth) =
        nearest(candidates, target).ok_or(TemplateError::HoleOutOfRange { row: 0, column: 0 })?;
    let pose = grid.hole_transform(registration, index.row, index.column)?;

    Ok(SelectedHole { index, depth, pose })
}

/// First candidate with the smallest distance to `target`
fn nearest<I>(candidates: I, target: &Point) -> Option<(HoleIndex, f64)>
where
    I: IntoIterator<Item = (HoleIndex, Point)>,
{
    let mut best: Option<(HoleIndex, f64)> = None;

    for (index, position) in candidates {
        let d = distance(&position, target);
        // NaN never compares smaller, so the first candidate is kept
        if best.map_or(true, |(_, best_d)| d < best_d) {
            best = Some((index, d));
        }
    }

    best
}
