//! Z-frame registration
//!
//! Maps template-local coordinates into tracker coordinates. The transform
//! is stored verbatim; no orthonormality check is performed.

use tracing::debug;

use crate::error::TemplateError;
use crate::template::{Point, Pose};

/// Registration of the Z-frame in tracker coordinates
///
/// Empty until the first calibration pose arrives. Every read before that
/// fails with [`TemplateError::NotRegistered`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registration {
    transform: Option<Pose>,
}

impl Registration {
    /// Empty registration
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `transform`, replacing any previous registration
    pub fn set(&mut self, transform: Pose) {
        debug!(transform = ?transform, "Registration updated");
        self.transform = Some(transform);
    }

    /// Whether a calibration has been received
    pub fn is_set(&self) -> bool {
        self.transform.is_some()
    }

    /// Current transform
    pub fn transform(&self) -> Result<&Pose, TemplateError> {
        self.transform.as_ref().ok_or(TemplateError::NotRegistered)
    }

    /// Apply the registration to a local point
    ///
    /// Rows 0..3 of the transform times `[x, y, z, 1]`; no homogeneous
    /// division.
    pub fn map_point(&self, local: &Point) -> Result<Point, TemplateError> {
        let m = self.transform()?;
        let h = m * local.to_homogeneous();
        Ok(Point::new(h.x, h.y, h.z))
    }

    /// Pose with the registration's rotation block and `position` as
    /// translation
    ///
    /// This is a point substitution, not a pose composition.
    pub fn pose_at(&self, position: &Point) -> Result<Pose, TemplateError> {
        let mut pose = *self.transform()?;
        pose.fixed_view_mut::<3, 1>(0, 3).copy_from(&position.coords);
        Ok(pose)
    }
}
