//! Needle-guidance template core
//!
//! The template is a perforated plate rigidly attached to a tracked Z-frame.
//! Once the Z-frame registration is known, every hole has a pose in tracker
//! coordinates and any requested target can be snapped to the nearest hole.
//!
//! - [`grid`] - hole layout and hole poses
//! - [`registration`] - the Z-frame registration transform
//! - [`targeting`] - nearest-hole search
//! - [`workflow`] - phase statuses gating the operations above
//! - [`device`] - device-name convention (`CMD_0001`, `ACK_0001`, ...)
//! - [`report`] - hole labels and targeting status messages
//! - [`zframe`] - fiducial geometry sent at startup
//! - [`dispatcher`] - message handling tying everything to the link

use nalgebra::{Matrix4, Point3};

pub mod device;
pub mod dispatcher;
pub mod grid;
pub mod registration;
pub mod report;
pub mod targeting;
pub mod workflow;
pub mod zframe;

pub use device::{Category, DeviceId};
pub use dispatcher::{serve, Dispatcher};
pub use grid::{GridSpec, HoleIndex};
pub use registration::Registration;
pub use targeting::{find_nearest_hole, SelectedHole};
pub use workflow::{Command, PhaseStatus, Workflow};

/// 4x4 homogeneous pose in tracker coordinates (millimetres)
pub type Pose = Matrix4<f64>;

/// 3D point in millimetres
pub type Point = Point3<f64>;
