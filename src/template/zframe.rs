//! Z-frame fiducial geometry
//!
//! Sent once after `START_UP` so the console can reconstruct the frame: seven
//! rods on a cube of half-extent 30 mm, chained into a single path.

use crate::protocol::types::{TrajectoryElement, TrajectoryMessage};

/// Device name of the geometry message
pub const ZFRAME_DEVICE: &str = "ZFrameConfig";

/// Half the cube edge length (mm)
pub const HALF_EXTENT: f32 = 30.0;

const H: f32 = HALF_EXTENT;

/// Entry→target endpoints of the seven fiducial rods
pub const ZFRAME_SEGMENTS: [([f32; 3], [f32; 3]); 7] = [
    ([H, -H, -H], [H, -H, H]),
    ([H, -H, H], [H, H, -H]),
    ([H, H, -H], [H, H, H]),
    ([H, H, H], [-H, H, -H]),
    ([-H, H, -H], [-H, H, H]),
    ([-H, H, H], [-H, -H, -H]),
    ([-H, -H, -H], [-H, -H, H]),
];

/// TRAJ message describing the frame
///
/// Elements carry only their type and endpoints. Name, group and owner stay
/// empty and the color is all zero.
pub fn zframe_configuration() -> TrajectoryMessage {
    let trajectories = ZFRAME_SEGMENTS
        .iter()
        .map(|&(entry, target)| TrajectoryElement {
            rgba: [0; 4],
            ..TrajectoryElement::new("", "", entry, target)
        })
        .collect();
    TrajectoryMessage::new(trajectories)
}
