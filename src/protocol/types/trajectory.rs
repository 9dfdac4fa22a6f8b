//! TRAJECTORY message type
//!
//! Used once per session to describe the fiducial frame geometry as a set of
//! entry→target line segments.

use crate::error::{IgtlError, Result};
use crate::protocol::message::Message;
use bytes::{Buf, BufMut};

/// Encoded size of one trajectory element
const ELEMENT_SIZE: usize = 150;

/// Trajectory type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TrajectoryType {
    /// Only the entry point is meaningful
    EntryOnly = 1,
    /// Only the target point is meaningful
    TargetOnly = 2,
    /// Both entry and target points are meaningful
    EntryAndTarget = 3,
}

impl TrajectoryType {
    fn from_u8(value: u8) -> Result<Self> {
        match value {
            1 => Ok(TrajectoryType::EntryOnly),
            2 => Ok(TrajectoryType::TargetOnly),
            3 => Ok(TrajectoryType::EntryAndTarget),
            _ => Err(IgtlError::InvalidHeader(format!(
                "Invalid trajectory type: {}",
                value
            ))),
        }
    }
}

/// One trajectory element
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryElement {
    /// Name (max 63 bytes on the wire)
    pub name: String,
    /// Group name (max 31 bytes on the wire)
    pub group_name: String,
    /// Which endpoints are meaningful
    pub trajectory_type: TrajectoryType,
    /// Display color
    pub rgba: [u8; 4],
    /// Entry point in millimetres
    pub entry_point: [f32; 3],
    /// Target point in millimetres
    pub target_point: [f32; 3],
    /// Diameter in millimetres
    pub diameter: f32,
    /// Owner image id (max 19 bytes on the wire)
    pub owner_image: String,
}

impl TrajectoryElement {
    /// Entry→target segment
    pub fn new(
        name: impl Into<String>,
        group_name: impl Into<String>,
        entry_point: [f32; 3],
        target_point: [f32; 3],
    ) -> Self {
        TrajectoryElement {
            name: name.into(),
            group_name: group_name.into(),
            trajectory_type: TrajectoryType::EntryAndTarget,
            rgba: [255, 255, 255, 255],
            entry_point,
            target_point,
            diameter: 0.0,
            owner_image: String::new(),
        }
    }
}

/// TRAJECTORY message (type name `"TRAJ"`)
///
/// Element layout: NAME char[64], GROUP char[32], TYPE u8, reserved u8,
/// RGBA u8[4], entry f32[3], target f32[3], DIAMETER f32, OWNER char[20].
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryMessage {
    /// Elements in send order
    pub trajectories: Vec<TrajectoryElement>,
}

impl TrajectoryMessage {
    /// Message holding `trajectories`
    pub fn new(trajectories: Vec<TrajectoryElement>) -> Self {
        TrajectoryMessage { trajectories }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    /// True when there are no elements
    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }
}

fn put_fixed_str(buf: &mut Vec<u8>, value: &str, width: usize) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(width - 1);
    buf.extend_from_slice(&bytes[..len]);
    buf.resize(buf.len() + width - len, 0);
}

fn get_fixed_str(data: &mut &[u8], width: usize) -> Result<String> {
    let field = &data[..width];
    let len = field.iter().position(|&b| b == 0).unwrap_or(width);
    let value = String::from_utf8(field[..len].to_vec())?;
    data.advance(width);
    Ok(value)
}

impl Message for TrajectoryMessage {
    fn message_type() -> &'static str {
        "TRAJ"
    }

    fn encode_content(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.trajectories.len() * ELEMENT_SIZE);

        for traj in &self.trajectories {
            put_fixed_str(&mut buf, &traj.name, 64);
            put_fixed_str(&mut buf, &traj.group_name, 32);
            buf.put_u8(traj.trajectory_type as u8);
            buf.put_u8(0);
            buf.extend_from_slice(&traj.rgba);
            for &coord in traj.entry_point.iter().chain(traj.target_point.iter()) {
                buf.put_f32(coord);
            }
            buf.put_f32(traj.diameter);
            put_fixed_str(&mut buf, &traj.owner_image, 20);
        }

        Ok(buf)
    }

    fn decode_content(mut data: &[u8]) -> Result<Self> {
        if data.len() % ELEMENT_SIZE != 0 {
            return Err(IgtlError::InvalidSize {
                expected: (data.len() / ELEMENT_SIZE + 1) * ELEMENT_SIZE,
                actual: data.len(),
            });
        }

        let mut trajectories = Vec::with_capacity(data.len() / ELEMENT_SIZE);

        while !data.is_empty() {
            let name = get_fixed_str(&mut data, 64)?;
            let group_name = get_fixed_str(&mut data, 32)?;
            let trajectory_type = TrajectoryType::from_u8(data.get_u8())?;
            let _reserved = data.get_u8();
            let rgba = [data.get_u8(), data.get_u8(), data.get_u8(), data.get_u8()];
            let entry_point = [data.get_f32(), data.get_f32(), data.get_f32()];
            let target_point = [data.get_f32(), data.get_f32(), data.get_f32()];
            let diameter = data.get_f32();
            let owner_image = get_fixed_str(&mut data, 20)?;

            trajectories.push(TrajectoryElement {
                name,
                group_name,
                trajectory_type,
                rgba,
                entry_point,
                target_point,
                diameter,
                owner_image,
            });
        }

        Ok(TrajectoryMessage { trajectories })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_size() {
        let msg = TrajectoryMessage::new(vec![TrajectoryElement::new(
            "Line0",
            "ZFrame",
            [30.0, -30.0, -30.0],
            [30.0, -30.0, 30.0],
        )]);
        let encoded = msg.encode_content().unwrap();
        assert_eq!(encoded.len(), ELEMENT_SIZE);
        assert_eq!(encoded[96], TrajectoryType::EntryAndTarget as u8);
        assert_eq!(&encoded[102..106], &30.0f32.to_be_bytes());
    }

    #[test]
    fn test_decode_preserves_points() {
        let original = TrajectoryMessage::new(vec![
            TrajectoryElement::new("Line0", "ZFrame", [30.0, -30.0, -30.0], [30.0, -30.0, 30.0]),
            TrajectoryElement::new("Line1", "ZFrame", [30.0, -30.0, 30.0], [30.0, 30.0, -30.0]),
        ]);
        let decoded =
            TrajectoryMessage::decode_content(&original.encode_content().unwrap()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_long_name_truncated() {
        let msg = TrajectoryMessage::new(vec![TrajectoryElement::new(
            "N".repeat(80),
            "G",
            [0.0; 3],
            [0.0; 3],
        )]);
        let decoded = TrajectoryMessage::decode_content(&msg.encode_content().unwrap()).unwrap();
        assert_eq!(decoded.trajectories[0].name.len(), 63);
    }

    #[test]
    fn test_decode_invalid_size() {
        assert!(TrajectoryMessage::decode_content(&[0u8; 149]).is_err());
    }
}
