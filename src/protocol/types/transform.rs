//! TRANSFORM message type
//!
//! Carries a 4x4 homogeneous transform. Only the upper 3x4 block travels on
//! the wire (12 big-endian floats, column-major); the last row is implied.

use crate::error::{IgtlError, Result};
use crate::protocol::message::Message;
use bytes::{Buf, BufMut};
use nalgebra::Matrix4;

const BODY_SIZE: usize = 48;

/// TRANSFORM message containing a 4x4 homogeneous transformation matrix
///
/// Upper-left 3x3 is the rotation, upper-right 3x1 the translation in
/// millimetres.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformMessage {
    /// Row-major 4x4 matrix
    pub matrix: [[f32; 4]; 4],
}

impl TransformMessage {
    /// Identity transform
    pub fn identity() -> Self {
        TransformMessage {
            matrix: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Pure translation
    pub fn translation(x: f32, y: f32, z: f32) -> Self {
        let mut msg = Self::identity();
        msg.matrix[0][3] = x;
        msg.matrix[1][3] = y;
        msg.matrix[2][3] = z;
        msg
    }

    /// Widen to a double-precision matrix
    pub fn to_matrix4(&self) -> Matrix4<f64> {
        Matrix4::from_fn(|r, c| self.matrix[r][c] as f64)
    }

    /// Narrow a double-precision matrix to the wire representation
    pub fn from_matrix4(m: &Matrix4<f64>) -> Self {
        let mut matrix = [[0.0f32; 4]; 4];
        for (r, row) in matrix.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = m[(r, c)] as f32;
            }
        }
        TransformMessage { matrix }
    }
}

impl Message for TransformMessage {
    fn message_type() -> &'static str {
        "TRANSFORM"
    }

    fn encode_content(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(BODY_SIZE);

        // R11, R21, R31, R12, R22, R32, R13, R23, R33, TX, TY, TZ
        for col in 0..4 {
            for row in 0..3 {
                buf.put_f32(self.matrix[row][col]);
            }
        }

        Ok(buf)
    }

    fn decode_content(data: &[u8]) -> Result<Self> {
        if data.len() != BODY_SIZE {
            return Err(IgtlError::InvalidSize {
                expected: BODY_SIZE,
                actual: data.len(),
            });
        }

        let mut cursor = data;
        let mut matrix = [[0.0f32; 4]; 4];

        for col in 0..4 {
            for row in matrix.iter_mut().take(3) {
                row[col] = cursor.get_f32();
            }
        }
        matrix[3] = [0.0, 0.0, 0.0, 1.0];

        Ok(TransformMessage { matrix })
    }
}
