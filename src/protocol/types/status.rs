//! STATUS message type
//!
//! The server reports every targeting result with a STATUS message: code OK
//! plus a `row,column,depth` label, or a configuration error without label.

use crate::error::{IgtlError, Result};
use crate::protocol::message::Message;
use bytes::{Buf, BufMut};

/// Minimum body: code (2) + subcode (8) + error name (20) + terminator (1)
const MIN_BODY_SIZE: usize = 31;

/// Status codes defined by OpenIGTLink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum StatusCode {
    Invalid = 0,
    Ok = 1,
    UnknownError = 2,
    Panic = 3,
    NotFound = 4,
    AccessDenied = 5,
    Busy = 6,
    TimeOut = 7,
    Overflow = 8,
    ChecksumError = 9,
    ConfigError = 10,
    ResourceError = 11,
    UnknownInstruction = 12,
    NotReady = 13,
    ManualMode = 14,
    Disabled = 15,
    NotPresent = 16,
    UnknownVersion = 17,
    HardwareFailure = 18,
    ShuttingDown = 19,
}

/// STATUS message
///
/// Body: code (u16), subcode (i64), error name (char[20]), NUL-terminated
/// status string.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    /// Status code, see [`StatusCode`]
    pub code: u16,
    /// Device-specific subcode
    pub subcode: i64,
    /// Error name (max 20 bytes)
    pub error_name: String,
    /// Free-form status text
    pub status_string: String,
}

impl StatusMessage {
    /// Status with the given code and text
    pub fn with_code(code: StatusCode, status_string: &str) -> Self {
        StatusMessage {
            code: code as u16,
            subcode: 0,
            error_name: String::new(),
            status_string: status_string.to_string(),
        }
    }

    /// OK status carrying `status_string`
    pub fn ok(status_string: &str) -> Self {
        Self::with_code(StatusCode::Ok, status_string)
    }

    /// Configuration error without any text
    pub fn config_error() -> Self {
        Self::with_code(StatusCode::ConfigError, "")
    }

    /// True when the code is [`StatusCode::Ok`]
    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok as u16
    }
}

impl Message for StatusMessage {
    fn message_type() -> &'static str {
        "STATUS"
    }

    fn encode_content(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(MIN_BODY_SIZE + self.status_string.len());

        buf.put_u16(self.code);
        buf.put_i64(self.subcode);

        let mut name_bytes = [0u8; 20];
        let name_len = self.error_name.len().min(20);
        name_bytes[..name_len].copy_from_slice(&self.error_name.as_bytes()[..name_len]);
        buf.extend_from_slice(&name_bytes);

        buf.extend_from_slice(self.status_string.as_bytes());
        buf.put_u8(0);

        Ok(buf)
    }

    fn decode_content(data: &[u8]) -> Result<Self> {
        if data.len() < MIN_BODY_SIZE {
            return Err(IgtlError::InvalidSize {
                expected: MIN_BODY_SIZE,
                actual: data.len(),
            });
        }

        let mut cursor = data;
        let code = cursor.get_u16();
        let subcode = cursor.get_i64();

        let mut name_bytes = [0u8; 20];
        cursor.copy_to_slice(&mut name_bytes);
        let error_name = String::from_utf8_lossy(&name_bytes)
            .trim_end_matches('\0')
            .to_string();

        let status_bytes: Vec<u8> = cursor.iter().take_while(|&&b| b != 0).copied().collect();
        let status_string = String::from_utf8(status_bytes)?;

        Ok(StatusMessage {
            code,
            subcode,
            error_name,
            status_string,
        })
    }
}
