//! STRING message type
//!
//! Text commands from the navigation console (`START_UP`, `CALIBRATION`,
//! `TARGETING`) arrive as STRING messages and are echoed back unchanged.

use crate::error::{IgtlError, Result};
use crate::protocol::message::Message;
use bytes::{Buf, BufMut};

/// MIBenum for US-ASCII
pub const ENCODING_US_ASCII: u16 = 3;

/// STRING message: ENCODING (u16) + LENGTH (u16) + bytes
#[derive(Debug, Clone, PartialEq)]
pub struct StringMessage {
    /// Character encoding as an IANA MIBenum value
    pub encoding: u16,
    /// Text content
    pub string: String,
}

impl StringMessage {
    /// US-ASCII string message
    pub fn new(string: impl Into<String>) -> Self {
        StringMessage {
            encoding: ENCODING_US_ASCII,
            string: string.into(),
        }
    }

    /// Text content
    pub fn as_str(&self) -> &str {
        &self.string
    }
}

impl Message for StringMessage {
    fn message_type() -> &'static str {
        "STRING"
    }

    fn encode_content(&self) -> Result<Vec<u8>> {
        let bytes = self.string.as_bytes();
        if bytes.len() > u16::MAX as usize {
            return Err(IgtlError::BodyTooLarge {
                size: bytes.len(),
                max: u16::MAX as usize,
            });
        }

        let mut buf = Vec::with_capacity(4 + bytes.len());
        buf.put_u16(self.encoding);
        buf.put_u16(bytes.len() as u16);
        buf.extend_from_slice(bytes);
        Ok(buf)
    }

    fn decode_content(mut data: &[u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(IgtlError::InvalidSize {
                expected: 4,
                actual: data.len(),
            });
        }

        let encoding = data.get_u16();
        let length = data.get_u16() as usize;

        if data.len() < length {
            return Err(IgtlError::InvalidSize {
                expected: length,
                actual: data.len(),
            });
        }

        let string = String::from_utf8(data[..length].to_vec())?;
        Ok(StringMessage { encoding, string })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let encoded = StringMessage::new("TARGETING").encode_content().unwrap();
        assert_eq!(encoded[0..2], [0, 3]);
        assert_eq!(encoded[2..4], [0, 9]);
        assert_eq!(&encoded[4..], b"TARGETING");
    }

    #[test]
    fn test_encoding_preserved() {
        let original = StringMessage {
            encoding: 106,
            string: "START_UP".to_string(),
        };
        let decoded = StringMessage::decode_content(&original.encode_content().unwrap()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_decode_truncated() {
        let mut data = vec![0, 3, 0, 10];
        data.extend_from_slice(b"Short");
        assert!(StringMessage::decode_content(&data).is_err());
        assert!(StringMessage::decode_content(&[0, 3]).is_err());
    }

    #[test]
    fn test_too_long() {
        let msg = StringMessage::new("A".repeat(65536));
        assert!(matches!(
            msg.encode_content(),
            Err(IgtlError::BodyTooLarge { .. })
        ));
    }
}
