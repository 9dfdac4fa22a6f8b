//! OpenIGTLink message trait and framed message wrapper

use crate::error::{IgtlError, Result};
use crate::protocol::crc::calculate_crc;
use crate::protocol::header::{DeviceName, Header, Timestamp, TypeName};

/// Size of the v3 extended header that precedes content when `version >= 2`
const EXTENDED_HEADER_MIN: usize = 12;

/// Common interface of every message body type
pub trait Message: Sized {
    /// Type name carried in the header (e.g. `"TRANSFORM"`)
    fn message_type() -> &'static str;

    /// Encode the content (body without extended header)
    fn encode_content(&self) -> Result<Vec<u8>>;

    /// Decode the content (body without extended header)
    fn decode_content(data: &[u8]) -> Result<Self>;
}

/// A complete message: header plus typed content
#[derive(Debug, Clone)]
pub struct IgtlMessage<T: Message> {
    /// Message header
    pub header: Header,
    /// Message content
    pub content: T,
}

impl<T: Message> IgtlMessage<T> {
    /// Wrap `content` for sending under `device_name` (max 20 bytes)
    pub fn new(content: T, device_name: &str) -> Result<Self> {
        let header = Header {
            version: Header::VERSION,
            type_name: TypeName::new(T::message_type())?,
            device_name: DeviceName::new(device_name)?,
            timestamp: Timestamp::now(),
            body_size: 0,
            crc: 0,
        };

        Ok(IgtlMessage { header, content })
    }

    /// Device name as a string
    pub fn device_name(&self) -> Result<&str> {
        self.header.device_name.as_str()
    }

    /// Encode header and body, filling in body size and CRC
    pub fn encode(&self) -> Result<Vec<u8>> {
        let body = self.content.encode_content()?;

        let mut header = self.header.clone();
        header.version = Header::VERSION;
        header.body_size = body.len() as u64;
        header.crc = calculate_crc(&body);

        let mut buf = Vec::with_capacity(Header::SIZE + body.len());
        buf.extend_from_slice(&header.encode());
        buf.extend_from_slice(&body);
        Ok(buf)
    }

    /// Decode a body that has already been read after `header`
    ///
    /// Verifies the CRC when `verify_crc` is set and strips the v3 extended
    /// header and trailing metadata when the header version is 2 or higher.
    pub fn decode_body(header: Header, body: &[u8], verify_crc: bool) -> Result<Self> {
        if body.len() as u64 != header.body_size {
            return Err(IgtlError::InvalidSize {
                expected: header.body_size as usize,
                actual: body.len(),
            });
        }

        if verify_crc {
            let calculated = calculate_crc(body);
            if calculated != header.crc {
                return Err(IgtlError::CrcMismatch {
                    expected: header.crc,
                    actual: calculated,
                });
            }
        }

        let content_bytes = if header.version >= 2 {
            content_after_extended_header(body)?
        } else {
            body
        };

        let content = T::decode_content(content_bytes)?;
        Ok(IgtlMessage { header, content })
    }

    /// Decode a full message (header followed by body)
    pub fn decode(data: &[u8], verify_crc: bool) -> Result<Self> {
        let header = Header::decode(data)?;
        let body_end = Header::SIZE + header.body_size as usize;
        if data.len() < body_end {
            return Err(IgtlError::InvalidSize {
                expected: body_end,
                actual: data.len(),
            });
        }
        Self::decode_body(header, &data[Header::SIZE..body_end], verify_crc)
    }
}

/// Slice out the content of a v3 body
///
/// Layout: extended header size (u16), metadata header size (u16),
/// metadata size (u32), message id (u32), content, metadata header, metadata.
fn content_after_extended_header(body: &[u8]) -> Result<&[u8]> {
    if body.len() < EXTENDED_HEADER_MIN {
        return Err(IgtlError::InvalidSize {
            expected: EXTENDED_HEADER_MIN,
            actual: body.len(),
        });
    }

    let ext_size = u16::from_be_bytes([body[0], body[1]]) as usize;
    let meta_header_size = u16::from_be_bytes([body[2], body[3]]) as usize;
    let meta_size = u32::from_be_bytes([body[4], body[5], body[6], body[7]]) as usize;
    let trailer = meta_header_size + meta_size;

    if ext_size < EXTENDED_HEADER_MIN || ext_size + trailer > body.len() {
        return Err(IgtlError::InvalidSize {
            expected: ext_size + trailer,
            actual: body.len(),
        });
    }

    Ok(&body[ext_size..body.len() - trailer])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::{StringMessage, TransformMessage};

    #[test]
    fn test_encode_fills_size_and_crc() {
        let msg = IgtlMessage::new(TransformMessage::identity(), "ACK_0007").unwrap();
        let encoded = msg.encode().unwrap();

        // Header (58) + TRANSFORM content (48)
        assert_eq!(encoded.len(), 106);

        let header = Header::decode(&encoded).unwrap();
        assert_eq!(header.version, 1);
        assert_eq!(header.body_size, 48);
        assert_eq!(header.crc, calculate_crc(&encoded[Header::SIZE..]));
    }

    #[test]
    fn test_decode_detects_corruption() {
        let msg = IgtlMessage::new(StringMessage::new("START_UP"), "CMD_0001").unwrap();
        let mut encoded = msg.encode().unwrap();
        // Low byte of the encoding field: the body stays well-formed
        encoded[Header::SIZE + 1] ^= 0xFF;

        let result = IgtlMessage::<StringMessage>::decode(&encoded, true);
        assert!(matches!(result, Err(IgtlError::CrcMismatch { .. })));

        // Without verification the corrupted body still parses
        let unchecked = IgtlMessage::<StringMessage>::decode(&encoded, false).unwrap();
        assert_eq!(unchecked.content.as_str(), "START_UP");
        assert_ne!(unchecked.content.encoding, msg.content.encoding);
    }

    #[test]
    fn test_decode_truncated_body() {
        let msg = IgtlMessage::new(TransformMessage::identity(), "TGT_0001").unwrap();
        let encoded = msg.encode().unwrap();
        let result = IgtlMessage::<TransformMessage>::decode(&encoded[..80], true);
        assert!(matches!(result, Err(IgtlError::InvalidSize { .. })));
    }

    #[test]
    fn test_decode_version3_body() {
        let content = StringMessage::new("CALIBRATION").encode_content().unwrap();
        let metadata = b"meta".to_vec();

        let mut body = Vec::new();
        body.extend_from_slice(&12u16.to_be_bytes());
        body.extend_from_slice(&0u16.to_be_bytes());
        body.extend_from_slice(&(metadata.len() as u32).to_be_bytes());
        body.extend_from_slice(&42u32.to_be_bytes());
        body.extend_from_slice(&content);
        body.extend_from_slice(&metadata);

        let header = Header {
            version: 2,
            type_name: TypeName::new("STRING").unwrap(),
            device_name: DeviceName::new("CMD_0002").unwrap(),
            timestamp: Timestamp::default(),
            body_size: body.len() as u64,
            crc: calculate_crc(&body),
        };

        let msg = IgtlMessage::<StringMessage>::decode_body(header, &body, true).unwrap();
        assert_eq!(msg.content.string, "CALIBRATION");
    }

    #[test]
    fn test_decode_version3_bad_extended_size() {
        let body = vec![0u8; 8];
        let header = Header {
            version: 2,
            type_name: TypeName::new("STRING").unwrap(),
            device_name: DeviceName::new("CMD_0002").unwrap(),
            timestamp: Timestamp::default(),
            body_size: body.len() as u64,
            crc: calculate_crc(&body),
        };
        let result = IgtlMessage::<StringMessage>::decode_body(header, &body, true);
        assert!(matches!(result, Err(IgtlError::InvalidSize { .. })));
    }
}
