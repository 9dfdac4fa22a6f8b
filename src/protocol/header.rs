//! OpenIGTLink message header
//!
//! Every message starts with a fixed 58-byte header. The server reads the
//! header first and decides from its type name whether the body is worth
//! reading at all.

use crate::error::{IgtlError, Result};
use bytes::{Buf, BufMut, BytesMut};

/// Message type name (12 bytes, null-padded)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName([u8; 12]);

impl TypeName {
    /// Create a type name from a string of at most 12 bytes
    pub fn new(name: &str) -> Result<Self> {
        if name.len() > 12 {
            return Err(IgtlError::InvalidHeader(format!(
                "Type name too long: {} bytes (max: 12)",
                name.len()
            )));
        }
        let mut bytes = [0u8; 12];
        bytes[..name.len()].copy_from_slice(name.as_bytes());
        Ok(TypeName(bytes))
    }

    /// Type name with trailing nulls removed
    pub fn as_str(&self) -> Result<&str> {
        let len = self.0.iter().position(|&b| b == 0).unwrap_or(12);
        std::str::from_utf8(&self.0[..len])
            .map_err(|_| IgtlError::InvalidHeader("Invalid UTF-8 in type name".to_string()))
    }
}

impl From<[u8; 12]> for TypeName {
    fn from(bytes: [u8; 12]) -> Self {
        TypeName(bytes)
    }
}

/// Device name (20 bytes, null-padded)
///
/// The template server encodes message purpose in the device name, see
/// [`crate::template::device`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceName([u8; 20]);

impl DeviceName {
    /// Create a device name from a string of at most 20 bytes
    pub fn new(name: &str) -> Result<Self> {
        if name.len() > 20 {
            return Err(IgtlError::InvalidHeader(format!(
                "Device name too long: {} bytes (max: 20)",
                name.len()
            )));
        }
        let mut bytes = [0u8; 20];
        bytes[..name.len()].copy_from_slice(name.as_bytes());
        Ok(DeviceName(bytes))
    }

    /// Device name with trailing nulls removed
    pub fn as_str(&self) -> Result<&str> {
        let len = self.0.iter().position(|&b| b == 0).unwrap_or(20);
        std::str::from_utf8(&self.0[..len])
            .map_err(|_| IgtlError::InvalidHeader("Invalid UTF-8 in device name".to_string()))
    }
}

impl From<[u8; 20]> for DeviceName {
    fn from(bytes: [u8; 20]) -> Self {
        DeviceName(bytes)
    }
}

/// OpenIGTLink timestamp
///
/// Upper 32 bits on the wire are seconds since the Unix epoch, lower 32 bits
/// are the fractional second scaled by 2^32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timestamp {
    /// Seconds since Unix epoch
    pub seconds: u32,
    /// Fractional second (0x00000000..=0xFFFFFFFF maps to 0.0..1.0)
    pub fraction: u32,
}

impl Timestamp {
    /// Create a timestamp from seconds and fraction
    pub fn new(seconds: u32, fraction: u32) -> Self {
        Timestamp { seconds, fraction }
    }

    /// Current wall-clock time
    ///
    /// A clock set before the epoch yields a zero timestamp.
    pub fn now() -> Self {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();

        let seconds = now.as_secs() as u32;
        let fraction = ((now.subsec_nanos() as u64) * 0x1_0000_0000 / 1_000_000_000) as u32;

        Timestamp { seconds, fraction }
    }

    /// Wire representation
    pub fn to_u64(self) -> u64 {
        ((self.seconds as u64) << 32) | (self.fraction as u64)
    }

    /// Parse the wire representation
    pub fn from_u64(value: u64) -> Self {
        Timestamp {
            seconds: (value >> 32) as u32,
            fraction: (value & 0xFFFF_FFFF) as u32,
        }
    }

    /// Nanoseconds within the current second
    pub fn subsec_nanos(self) -> u32 {
        (((self.fraction as u64) * 1_000_000_000) >> 32) as u32
    }
}

/// OpenIGTLink message header (58 bytes, big-endian)
///
/// | Field       | Size |
/// |-------------|------|
/// | version     | 2    |
/// | type name   | 12   |
/// | device name | 20   |
/// | timestamp   | 8    |
/// | body size   | 8    |
/// | CRC-64      | 8    |
#[derive(Debug, Clone)]
pub struct Header {
    /// Header version (1 for plain bodies, 2 when a v3 extended header follows)
    pub version: u16,
    /// Message type name
    pub type_name: TypeName,
    /// Device name
    pub device_name: DeviceName,
    /// Send time
    pub timestamp: Timestamp,
    /// Size of the body in bytes
    pub body_size: u64,
    /// CRC-64 of the body
    pub crc: u64,
}

impl Header {
    /// Header size in bytes
    pub const SIZE: usize = 58;

    /// Header version written by this server
    pub const VERSION: u16 = 1;

    /// Decode a header from the first 58 bytes of `buf`
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(IgtlError::InvalidSize {
                expected: Self::SIZE,
                actual: buf.len(),
            });
        }

        let mut cursor = &buf[..Self::SIZE];

        let version = cursor.get_u16();

        let mut type_bytes = [0u8; 12];
        cursor.copy_to_slice(&mut type_bytes);

        let mut device_bytes = [0u8; 20];
        cursor.copy_to_slice(&mut device_bytes);

        let timestamp = Timestamp::from_u64(cursor.get_u64());
        let body_size = cursor.get_u64();
        let crc = cursor.get_u64();

        Ok(Header {
            version,
            type_name: TypeName::from(type_bytes),
            device_name: DeviceName::from(device_bytes),
            timestamp,
            body_size,
            crc,
        })
    }

    /// Encode the header into its 58-byte wire form
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        buf.put_u16(self.version);
        buf.put_slice(&self.type_name.0);
        buf.put_slice(&self.device_name.0);
        buf.put_u64(self.timestamp.to_u64());
        buf.put_u64(self.body_size);
        buf.put_u64(self.crc);
        buf.to_vec()
    }

    /// Type name for logging, `"UNKNOWN"` when not valid UTF-8
    pub fn type_str(&self) -> &str {
        self.type_name.as_str().unwrap_or("UNKNOWN")
    }

    /// Device name for logging, `"UNKNOWN"` when not valid UTF-8
    pub fn device_str(&self) -> &str {
        self.device_name.as_str().unwrap_or("UNKNOWN")
    }
}
