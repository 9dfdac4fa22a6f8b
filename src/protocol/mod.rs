//! OpenIGTLink wire protocol
//!
//! Header framing, CRC-64 and the four message bodies the template server
//! exchanges with the navigation console.

pub mod crc;
pub mod header;
pub mod message;
pub mod types;

pub use crc::{calculate_crc, verify_crc};
pub use header::{DeviceName, Header, Timestamp, TypeName};
pub use message::{IgtlMessage, Message};
