//! Device-name convention
//!
//! Names are a 4-character category tag (`CMD_`, `CLB_`, `TGT_`, `ACK_`)
//! followed by a decimal id, e.g. `TGT_0007`. Replies are acknowledged as
//! `ACK_` plus the id zero-padded to 4 digits.

use std::fmt;

use crate::error::TemplateError;

/// Length of the category tag, underscore included
pub const TAG_LEN: usize = 4;

/// Purpose of a message, from its device-name tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Category {
    /// `CMD_` workflow command
    Command,
    /// `CLB_` calibration pose
    Calibration,
    /// `TGT_` target pose
    Targeting,
    /// `ACK_` acknowledgement
    Acknowledgement,
    /// Any other tag
    Other(String),
}

impl Category {
    /// Category for a 4-character tag
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "CMD_" => Category::Command,
            "CLB_" => Category::Calibration,
            "TGT_" => Category::Targeting,
            "ACK_" => Category::Acknowledgement,
            other => Category::Other(other.to_string()),
        }
    }

    /// The tag as it appears on the wire
    pub fn tag(&self) -> &str {
        match self {
            Category::Command => "CMD_",
            Category::Calibration => "CLB_",
            Category::Targeting => "TGT_",
            Category::Acknowledgement => "ACK_",
            Category::Other(tag) => tag,
        }
    }
}

/// Parsed device name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceId {
    pub category: Category,
    pub id: u32,
}

impl DeviceId {
    pub fn new(category: Category, id: u32) -> Self {
        DeviceId { category, id }
    }

    /// Split `name` into tag and numeric id
    ///
    /// # Errors
    ///
    /// - [`TemplateError::InvalidDeviceName`] - shorter than the tag, or the
    ///   remainder is not a plain decimal number
    ///
    /// # Examples
    ///
    /// ```
    /// use igtl_template_server::template::{Category, DeviceId};
    ///
    /// let device = DeviceId::parse("TGT_0007").unwrap();
    /// assert_eq!(device.category, Category::Targeting);
    /// assert_eq!(device.ack_name(), "ACK_0007");
    /// ```
    pub fn parse(name: &str) -> Result<Self, TemplateError> {
        let invalid = || TemplateError::InvalidDeviceName(name.to_string());

        if name.len() <= TAG_LEN || !name.is_char_boundary(TAG_LEN) {
            return Err(invalid());
        }
        let (tag, rest) = name.split_at(TAG_LEN);

        if !rest.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let id = rest.parse::<u32>().map_err(|_| invalid())?;

        Ok(DeviceId {
            category: Category::from_tag(tag),
            id,
        })
    }

    /// Device name of the acknowledgement for this message
    pub fn ack_name(&self) -> String {
        format!("ACK_{:04}", self.id)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:04}", self.category.tag(), self.id)
    }
}
