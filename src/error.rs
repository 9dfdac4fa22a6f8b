//! Error types for the template server
//!
//! Two layers of errors exist: [`IgtlError`] covers the OpenIGTLink link
//! (framing, checksums, sockets, startup configuration) and [`TemplateError`]
//! covers the template core (grid geometry, registration, device naming).
//! Template errors end up in a status reply or a log line, never in an
//! [`IgtlError`].

use thiserror::Error;

/// Errors raised by the template core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    /// Requested hole lies outside the template grid
    ///
    /// Valid rows are `[0, 19)`. Even rows hold 16 holes, odd rows hold 17.
    #[error("Hole ({row}, {column}) is out of range")]
    HoleOutOfRange {
        /// Requested row
        row: i32,
        /// Requested column
        column: i32,
    },

    /// A hole transform was requested before any calibration was received
    #[error("Registration transform has not been set")]
    NotRegistered,

    /// Device name does not follow the `XXXX_nnnn` convention
    ///
    /// # Example
    /// ```no_run
    /// # use igtl_template_server::error::TemplateError;
    /// let err = TemplateError::InvalidDeviceName("TGT_abc".to_string());
    /// ```
    #[error("Invalid device name: {0}")]
    InvalidDeviceName(String),
}

/// OpenIGTLink link and server error types
///
/// All link operations return `Result<T, IgtlError>`.
#[derive(Error, Debug)]
pub enum IgtlError {
    /// Invalid header format or content
    ///
    /// Raised when a type or device name is too long or not valid UTF-8.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// CRC checksum mismatch
    ///
    /// The body was corrupted in transit. The message is discarded and no
    /// acknowledgement is sent.
    #[error("CRC mismatch: expected {expected:#x}, got {actual:#x}")]
    CrcMismatch {
        /// CRC declared in the message header
        expected: u64,
        /// CRC calculated over the received body
        actual: u64,
    },

    /// Invalid message size
    ///
    /// The body does not have the size its message type requires, or the
    /// buffer is shorter than the header declares.
    #[error("Invalid message size: expected {expected}, got {actual}")]
    InvalidSize {
        /// Expected size in bytes
        expected: usize,
        /// Actual size in bytes
        actual: usize,
    },

    /// I/O error on the underlying stream
    ///
    /// A zero-length read surfaces here as `UnexpectedEof` and ends the session.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error in a text field
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Message body size exceeds what the server is willing to buffer
    #[error("Message body too large: {size} bytes (max: {max})")]
    BodyTooLarge {
        /// Declared body size in bytes
        size: usize,
        /// Maximum accepted size in bytes
        max: usize,
    },

    /// Port number outside `[1, 65535]`
    #[error("Invalid port: {0} (expected 1-65535)")]
    InvalidPort(i64),

    /// No client connected within the accept window
    #[error("No client connected after {attempts} attempts")]
    AcceptTimeout {
        /// Number of accept polls performed
        attempts: u32,
    },
}

impl IgtlError {
    /// Returns true when the error means the peer has gone away
    pub fn is_disconnect(&self) -> bool {
        match self {
            IgtlError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

/// Result type alias for link and server operations
pub type Result<T> = std::result::Result<T, IgtlError>;
