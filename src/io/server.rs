//! OpenIGTLink listener and connection
//!
//! The template server talks to exactly one navigation console. The listener
//! polls for that client a bounded number of times; the connection reads a
//! header first and then either reads, or drains, the body.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, trace, warn};

use crate::config::ServerConfig;
use crate::error::{IgtlError, Result};
use crate::protocol::header::Header;
use crate::protocol::message::{IgtlMessage, Message};

/// Largest body the connection buffers in memory
///
/// Every body the server consumes is a few hundred bytes at most; anything
/// larger is drained from the stream and rejected.
pub const MAX_BODY_SIZE: u64 = 1 << 20;

/// Listening socket for the navigation console
pub struct TemplateListener {
    listener: TcpListener,
    verify_crc: bool,
}

impl TemplateListener {
    /// Bind to a local address (e.g. `"127.0.0.1:18944"`)
    ///
    /// # Errors
    ///
    /// - [`IgtlError::Io`] - address in use, insufficient permissions, etc.
    pub async fn bind(addr: &str) -> Result<Self> {
        info!(addr = %addr, "Binding template server");
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!(local_addr = %local_addr, "Template server listening");
        Ok(TemplateListener {
            listener,
            verify_crc: true,
        })
    }

    /// Bind according to `config`
    ///
    /// # Errors
    ///
    /// - [`IgtlError::InvalidPort`] - port 0
    /// - [`IgtlError::Io`] - bind failure
    pub async fn from_config(config: &ServerConfig) -> Result<Self> {
        ServerConfig::validate_port(config.port as i64)?;
        let mut listener = Self::bind(&config.bind_addr()).await?;
        listener.verify_crc = config.verify_crc;
        Ok(listener)
    }

    /// Wait up to `timeout` for a client
    ///
    /// Returns `Ok(None)` when nobody connected in time.
    pub async fn accept_timeout(&self, timeout: Duration) -> Result<Option<IgtlConnection>> {
        trace!(timeout_ms = timeout.as_millis() as u64, "Waiting for client");
        match tokio::time::timeout(timeout, self.listener.accept()).await {
            Ok(accepted) => {
                let (stream, addr) = accepted?;
                info!(peer_addr = %addr, "Client connected");
                let mut conn = IgtlConnection::new(stream);
                conn.set_verify_crc(self.verify_crc);
                Ok(Some(conn))
            }
            Err(_) => Ok(None),
        }
    }

    /// Poll for a client `attempts` times, `timeout` each
    ///
    /// # Errors
    ///
    /// - [`IgtlError::AcceptTimeout`] - no client connected in any poll
    pub async fn wait_for_client(
        &self,
        timeout: Duration,
        attempts: u32,
    ) -> Result<IgtlConnection> {
        for attempt in 1..=attempts {
            if let Some(conn) = self.accept_timeout(timeout).await? {
                return Ok(conn);
            }
            debug!(attempt, attempts, "No client yet");
        }
        warn!(attempts, "Timed out waiting for client");
        Err(IgtlError::AcceptTimeout { attempts })
    }

    /// Local address the listener is bound to
    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

/// Framed OpenIGTLink connection over any byte stream
///
/// Defaults to a TCP stream; tests run sessions over `tokio::io::duplex`.
pub struct IgtlConnection<S = TcpStream> {
    stream: S,
    verify_crc: bool,
}

impl<S: AsyncRead + AsyncWrite + Unpin> IgtlConnection<S> {
    /// Wrap a connected stream, CRC verification enabled
    pub fn new(stream: S) -> Self {
        IgtlConnection {
            stream,
            verify_crc: true,
        }
    }

    /// Enable or disable CRC verification for received bodies
    pub fn set_verify_crc(&mut self, verify: bool) {
        if verify != self.verify_crc {
            info!(verify = verify, "CRC verification setting changed");
            if !verify {
                warn!("CRC verification disabled - use only in trusted environments");
            }
        }
        self.verify_crc = verify;
    }

    /// Current CRC verification setting
    pub fn verify_crc(&self) -> bool {
        self.verify_crc
    }

    /// Read the next 58-byte header
    ///
    /// # Errors
    ///
    /// - [`IgtlError::Io`] - `UnexpectedEof` when the peer closed the stream
    pub async fn receive_header(&mut self) -> Result<Header> {
        let mut header_buf = [0u8; Header::SIZE];
        self.stream.read_exact(&mut header_buf).await?;

        let header = Header::decode(&header_buf)?;

        debug!(
            msg_type = header.type_str(),
            device_name = header.device_str(),
            body_size = header.body_size,
            version = header.version,
            timestamp_sec = header.timestamp.seconds,
            timestamp_nsec = header.timestamp.subsec_nanos(),
            "Received message header"
        );

        Ok(header)
    }

    /// Read the body announced by `header` and decode it as `T`
    ///
    /// # Errors
    ///
    /// - [`IgtlError::BodyTooLarge`] - body drained without decoding
    /// - [`IgtlError::CrcMismatch`] - corrupted body
    /// - [`IgtlError::InvalidSize`] - body does not fit `T`
    pub async fn receive_body<T: Message>(&mut self, header: Header) -> Result<IgtlMessage<T>> {
        if header.body_size > MAX_BODY_SIZE {
            self.discard_body(&header).await?;
            return Err(IgtlError::BodyTooLarge {
                size: header.body_size as usize,
                max: MAX_BODY_SIZE as usize,
            });
        }

        let mut body = vec![0u8; header.body_size as usize];
        self.stream.read_exact(&mut body).await?;

        trace!(
            msg_type = header.type_str(),
            bytes_read = body.len(),
            "Message body received"
        );

        IgtlMessage::decode_body(header, &body, self.verify_crc)
    }

    /// Skip the body announced by `header` to stay aligned on the next header
    pub async fn discard_body(&mut self, header: &Header) -> Result<()> {
        let mut body = (&mut self.stream).take(header.body_size);
        let skipped = tokio::io::copy(&mut body, &mut tokio::io::sink()).await?;

        if skipped != header.body_size {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }

        trace!(
            msg_type = header.type_str(),
            bytes_skipped = skipped,
            "Message body discarded"
        );
        Ok(())
    }

    /// Encode and send a message
    pub async fn send<T: Message>(&mut self, msg: &IgtlMessage<T>) -> Result<()> {
        let data = msg.encode()?;

        debug!(
            msg_type = msg.header.type_str(),
            device_name = msg.header.device_str(),
            size = data.len(),
            "Sending message"
        );

        self.stream.write_all(&data).await?;
        self.stream.flush().await?;

        trace!(bytes_sent = data.len(), "Message sent");
        Ok(())
    }

    /// Give back the underlying stream
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl IgtlConnection<TcpStream> {
    /// Remote peer address
    pub fn peer_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(self.stream.peer_addr()?)
    }
}
