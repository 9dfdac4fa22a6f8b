//! Network I/O for the template server
//!
//! A single listener accepts a single navigation console; the resulting
//! connection is driven message by message by the
//! [`Dispatcher`](crate::template::Dispatcher).

pub mod server;

pub use server::{IgtlConnection, TemplateListener, MAX_BODY_SIZE};
