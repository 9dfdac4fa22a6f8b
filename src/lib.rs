//! OpenIGTLink server for a passive needle-guidance template
//!
//! A navigation console connects over OpenIGTLink, registers the template's
//! Z-frame, then sends target points. Each target is snapped to the nearest
//! drillable hole; the server answers with the hole label, the insertion
//! depth and the achievable pose.
//!
//! # Session
//!
//! 1. `STRING CMD_nnnn "START_UP"` - server replies with the Z-frame geometry
//!    (`TRAJ ZFrameConfig`)
//! 2. `STRING CMD_nnnn "CALIBRATION"`, then `TRANSFORM CLB_nnnn` - registration
//! 3. `STRING CMD_nnnn "TARGETING"`, then any number of `TRANSFORM TGT_nnnn` -
//!    each answered with `STATUS TARGET` and `TRANSFORM TARGET`
//!
//! Every accepted message is acknowledged with the same content under
//! `ACK_nnnn`.
//!
//! # Example
//!
//! ```no_run
//! use igtl_template_server::config::ServerConfig;
//! use igtl_template_server::template::serve;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> igtl_template_server::Result<()> {
//!     let dispatcher = serve(&ServerConfig::with_port(18944)).await?;
//!     println!("{:?}", dispatcher.last_selection());
//!     Ok(())
//! }
//! ```
//!
//! # Logging
//!
//! All layers log through `tracing`. Link traffic is logged at `debug`,
//! byte-level I/O at `trace`, phase changes and snaps at `info`.

pub mod config;
pub mod error;
pub mod io;
pub mod protocol;
pub mod template;

// Re-export commonly used types
pub use error::{IgtlError, Result, TemplateError};
