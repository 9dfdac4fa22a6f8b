//! OpenIGTLink message bodies used by the template server

pub mod status;
pub mod string;
pub mod trajectory;
pub mod transform;

pub use status::{StatusCode, StatusMessage};
pub use string::StringMessage;
pub use trajectory::{TrajectoryElement, TrajectoryMessage, TrajectoryType};
pub use transform::TransformMessage;
