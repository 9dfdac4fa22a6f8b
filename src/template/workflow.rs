//! Workflow phases
//!
//! Four independent phase statuses. Commands arriving out of sequence are
//! rejected without changing any status.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, info};

/// Status of one workflow phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhaseStatus {
    #[default]
    Waiting,
    Running,
    Done,
    Failed,
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhaseStatus::Waiting => "WAITING",
            PhaseStatus::Running => "RUNNING",
            PhaseStatus::Done => "DONE",
            PhaseStatus::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Workflow command carried by a `CMD_` STRING message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    StartUp,
    Calibration,
    Targeting,
}

impl Command {
    /// Wire spelling of the command
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::StartUp => "START_UP",
            Command::Calibration => "CALIBRATION",
            Command::Targeting => "TARGETING",
        }
    }
}

impl FromStr for Command {
    type Err = ();

    /// Case-sensitive match against the three known commands
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "START_UP" => Ok(Command::StartUp),
            "CALIBRATION" => Ok(Command::Calibration),
            "TARGETING" => Ok(Command::Targeting),
            _ => Err(()),
        }
    }
}

/// Phase statuses of one session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workflow {
    startup: PhaseStatus,
    zeroing: PhaseStatus,
    calibration: PhaseStatus,
    targeting: PhaseStatus,
}

impl Workflow {
    /// All phases waiting
    pub fn new() -> Self {
        Self::default()
    }

    pub fn startup(&self) -> PhaseStatus {
        self.startup
    }

    /// Reserved; never transitioned by this server
    pub fn zeroing(&self) -> PhaseStatus {
        self.zeroing
    }

    pub fn calibration(&self) -> PhaseStatus {
        self.calibration
    }

    pub fn targeting(&self) -> PhaseStatus {
        self.targeting
    }

    /// `START_UP` received; allowed in any state
    pub fn begin_startup(&mut self) {
        self.startup = PhaseStatus::Running;
        info!(phase = "startup", status = %self.startup, "Phase changed");
    }

    /// Record the outcome of sending the startup geometry
    pub fn finish_startup(&mut self, success: bool) {
        self.startup = if success {
            PhaseStatus::Done
        } else {
            PhaseStatus::Failed
        };
        info!(phase = "startup", status = %self.startup, "Phase changed");
    }

    /// `CALIBRATION` received; returns false when rejected
    pub fn start_calibration(&mut self) -> bool {
        if self.startup != PhaseStatus::Done {
            debug!(startup = %self.startup, "CALIBRATION rejected");
            return false;
        }
        self.calibration = PhaseStatus::Running;
        info!(phase = "calibration", status = %self.calibration, "Phase changed");
        true
    }

    /// `TARGETING` received; returns false when rejected
    pub fn start_targeting(&mut self) -> bool {
        if self.startup != PhaseStatus::Done || self.calibration != PhaseStatus::Done {
            debug!(
                startup = %self.startup,
                calibration = %self.calibration,
                "TARGETING rejected"
            );
            return false;
        }
        self.targeting = PhaseStatus::Running;
        info!(phase = "targeting", status = %self.targeting, "Phase changed");
        true
    }

    /// Whether a calibration pose is accepted now
    pub fn accepts_calibration_pose(&self) -> bool {
        self.startup == PhaseStatus::Done && self.calibration == PhaseStatus::Running
    }

    /// Calibration pose stored
    pub fn complete_calibration(&mut self) {
        self.calibration = PhaseStatus::Done;
        info!(phase = "calibration", status = %self.calibration, "Phase changed");
    }

    /// Whether a target pose is accepted now
    ///
    /// Targeting stays running after a snap, so repeated targets need no new
    /// `TARGETING` command.
    pub fn accepts_target_pose(&self) -> bool {
        self.startup == PhaseStatus::Done
            && self.calibration == PhaseStatus::Done
            && self.targeting == PhaseStatus::Running
    }
}
