//! Domain types shared by the controller, the host bridge and the CLI.
//!
//! Everything here is plain data: the service lifecycle states, the control
//! requests a host may deliver, the set of requests a state accepts, and the
//! status report sent back after each transition.

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Service state
// ---------------------------------------------------------------------------

/// Lifecycle state of the hosted service.
///
/// `StartPending` is the initial state; `Stopped` is terminal for the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    StartPending,
    Running,
    Paused,
    StopPending,
    Stopped,
}

impl ServiceState {
    /// Whether the host will never resume a service in this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServiceState::Stopped)
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceState::StartPending => "start_pending",
            ServiceState::Running => "running",
            ServiceState::Paused => "paused",
            ServiceState::StopPending => "stop_pending",
            ServiceState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Control requests
// ---------------------------------------------------------------------------

/// Host control code for [`ControlRequest::Stop`].
pub const CONTROL_STOP: u32 = 1;
/// Host control code for [`ControlRequest::Pause`].
pub const CONTROL_PAUSE: u32 = 2;
/// Host control code for [`ControlRequest::Continue`].
pub const CONTROL_CONTINUE: u32 = 3;
/// Host control code for [`ControlRequest::Interrogate`].
pub const CONTROL_INTERROGATE: u32 = 4;
/// Host control code for [`ControlRequest::Shutdown`].
pub const CONTROL_SHUTDOWN: u32 = 5;

/// A control request delivered by the host, one at a time.
///
/// Codes the controller does not understand are kept as `Unknown(code)` so
/// they can be logged rather than silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlRequest {
    Interrogate,
    Stop,
    Shutdown,
    Pause,
    Continue,
    Unknown(u32),
}

impl ControlRequest {
    /// Map a raw host control code to a request.
    pub fn from_code(code: u32) -> Self {
        match code {
            CONTROL_STOP => ControlRequest::Stop,
            CONTROL_PAUSE => ControlRequest::Pause,
            CONTROL_CONTINUE => ControlRequest::Continue,
            CONTROL_INTERROGATE => ControlRequest::Interrogate,
            CONTROL_SHUTDOWN => ControlRequest::Shutdown,
            other => ControlRequest::Unknown(other),
        }
    }

    /// The raw host control code for this request.
    pub fn code(&self) -> u32 {
        match self {
            ControlRequest::Stop => CONTROL_STOP,
            ControlRequest::Pause => CONTROL_PAUSE,
            ControlRequest::Continue => CONTROL_CONTINUE,
            ControlRequest::Interrogate => CONTROL_INTERROGATE,
            ControlRequest::Shutdown => CONTROL_SHUTDOWN,
            ControlRequest::Unknown(code) => *code,
        }
    }

    /// Parse a lowercase request name (`"stop"`, `"pause"`, ...).
    ///
    /// Returns `None` for names that are not one of the known requests.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "interrogate" => Some(ControlRequest::Interrogate),
            "stop" => Some(ControlRequest::Stop),
            "shutdown" => Some(ControlRequest::Shutdown),
            "pause" => Some(ControlRequest::Pause),
            "continue" => Some(ControlRequest::Continue),
            _ => None,
        }
    }
}

impl fmt::Display for ControlRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlRequest::Interrogate => f.write_str("interrogate"),
            ControlRequest::Stop => f.write_str("stop"),
            ControlRequest::Shutdown => f.write_str("shutdown"),
            ControlRequest::Pause => f.write_str("pause"),
            ControlRequest::Continue => f.write_str("continue"),
            ControlRequest::Unknown(code) => write!(f, "unknown({code})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Accepted requests
// ---------------------------------------------------------------------------

/// Name of a single acceptable control, used for the serialized form of
/// [`Accepts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptedControl {
    Stop,
    Shutdown,
    Pause,
    Continue,
}

impl AcceptedControl {
    const ALL: [AcceptedControl; 4] = [
        AcceptedControl::Stop,
        AcceptedControl::Shutdown,
        AcceptedControl::Pause,
        AcceptedControl::Continue,
    ];

    fn bit(self) -> Accepts {
        match self {
            AcceptedControl::Stop => Accepts::STOP,
            AcceptedControl::Shutdown => Accepts::SHUTDOWN,
            AcceptedControl::Pause => Accepts::PAUSE,
            AcceptedControl::Continue => Accepts::CONTINUE,
        }
    }
}

/// Set of control requests the host may currently deliver.
///
/// Serialized as a list of names, e.g. `["stop", "shutdown"]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "Vec<AcceptedControl>", from = "Vec<AcceptedControl>")]
pub struct Accepts(u8);

impl Accepts {
    pub const NONE: Accepts = Accepts(0);
    pub const STOP: Accepts = Accepts(1 << 0);
    pub const SHUTDOWN: Accepts = Accepts(1 << 1);
    pub const PAUSE: Accepts = Accepts(1 << 2);
    pub const CONTINUE: Accepts = Accepts(1 << 3);

    /// Accepted while the worker runs.
    pub const RUNNING: Accepts =
        Accepts(Self::STOP.0 | Self::SHUTDOWN.0 | Self::PAUSE.0 | Self::CONTINUE.0);

    /// Accepted while paused; pausing again is not offered.
    pub const PAUSED: Accepts = Accepts(Self::CONTINUE.0 | Self::STOP.0 | Self::SHUTDOWN.0);

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, other: Accepts) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether `request` may be delivered under this set.
    ///
    /// Interrogate is always deliverable; unknown codes never are.
    pub fn accepts(&self, request: &ControlRequest) -> bool {
        match request {
            ControlRequest::Interrogate => true,
            ControlRequest::Stop => self.contains(Accepts::STOP),
            ControlRequest::Shutdown => self.contains(Accepts::SHUTDOWN),
            ControlRequest::Pause => self.contains(Accepts::PAUSE),
            ControlRequest::Continue => self.contains(Accepts::CONTINUE),
            ControlRequest::Unknown(_) => false,
        }
    }
}

impl BitOr for Accepts {
    type Output = Accepts;

    fn bitor(self, rhs: Accepts) -> Accepts {
        Accepts(self.0 | rhs.0)
    }
}

impl From<Accepts> for Vec<AcceptedControl> {
    fn from(accepts: Accepts) -> Self {
        AcceptedControl::ALL
            .into_iter()
            .filter(|control| accepts.contains(control.bit()))
            .collect()
    }
}

impl From<Vec<AcceptedControl>> for Accepts {
    fn from(controls: Vec<AcceptedControl>) -> Self {
        controls
            .into_iter()
            .fold(Accepts::NONE, |acc, control| acc | control.bit())
    }
}

// ---------------------------------------------------------------------------
// Status report
// ---------------------------------------------------------------------------

/// Status sent to the host after every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub state: ServiceState,
    pub accepts: Accepts,
}

impl StatusReport {
    pub fn new(state: ServiceState, accepts: Accepts) -> Self {
        Self { state, accepts }
    }

    pub fn start_pending() -> Self {
        Self::new(ServiceState::StartPending, Accepts::NONE)
    }

    pub fn running() -> Self {
        Self::new(ServiceState::Running, Accepts::RUNNING)
    }

    pub fn paused() -> Self {
        Self::new(ServiceState::Paused, Accepts::PAUSED)
    }

    pub fn stop_pending() -> Self {
        Self::new(ServiceState::StopPending, Accepts::NONE)
    }
}
