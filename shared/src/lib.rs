//! Cuddlebot Shared Protocol Types
//!
//! This crate provides the command types and wire codec shared by host tools
//! that talk to the Cuddlebot actuator controllers.

pub mod codec;

use std::fmt;

/// Protocol constants for the actuator link
pub mod link {
    /// Default serial device for the actuator bus
    pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

    /// Baud rate the actuator controllers are flashed with
    pub const DEFAULT_BAUD_RATE: u32 = 115_200;
}

/// Logical address of an actuator on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Address {
    Ribs,
    Purr,
    Spine,
    HeadYaw,
    HeadPitch,
}

impl Address {
    /// All addresses, in selector priority order
    pub const ALL: [Address; 5] = [
        Address::Ribs,
        Address::Purr,
        Address::Spine,
        Address::HeadYaw,
        Address::HeadPitch,
    ];

    /// Wire identifier of this address
    pub fn id(self) -> u8 {
        match self {
            Address::Ribs => 1,
            Address::Purr => 2,
            Address::Spine => 3,
            Address::HeadYaw => 4,
            Address::HeadPitch => 5,
        }
    }

    /// Look up an address by its wire identifier
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|addr| addr.id() == id)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Address::Ribs => "ribs",
            Address::Purr => "purr",
            Address::Spine => "spine",
            Address::HeadYaw => "head-yaw",
            Address::HeadPitch => "head-pitch",
        };
        write!(f, "{} ({})", name, self.id())
    }
}

/// PID controller coefficients
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidCoefficients {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

/// One step of a setpoint sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Setpoint {
    /// Time to reach the setpoint, in milliseconds
    pub duration: u16,
    /// Target position in 1/65536ths of a full turn
    pub setpoint: u16,
}

/// How many times a setpoint sequence is played
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCount {
    /// Repeat until another sequence is sent
    Forever,
    /// Repeat a fixed number of times
    Times(u16),
}

impl LoopCount {
    /// Wire value reserved for [`LoopCount::Forever`]
    pub const FOREVER_WIRE: u16 = u16::MAX;

    /// Largest finite loop count; anything above collides with the sentinel
    pub const MAX_TIMES: u16 = Self::FOREVER_WIRE - 1;

    /// Encode to the shared u16 wire field
    pub fn to_wire(self) -> Option<u16> {
        match self {
            LoopCount::Forever => Some(Self::FOREVER_WIRE),
            LoopCount::Times(n) if n <= Self::MAX_TIMES => Some(n),
            LoopCount::Times(_) => None,
        }
    }

    /// Decode from the shared u16 wire field
    pub fn from_wire(value: u16) -> Self {
        if value == Self::FOREVER_WIRE {
            LoopCount::Forever
        } else {
            LoopCount::Times(value)
        }
    }
}

impl fmt::Display for LoopCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopCount::Forever => f.write_str("forever"),
            LoopCount::Times(n) => write!(f, "{}", n),
        }
    }
}

/// A command addressed to a single actuator
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Replace the actuator's PID coefficients
    SetPid(PidCoefficients),
    /// Play a sequence of setpoints after `delay` milliseconds
    SetSetpoints {
        delay: u16,
        loop_count: LoopCount,
        setpoints: Vec<Setpoint>,
    },
    /// Ask the actuator to answer
    Ping,
    /// Run the on-board self test and stream its report
    RunSelfTest,
    /// Read the current motor position
    RequestPosition,
}

impl Command {
    /// Short command name as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetPid(_) => "setpid",
            Command::SetSetpoints { .. } => "setpoint",
            Command::Ping => "ping",
            Command::RunSelfTest => "test",
            Command::RequestPosition => "value",
        }
    }
}
