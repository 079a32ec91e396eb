//! Ki protocol vocabulary: command codes, notification codes, and the
//! handful of small types shared by several views.

use std::fmt;

/// Protocol name expected as the first token of the greeting line.
pub const PROTOCOL_NAME: &str = "Ki";

/// Newest protocol version this debugger understands.
pub const PROTOCOL_VERSION: u32 = 1;

/// Request commands, sent as the first payload atom of a `Request`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    AddBreakpoint,
    DeleteBreakpoint,
    Detach,
    Download,
    Eval,
    GameInfo,
    InspectBreakpoints,
    InspectLocals,
    InspectObject,
    InspectStack,
    Pause,
    Resume,
    SetWatermark,
    StepIn,
    StepOut,
    StepOver,
}

impl Command {
    /// Wire code for this command.
    pub fn code(self) -> i32 {
        match self {
            Command::AddBreakpoint => 0x1001,
            Command::DeleteBreakpoint => 0x1002,
            Command::Detach => 0x1003,
            Command::Download => 0x1004,
            Command::Eval => 0x1005,
            Command::GameInfo => 0x1006,
            Command::InspectBreakpoints => 0x1007,
            Command::InspectLocals => 0x1008,
            Command::InspectObject => 0x1009,
            Command::InspectStack => 0x100A,
            Command::Pause => 0x100B,
            Command::Resume => 0x100C,
            Command::SetWatermark => 0x100D,
            Command::StepIn => 0x100E,
            Command::StepOut => 0x100F,
            Command::StepOver => 0x1010,
        }
    }

    /// Look a command up by its wire code.
    pub fn from_code(code: i32) -> Option<Self> {
        let command = match code {
            0x1001 => Command::AddBreakpoint,
            0x1002 => Command::DeleteBreakpoint,
            0x1003 => Command::Detach,
            0x1004 => Command::Download,
            0x1005 => Command::Eval,
            0x1006 => Command::GameInfo,
            0x1007 => Command::InspectBreakpoints,
            0x1008 => Command::InspectLocals,
            0x1009 => Command::InspectObject,
            0x100A => Command::InspectStack,
            0x100B => Command::Pause,
            0x100C => Command::Resume,
            0x100D => Command::SetWatermark,
            0x100E => Command::StepIn,
            0x100F => Command::StepOut,
            0x1010 => Command::StepOver,
            _ => return None,
        };
        Some(command)
    }
}

/// Notification sub-kind codes, sent as the first payload atom of a `Notify`.
pub mod notify_code {
    pub const DETACH: i32 = 0x01;
    pub const LOG: i32 = 0x02;
    pub const PAUSE: i32 = 0x03;
    pub const RESUME: i32 = 0x04;
    pub const THROW: i32 = 0x05;
}

/// The ways a paused debuggee can be set running again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeOp {
    Continue,
    StepOver,
    StepIn,
    StepOut,
}

impl ResumeOp {
    /// The request that performs this operation.
    pub fn command(self) -> Command {
        match self {
            ResumeOp::Continue => Command::Resume,
            ResumeOp::StepOver => Command::StepOver,
            ResumeOp::StepIn => Command::StepIn,
            ResumeOp::StepOut => Command::StepOut,
        }
    }
}

/// A point in the debuggee's source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: String,
    /// 1-based line number; 0 means no source (native code).
    pub line: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}
