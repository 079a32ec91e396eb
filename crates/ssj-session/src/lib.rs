//! ssj-session: debugger-side engine for one attached Ki debuggee.
//!
//! This crate owns the session state machine: handshake, request/reply
//! correlation with interleaved notifications, run-state tracking, the
//! breakpoint table, and the caches that are dropped whenever the debuggee
//! resumes.

pub mod backtrace;
pub mod breakpoint;
pub mod error;
pub mod factory;
pub mod handshake;
pub mod notify;
pub mod object;
pub mod protocol;
pub mod session;
pub mod source;

#[cfg(test)]
mod stub;

// Re-export key types for convenience.
pub use backtrace::{Backtrace, Frame};
pub use breakpoint::{Breakpoint, BreakpointTable};
pub use error::{RemoteError, SessionError};
pub use factory::{SessionFactory, SessionSettings};
pub use handshake::{GameInfo, Greeting};
pub use notify::{DetachReason, LogLevel, Notification, NotificationSink, TracingSink};
pub use object::{Evaluation, PropFlags, PropValue, Property, Variable};
pub use protocol::{Command, Location, ResumeOp};
pub use session::{AttachState, RunState, Session, SessionId};
pub use source::{SourceCache, SourceListing};
