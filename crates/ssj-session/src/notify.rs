//! Notifications pushed by the debuggee, and where they are forwarded.

use std::fmt;

use ssj_wire::{Atom, Message, MessageKind, WireError};

use crate::protocol::{notify_code, Location};
use crate::session::SessionId;

/// Why the debuggee ended the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetachReason {
    /// Normal detach, usually in answer to our own request.
    Normal,
    /// The game quit.
    Quit,
    /// The debuggee did not understand something we sent.
    InvalidProtocol,
    /// The engine hit a fatal error.
    EngineError,
    Other(i32),
}

impl DetachReason {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => DetachReason::Normal,
            1 => DetachReason::Quit,
            2 => DetachReason::InvalidProtocol,
            3 => DetachReason::EngineError,
            other => DetachReason::Other(other),
        }
    }
}

impl fmt::Display for DetachReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetachReason::Normal => f.write_str("detached"),
            DetachReason::Quit => f.write_str("game exited"),
            DetachReason::InvalidProtocol => f.write_str("protocol error"),
            DetachReason::EngineError => f.write_str("engine crashed"),
            DetachReason::Other(code) => write!(f, "detached (reason {code})"),
        }
    }
}

/// Severity of a `Log` notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Print,
    Debug,
    Trace,
    Warning,
    Error,
}

impl LogLevel {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => LogLevel::Debug,
            2 => LogLevel::Trace,
            3 => LogLevel::Warning,
            4 => LogLevel::Error,
            _ => LogLevel::Print,
        }
    }
}

/// A decoded `Notify` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The debuggee is ending the session.
    Detach(DetachReason),
    /// Script output.
    Log { level: LogLevel, text: String },
    /// Execution stopped, optionally at a known source position.
    Pause { location: Option<Location> },
    /// Execution continued.
    Resume,
    /// An exception went uncaught.
    Throw {
        message: String,
        location: Option<Location>,
    },
}

impl Notification {
    /// Decode a `Notify` message by the sub-kind code in its first atom.
    pub fn from_message(message: &Message) -> Result<Self, WireError> {
        if message.kind() != MessageKind::Notify {
            return Err(WireError::violation(format!(
                "{:?} message is not a notification",
                message.kind()
            )));
        }
        let notification = match message.int(0)? {
            notify_code::DETACH => {
                let reason = message.atoms().get(1).and_then(Atom::as_int).unwrap_or(0);
                Notification::Detach(DetachReason::from_code(reason))
            }
            notify_code::LOG => Notification::Log {
                level: LogLevel::from_code(message.int(1)?),
                text: message.string(2)?.to_owned(),
            },
            notify_code::PAUSE => Notification::Pause {
                location: optional_location(message, 1),
            },
            notify_code::RESUME => Notification::Resume,
            notify_code::THROW => Notification::Throw {
                message: message.string(1)?.to_owned(),
                location: optional_location(message, 2),
            },
            other => {
                return Err(WireError::violation(format!(
                    "unknown notification code {other}"
                )))
            }
        };
        Ok(notification)
    }
}

/// A `(file, line)` pair starting at `index`, if both atoms are present and
/// well-typed.
fn optional_location(message: &Message, index: usize) -> Option<Location> {
    let file = message.atoms().get(index)?.as_str()?;
    let line = message.atoms().get(index + 1)?.as_int()?;
    Some(Location::new(file, u32::try_from(line).ok()?))
}

/// Receives every notification after the session has applied it to its own
/// state.
pub trait NotificationSink: Send {
    fn notify(&mut self, session: SessionId, notification: &Notification);
}

impl<F> NotificationSink for F
where
    F: FnMut(SessionId, &Notification) + Send,
{
    fn notify(&mut self, session: SessionId, notification: &Notification) {
        self(session, notification)
    }
}

/// Sink that writes notifications to the `tracing` log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&mut self, session: SessionId, notification: &Notification) {
        match notification {
            Notification::Log { level, text } if *level >= LogLevel::Warning => {
                tracing::warn!(%session, "{text}")
            }
            Notification::Log { text, .. } => tracing::info!(%session, "{text}"),
            Notification::Throw { message, location } => {
                tracing::warn!(%session, ?location, "uncaught: {message}")
            }
            Notification::Detach(reason) => tracing::info!(%session, "debuggee {reason}"),
            Notification::Pause { location } => tracing::debug!(%session, ?location, "paused"),
            Notification::Resume => tracing::debug!(%session, "resumed"),
        }
    }
}
