//! Text rendering of session views for the console.

use std::fmt::Write;

use ssj_session::{
    Backtrace, BreakpointTable, Evaluation, Location, LogLevel, Notification, PropValue, Property,
    Session, SourceListing, Variable,
};
use tokio::io::{AsyncRead, AsyncWrite};

/// First line printed after attaching.
pub(crate) fn banner<S>(session: &Session<S>) -> String
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let game = session.game_info();
    let mut line = format!("attached to {}", session.title());
    if !game.author.is_empty() {
        let _ = write!(line, " by {}", game.author);
    }
    let _ = write!(
        line,
        " ({}, Ki v{})",
        session.peer(),
        session.protocol_version()
    );
    line
}

/// Console text for a notification, if it should be shown.
pub(crate) fn notification(n: &Notification) -> Option<String> {
    match n {
        Notification::Log { level, text } => Some(match level {
            LogLevel::Warning => format!("warning: {text}"),
            LogLevel::Error => format!("error: {text}"),
            LogLevel::Print | LogLevel::Debug | LogLevel::Trace => text.clone(),
        }),
        Notification::Throw { message, location } => Some(match location {
            Some(at) => format!("uncaught exception at {at}: {message}"),
            None => format!("uncaught exception: {message}"),
        }),
        Notification::Detach(reason) => Some(format!("debuggee {reason}")),
        Notification::Pause { .. } | Notification::Resume => None,
    }
}

/// Numbered source lines around `location`. `=>` marks the current line
/// and `*` a line with a breakpoint.
pub(crate) fn listing(
    location: &Location,
    source: &SourceListing,
    breakpoints: &BreakpointTable,
    context: u32,
) -> String {
    let window = source.window(location.line, context);
    let width = window.last().map_or(1, |(n, _)| n.to_string().len());
    let mut out = String::new();
    for (number, text) in window {
        let marker = if number == location.line { "=>" } else { "  " };
        let bp = if breakpoints.contains(&location.file, number) { '*' } else { ' ' };
        let _ = writeln!(out, "{marker}{bp}{number:>width$} | {text}");
    }
    out
}

/// A whole file, numbered from 1.
pub(crate) fn source(file: &str, source: &SourceListing, breakpoints: &BreakpointTable) -> String {
    let width = source.len().to_string().len();
    let mut out = String::new();
    for (index, text) in source.lines().iter().enumerate() {
        let number = index as u32 + 1;
        let bp = if breakpoints.contains(file, number) { '*' } else { ' ' };
        let _ = writeln!(out, "{bp}{number:>width$} | {text}");
    }
    out
}

pub(crate) fn backtrace(stack: &Backtrace) -> String {
    if stack.is_empty() {
        return "no call stack\n".to_string();
    }
    let mut out = String::new();
    for (index, frame) in stack.iter().enumerate() {
        let _ = writeln!(out, "#{index:<2} {frame}");
    }
    out
}

pub(crate) fn locals(vars: &[Variable]) -> String {
    if vars.is_empty() {
        return "no locals\n".to_string();
    }
    let mut out = String::new();
    for var in vars {
        let _ = writeln!(out, "{} = {} ({})", var.name, var.value, var.class_name);
    }
    out
}

pub(crate) fn evaluation(eval: &Evaluation) -> String {
    if eval.is_error {
        format!("error: {}", eval.value)
    } else {
        format!("= {}", eval.value)
    }
}

pub(crate) fn properties(props: &[Property]) -> String {
    if props.is_empty() {
        return "no properties\n".to_string();
    }
    let mut out = String::new();
    for prop in props {
        match &prop.value {
            PropValue::Data(value) => {
                let _ = writeln!(out, "{} {} = {}", prop.flags, prop.key, value);
            }
            PropValue::Accessor { getter, setter } => {
                let _ = writeln!(
                    out,
                    "{} {} = get {} set {}",
                    prop.flags, prop.key, getter, setter
                );
            }
        }
    }
    out
}
