//! Breakpoint table for one session.

use ssj_wire::{Message, WireError};

use crate::protocol::Location;

/// A breakpoint the debuggee has confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    /// Debuggee-assigned handle, used to clear the breakpoint later.
    pub handle: u32,
    /// Source file name as the debuggee knows it.
    pub file: String,
    /// Line number (1-based).
    pub line: u32,
}

impl Breakpoint {
    pub fn new(handle: u32, file: impl Into<String>, line: u32) -> Self {
        Self {
            handle,
            file: file.into(),
            line,
        }
    }
}

/// Confirmed breakpoints in insertion order.
///
/// Removing an entry compacts the list, so indices after it shift down.
#[derive(Debug, Clone, Default)]
pub struct BreakpointTable {
    entries: Vec<Breakpoint>,
}

impl BreakpointTable {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a breakpoint. Returns its index in the table.
    pub fn insert(&mut self, bp: Breakpoint) -> usize {
        self.entries.push(bp);
        self.entries.len() - 1
    }

    /// Remove the breakpoint with the given handle.
    ///
    /// Returns the removed entry, or `None` if no breakpoint has that handle.
    pub fn remove(&mut self, handle: u32) -> Option<Breakpoint> {
        let index = self.entries.iter().position(|bp| bp.handle == handle)?;
        Some(self.entries.remove(index))
    }

    /// Look up a breakpoint by handle.
    pub fn find(&self, handle: u32) -> Option<&Breakpoint> {
        self.entries.iter().find(|bp| bp.handle == handle)
    }

    /// The breakpoint at `index` in insertion order.
    pub fn get(&self, index: usize) -> Option<&Breakpoint> {
        self.entries.get(index)
    }

    /// All breakpoints set in one file.
    pub fn in_file<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a Breakpoint> + 'a {
        self.entries.iter().filter(move |bp| bp.file == file)
    }

    /// Whether a breakpoint exists at `file:line`.
    pub fn contains(&self, file: &str, line: u32) -> bool {
        self.entries
            .iter()
            .any(|bp| bp.file == file && bp.line == line)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Breakpoint> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every breakpoint.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Decode an `InspectBreakpoints` reply: repeated `(file, line)` pairs.
pub fn locations_from_reply(reply: &Message) -> Result<Vec<Location>, WireError> {
    if reply.len() % 2 != 0 {
        return Err(WireError::violation(format!(
            "breakpoint list has {} atoms, not a multiple of 2",
            reply.len()
        )));
    }
    let mut locations = Vec::with_capacity(reply.len() / 2);
    for base in (0..reply.len()).step_by(2) {
        let line = reply.int(base + 1)?;
        let line = u32::try_from(line)
            .map_err(|_| WireError::violation(format!("negative line {line}")))?;
        locations.push(Location::new(reply.string(base)?, line));
    }
    Ok(locations)
}
