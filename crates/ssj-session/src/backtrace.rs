//! Call-stack snapshots.

use std::fmt;

use ssj_wire::{Message, WireError};

use crate::protocol::Location;

/// One active call frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Display name of the function.
    pub name: String,
    pub file: String,
    /// 1-based line, or 0 for a native/system call boundary.
    pub line: u32,
}

impl Frame {
    /// Whether this frame has no script source.
    pub fn is_native(&self) -> bool {
        self.line == 0
    }

    /// Source position of the frame, if it has one.
    pub fn location(&self) -> Option<Location> {
        (!self.is_native()).then(|| Location::new(self.file.clone(), self.line))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.name.is_empty() {
            "[anon]"
        } else {
            self.name.as_str()
        };
        if self.is_native() {
            write!(f, "{name} [native]")
        } else {
            write!(f, "{name} at {}:{}", self.file, self.line)
        }
    }
}

/// Ordered snapshot of the call stack at a pause point, innermost frame
/// first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Backtrace {
    frames: Vec<Frame>,
}

impl Backtrace {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }

    /// Decode an `InspectStack` reply: repeated `(name, file, line)` triples.
    pub fn from_reply(reply: &Message) -> Result<Self, WireError> {
        if reply.len() % 3 != 0 {
            return Err(WireError::violation(format!(
                "stack reply has {} atoms, not a multiple of 3",
                reply.len()
            )));
        }
        let mut frames = Vec::with_capacity(reply.len() / 3);
        for base in (0..reply.len()).step_by(3) {
            let line = reply.int(base + 2)?;
            frames.push(Frame {
                name: reply.string(base)?.to_owned(),
                file: reply.string(base + 1)?.to_owned(),
                line: u32::try_from(line)
                    .map_err(|_| WireError::violation(format!("negative line {line}")))?,
            });
        }
        Ok(Self { frames })
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    /// The innermost frame.
    pub fn top(&self) -> Option<&Frame> {
        self.frames.first()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }
}
