//! Messages: a classified, ordered run of atoms.

use crate::atom::{Atom, Handle};
use crate::error::WireError;

/// Classification of a message, taken from its lead atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Request,
    Reply,
    Error,
    Notify,
    /// The first atom was not a framing tag.
    Unknown,
}

impl MessageKind {
    /// The lead atom written before the payload, if the kind has one.
    pub fn lead_atom(self) -> Option<Atom> {
        match self {
            MessageKind::Request => Some(Atom::Request),
            MessageKind::Reply => Some(Atom::Reply),
            MessageKind::Error => Some(Atom::Error),
            MessageKind::Notify => Some(Atom::Notify),
            MessageKind::Unknown => None,
        }
    }
}

/// A complete protocol message.
///
/// The terminating end-of-message marker is implied and never stored among
/// the atoms.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    kind: MessageKind,
    atoms: Vec<Atom>,
}

impl Message {
    /// Create an empty message of the given kind.
    pub fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            atoms: Vec::new(),
        }
    }

    /// Create a message from a kind and its payload atoms.
    pub fn with_atoms(kind: MessageKind, atoms: Vec<Atom>) -> Self {
        Self { kind, atoms }
    }

    /// Create a request whose first payload atom is the command code.
    pub fn request(command: i32) -> Self {
        Self::with_atoms(MessageKind::Request, vec![Atom::Int(command)])
    }

    /// Create an empty reply.
    pub fn reply() -> Self {
        Self::new(MessageKind::Reply)
    }

    /// Create a notification whose first payload atom is the sub-kind code.
    pub fn notify(code: i32) -> Self {
        Self::with_atoms(MessageKind::Notify, vec![Atom::Int(code)])
    }

    /// Append an atom, builder style.
    pub fn arg(mut self, atom: impl Into<Atom>) -> Self {
        self.atoms.push(atom.into());
        self
    }

    /// Append an atom.
    pub fn push(&mut self, atom: impl Into<Atom>) {
        self.atoms.push(atom.into());
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// The atom at `index`, or a protocol violation if the message is too short.
    pub fn atom(&self, index: usize) -> Result<&Atom, WireError> {
        self.atoms.get(index).ok_or_else(|| {
            WireError::violation(format!(
                "{:?} message has {} atoms, wanted index {index}",
                self.kind,
                self.atoms.len()
            ))
        })
    }

    pub fn int(&self, index: usize) -> Result<i32, WireError> {
        let atom = self.atom(index)?;
        atom.as_int().ok_or_else(|| mismatch(index, "int", atom))
    }

    pub fn string(&self, index: usize) -> Result<&str, WireError> {
        let atom = self.atom(index)?;
        atom.as_str().ok_or_else(|| mismatch(index, "string", atom))
    }

    pub fn bool(&self, index: usize) -> Result<bool, WireError> {
        let atom = self.atom(index)?;
        atom.as_bool().ok_or_else(|| mismatch(index, "bool", atom))
    }

    pub fn handle(&self, index: usize) -> Result<Handle, WireError> {
        let atom = self.atom(index)?;
        atom.as_handle().ok_or_else(|| mismatch(index, "handle", atom))
    }
}

fn mismatch(index: usize, wanted: &str, got: &Atom) -> WireError {
    WireError::violation(format!(
        "atom {index}: expected {wanted}, found {}",
        got.type_name()
    ))
}
