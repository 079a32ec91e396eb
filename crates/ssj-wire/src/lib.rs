//! ssj-wire: the Ki debug protocol on the wire.
//!
//! This crate implements the atom codec, message framing, and the byte
//! stream transport used by the debugger to talk to a running engine.

pub mod atom;
pub mod error;
pub mod framer;
pub mod message;
pub mod transport;

// Re-export key types for convenience.
pub use atom::{Atom, Handle};
pub use error::WireError;
pub use message::{Message, MessageKind};
pub use transport::Transport;
