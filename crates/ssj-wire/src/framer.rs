//! Message framing: lead atom, payload atoms, end-of-message marker.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::atom::Atom;
use crate::error::WireError;
use crate::message::{Message, MessageKind};

/// Encode a message into its complete wire form, including the trailing
/// end-of-message marker.
pub fn encode_message(message: &Message) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 + message.len() * 4);
    if let Some(lead) = message.kind().lead_atom() {
        lead.encode(&mut buf);
    }
    for atom in message.atoms() {
        atom.encode(&mut buf);
    }
    Atom::Eom.encode(&mut buf);
    buf
}

/// Write one message and flush it.
pub async fn send<W>(writer: &mut W, message: &Message) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    let bytes = encode_message(message);
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Read atoms until an end-of-message marker and classify the result by its
/// lead atom.
///
/// This waits for as long as the peer takes to finish the message. Callers
/// that need a deadline wrap the whole call in a timeout.
pub async fn receive<R>(reader: &mut R) -> Result<Message, WireError>
where
    R: AsyncRead + Unpin,
{
    let (kind, mut atoms) = match Atom::decode(reader).await? {
        Atom::Request => (MessageKind::Request, Vec::new()),
        Atom::Reply => (MessageKind::Reply, Vec::new()),
        Atom::Error => (MessageKind::Error, Vec::new()),
        Atom::Notify => (MessageKind::Notify, Vec::new()),
        Atom::Eom => return Ok(Message::new(MessageKind::Unknown)),
        other => (MessageKind::Unknown, vec![other]),
    };
    loop {
        match Atom::decode(reader).await? {
            Atom::Eom => break,
            atom if atom.is_framing() => {
                return Err(WireError::violation(format!(
                    "{} marker inside a {kind:?} message",
                    atom.type_name()
                )));
            }
            atom => atoms.push(atom),
        }
    }
    Ok(Message::with_atoms(kind, atoms))
}
