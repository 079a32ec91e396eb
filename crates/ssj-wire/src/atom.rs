//! Atom codec: single self-describing values on the wire.
//!
//! Every atom starts with a lead byte. Most lead bytes are enumerated tags
//! (see [`tag`]), but three open ranges pack small payloads directly into
//! the lead byte:
//!
//! ```text
//!   0x60..=0x7F  string of (lead - 0x60) bytes
//!   0x80..=0xBF  integer (lead - 0x80)
//!   0xC0..=0xFF  integer ((lead - 0xC0) << 8) + next byte + 64
//! ```

use std::fmt;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::WireError;

/// Lead byte values.
pub mod tag {
    pub const EOM: u8 = 0x00;
    pub const REQ: u8 = 0x01;
    pub const REP: u8 = 0x02;
    pub const ERR: u8 = 0x03;
    pub const NFY: u8 = 0x04;
    pub const INT: u8 = 0x10;
    pub const STRING32: u8 = 0x11;
    pub const STRING16: u8 = 0x12;
    pub const BUFFER32: u8 = 0x13;
    pub const BUFFER16: u8 = 0x14;
    pub const UNUSED: u8 = 0x15;
    pub const UNDEFINED: u8 = 0x16;
    pub const NULL: u8 = 0x17;
    pub const TRUE: u8 = 0x18;
    pub const FALSE: u8 = 0x19;
    pub const FLOAT: u8 = 0x1A;
    pub const HANDLE: u8 = 0x1E;
    /// Base of the short string range.
    pub const SHORT_STRING: u8 = 0x60;
    /// Base of the single-byte integer range.
    pub const SHORT_INT: u8 = 0x80;
    /// Base of the two-byte integer range.
    pub const MEDIUM_INT: u8 = 0xC0;
}

/// Largest integer carried in a single lead byte.
pub const SHORT_INT_MAX: i32 = 63;
/// Smallest integer carried in the two-byte form.
pub const MEDIUM_INT_MIN: i32 = 64;
/// Largest integer carried in the two-byte form.
pub const MEDIUM_INT_MAX: i32 = MEDIUM_INT_MIN + 0x3FFF;
/// Longest string carried with its length in the lead byte.
pub const SHORT_STRING_MAX: usize = 31;

/// Upper bound on a declared string or buffer length. Anything larger means
/// the stream is out of sync.
pub const MAX_PAYLOAD_LEN: usize = 64 * 1024 * 1024;

/// An opaque reference to a live object in the debuggee's heap.
///
/// Handles are lookup keys into the debuggee's own table. They carry no
/// ownership and can only be resolved by sending further requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub u64);

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// One tagged value on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    /// End-of-message marker.
    Eom,
    /// Lead atom of a request.
    Request,
    /// Lead atom of a successful reply.
    Reply,
    /// Lead atom of an error reply.
    Error,
    /// Lead atom of a notification.
    Notify,
    Int(i32),
    Float(f64),
    Bool(bool),
    Null,
    Undefined,
    /// A hole in a sparse array or an unused stack slot.
    Unused,
    String(String),
    Buffer(Vec<u8>),
    Handle(Handle),
}

impl Atom {
    /// Whether this atom is a framing marker rather than a value.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            Atom::Eom | Atom::Request | Atom::Reply | Atom::Error | Atom::Notify
        )
    }

    /// Short name of the atom's type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Atom::Eom => "eom",
            Atom::Request => "request",
            Atom::Reply => "reply",
            Atom::Error => "error",
            Atom::Notify => "notify",
            Atom::Int(_) => "int",
            Atom::Float(_) => "float",
            Atom::Bool(_) => "bool",
            Atom::Null => "null",
            Atom::Undefined => "undefined",
            Atom::Unused => "unused",
            Atom::String(_) => "string",
            Atom::Buffer(_) => "buffer",
            Atom::Handle(_) => "handle",
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Atom::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Atom::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Atom::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<Handle> {
        match self {
            Atom::Handle(h) => Some(*h),
            _ => None,
        }
    }

    /// Append the wire form of this atom to `buf`.
    ///
    /// The encoder always picks the most compact form: small integers and
    /// short strings fold their payload into the lead byte.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            Atom::Eom => buf.push(tag::EOM),
            Atom::Request => buf.push(tag::REQ),
            Atom::Reply => buf.push(tag::REP),
            Atom::Error => buf.push(tag::ERR),
            Atom::Notify => buf.push(tag::NFY),
            Atom::Int(value) => encode_int(*value, buf),
            Atom::Float(value) => {
                buf.push(tag::FLOAT);
                buf.extend_from_slice(&value.to_le_bytes());
            }
            Atom::Bool(true) => buf.push(tag::TRUE),
            Atom::Bool(false) => buf.push(tag::FALSE),
            Atom::Null => buf.push(tag::NULL),
            Atom::Undefined => buf.push(tag::UNDEFINED),
            Atom::Unused => buf.push(tag::UNUSED),
            Atom::String(text) => {
                let bytes = text.as_bytes();
                if bytes.len() <= SHORT_STRING_MAX {
                    buf.push(tag::SHORT_STRING + bytes.len() as u8);
                    buf.extend_from_slice(bytes);
                } else {
                    encode_sized(tag::STRING16, tag::STRING32, bytes, buf);
                }
            }
            Atom::Buffer(bytes) => encode_sized(tag::BUFFER16, tag::BUFFER32, bytes, buf),
            Atom::Handle(Handle(value)) => {
                buf.push(tag::HANDLE);
                match u32::try_from(*value) {
                    Ok(narrow) => {
                        buf.push(4);
                        buf.extend_from_slice(&narrow.to_be_bytes());
                    }
                    Err(_) => {
                        buf.push(8);
                        buf.extend_from_slice(&value.to_be_bytes());
                    }
                }
            }
        }
    }

    /// Encode this atom into a fresh byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf
    }

    /// Read exactly one atom from `reader`.
    ///
    /// A stream that ends before the atom is complete yields
    /// [`WireError::TransportLost`]; a lead byte outside the enumerated tags
    /// and the short-form ranges yields [`WireError::ProtocolViolation`].
    pub async fn decode<R>(reader: &mut R) -> Result<Atom, WireError>
    where
        R: AsyncRead + Unpin,
    {
        let lead = reader.read_u8().await?;
        let atom = match lead {
            tag::EOM => Atom::Eom,
            tag::REQ => Atom::Request,
            tag::REP => Atom::Reply,
            tag::ERR => Atom::Error,
            tag::NFY => Atom::Notify,
            tag::INT => Atom::Int(reader.read_i32().await?),
            tag::STRING32 => {
                let len = reader.read_u32().await? as usize;
                Atom::String(read_string(reader, len).await?)
            }
            tag::STRING16 => {
                let len = reader.read_u16().await? as usize;
                Atom::String(read_string(reader, len).await?)
            }
            tag::BUFFER32 => {
                let len = reader.read_u32().await? as usize;
                Atom::Buffer(read_payload(reader, len).await?)
            }
            tag::BUFFER16 => {
                let len = reader.read_u16().await? as usize;
                Atom::Buffer(read_payload(reader, len).await?)
            }
            tag::UNUSED => Atom::Unused,
            tag::UNDEFINED => Atom::Undefined,
            tag::NULL => Atom::Null,
            tag::TRUE => Atom::Bool(true),
            tag::FALSE => Atom::Bool(false),
            tag::FLOAT => {
                let mut bytes = [0u8; 8];
                reader.read_exact(&mut bytes).await?;
                Atom::Float(f64::from_le_bytes(bytes))
            }
            tag::HANDLE => {
                let size = reader.read_u8().await? as usize;
                if size == 0 || size > 8 {
                    return Err(WireError::violation(format!(
                        "handle size {size} out of range 1..=8"
                    )));
                }
                let mut bytes = [0u8; 8];
                reader.read_exact(&mut bytes[..size]).await?;
                let value = bytes[..size]
                    .iter()
                    .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
                Atom::Handle(Handle(value))
            }
            0x60..=0x7F => {
                let len = (lead - tag::SHORT_STRING) as usize;
                Atom::String(read_string(reader, len).await?)
            }
            0x80..=0xBF => Atom::Int(i32::from(lead - tag::SHORT_INT)),
            0xC0..=0xFF => {
                let trail = reader.read_u8().await?;
                let high = i32::from(lead - tag::MEDIUM_INT);
                Atom::Int((high << 8) + i32::from(trail) + MEDIUM_INT_MIN)
            }
            other => {
                return Err(WireError::violation(format!(
                    "unknown atom tag 0x{other:02X}"
                )))
            }
        };
        Ok(atom)
    }
}

fn encode_int(value: i32, buf: &mut Vec<u8>) {
    match value {
        0..=SHORT_INT_MAX => buf.push(tag::SHORT_INT + value as u8),
        MEDIUM_INT_MIN..=MEDIUM_INT_MAX => {
            let biased = (value - MEDIUM_INT_MIN) as u16;
            buf.push(tag::MEDIUM_INT + (biased >> 8) as u8);
            buf.push((biased & 0xFF) as u8);
        }
        _ => {
            buf.push(tag::INT);
            buf.extend_from_slice(&value.to_be_bytes());
        }
    }
}

/// Write a length-prefixed payload, choosing the 16-bit prefix when it fits.
fn encode_sized(tag16: u8, tag32: u8, bytes: &[u8], buf: &mut Vec<u8>) {
    // A u32 length prefix is the widest form the protocol has.
    let bytes = &bytes[..bytes.len().min(u32::MAX as usize)];
    match u16::try_from(bytes.len()) {
        Ok(len) => {
            buf.push(tag16);
            buf.extend_from_slice(&len.to_be_bytes());
        }
        Err(_) => {
            buf.push(tag32);
            buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        }
    }
    buf.extend_from_slice(bytes);
}

async fn read_payload<R>(reader: &mut R, len: usize) -> Result<Vec<u8>, WireError>
where
    R: AsyncRead + Unpin,
{
    if len > MAX_PAYLOAD_LEN {
        return Err(WireError::violation(format!(
            "declared length {len} exceeds {MAX_PAYLOAD_LEN} bytes"
        )));
    }
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes).await?;
    Ok(bytes)
}

async fn read_string<R>(reader: &mut R, len: usize) -> Result<String, WireError>
where
    R: AsyncRead + Unpin,
{
    let bytes = read_payload(reader, len).await?;
    String::from_utf8(bytes).map_err(|_| WireError::violation("string is not UTF-8"))
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Eom => f.write_str("<eom>"),
            Atom::Request => f.write_str("<req>"),
            Atom::Reply => f.write_str("<rep>"),
            Atom::Error => f.write_str("<err>"),
            Atom::Notify => f.write_str("<nfy>"),
            Atom::Int(v) => write!(f, "{v}"),
            Atom::Float(v) if v.is_nan() => f.write_str("NaN"),
            Atom::Float(v) if v.is_infinite() => {
                f.write_str(if *v > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Atom::Float(v) => write!(f, "{v}"),
            Atom::Bool(b) => write!(f, "{b}"),
            Atom::Null => f.write_str("null"),
            Atom::Undefined => f.write_str("undefined"),
            Atom::Unused => f.write_str("<unused>"),
            Atom::String(s) => write!(f, "{s:?}"),
            Atom::Buffer(bytes) => write!(f, "{{buf:{} bytes}}", bytes.len()),
            Atom::Handle(h) => write!(f, "{{obj:{h}}}"),
        }
    }
}

impl From<i32> for Atom {
    fn from(value: i32) -> Self {
        Atom::Int(value)
    }
}

impl From<f64> for Atom {
    fn from(value: f64) -> Self {
        Atom::Float(value)
    }
}

impl From<bool> for Atom {
    fn from(value: bool) -> Self {
        Atom::Bool(value)
    }
}

impl From<&str> for Atom {
    fn from(value: &str) -> Self {
        Atom::String(value.to_owned())
    }
}

impl From<String> for Atom {
    fn from(value: String) -> Self {
        Atom::String(value)
    }
}

impl From<Handle> for Atom {
    fn from(value: Handle) -> Self {
        Atom::Handle(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn decode_bytes(bytes: &[u8]) -> Result<Atom, WireError> {
        let mut src = bytes;
        Atom::decode(&mut src).await
    }

    #[tokio::test]
    async fn atom_int_tiers_at_boundaries() {
        let cases: [(i32, Vec<u8>); 5] = [
            (0, vec![0x80]),
            (63, vec![0xBF]),
            (64, vec![0xC0, 0x00]),
            (16447, vec![0xFF, 0xFF]),
            (16448, vec![0x10, 0x00, 0x00, 0x40, 0x40]),
        ];
        for (value, expected) in cases {
            let bytes = Atom::Int(value).to_bytes();
            assert_eq!(bytes, expected, "encoding of {value}");
            assert_eq!(decode_bytes(&bytes).await.unwrap(), Atom::Int(value));
        }
    }

    #[tokio::test]
    async fn atom_negative_int_uses_full_form() {
        let bytes = Atom::Int(-1).to_bytes();
        assert_eq!(bytes, vec![0x10, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(decode_bytes(&bytes).await.unwrap(), Atom::Int(-1));

        let bytes = Atom::Int(i32::MIN).to_bytes();
        assert_eq!(decode_bytes(&bytes).await.unwrap(), Atom::Int(i32::MIN));
    }

    #[tokio::test]
    async fn atom_float_is_little_endian_on_wire() {
        let bytes = Atom::Float(1.0).to_bytes();
        assert_eq!(
            bytes,
            vec![0x1A, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xF0, 0x3F]
        );
        assert_eq!(decode_bytes(&bytes).await.unwrap(), Atom::Float(1.0));

        let bytes = Atom::Float(-2.5e-3).to_bytes();
        assert_eq!(decode_bytes(&bytes).await.unwrap(), Atom::Float(-2.5e-3));
    }

    #[tokio::test]
    async fn atom_string_forms() {
        let short = Atom::from("main.js");
        let bytes = short.to_bytes();
        assert_eq!(bytes[0], 0x60 + 7);
        assert_eq!(&bytes[1..], b"main.js");
        assert_eq!(decode_bytes(&bytes).await.unwrap(), short);

        let empty = Atom::from("");
        assert_eq!(empty.to_bytes(), vec![0x60]);
        assert_eq!(decode_bytes(&[0x60]).await.unwrap(), empty);

        let edge = Atom::String("x".repeat(31));
        assert_eq!(edge.to_bytes()[0], 0x7F);

        let medium = Atom::String("y".repeat(32));
        let bytes = medium.to_bytes();
        assert_eq!(&bytes[..3], &[0x12, 0x00, 0x20]);
        assert_eq!(decode_bytes(&bytes).await.unwrap(), medium);

        let long = Atom::String("z".repeat(70_000));
        let bytes = long.to_bytes();
        assert_eq!(bytes[0], 0x11);
        assert_eq!(&bytes[1..5], &70_000u32.to_be_bytes());
        assert_eq!(decode_bytes(&bytes).await.unwrap(), long);
    }

    #[tokio::test]
    async fn atom_string_is_utf8() {
        let atom = Atom::from("h\u{e9}llo \u{2603}");
        let bytes = atom.to_bytes();
        assert_eq!(bytes[0], 0x60 + "h\u{e9}llo \u{2603}".len() as u8);
        assert_eq!(decode_bytes(&bytes).await.unwrap(), atom);
    }

    #[tokio::test]
    async fn atom_string_rejects_invalid_utf8() {
        let err = decode_bytes(&[0x62, 0xC3, 0x28]).await.unwrap_err();
        assert!(matches!(err, WireError::ProtocolViolation(ref d) if d.contains("UTF-8")));

        let err = decode_bytes(&[0x12, 0x00, 0x01, 0xFF]).await.unwrap_err();
        assert!(matches!(err, WireError::ProtocolViolation(_)));
    }

    #[tokio::test]
    async fn atom_buffer_forms() {
        let small = Atom::Buffer(vec![1, 2, 3]);
        let bytes = small.to_bytes();
        assert_eq!(bytes, vec![0x14, 0x00, 0x03, 1, 2, 3]);
        assert_eq!(decode_bytes(&bytes).await.unwrap(), small);

        let large = Atom::Buffer(vec![7; 70_000]);
        let bytes = large.to_bytes();
        assert_eq!(bytes[0], 0x13);
        assert_eq!(decode_bytes(&bytes).await.unwrap(), large);
    }

    #[tokio::test]
    async fn atom_handle_forms() {
        let narrow = Atom::Handle(Handle(0xBEEF));
        let bytes = narrow.to_bytes();
        assert_eq!(bytes, vec![0x1E, 4, 0x00, 0x00, 0xBE, 0xEF]);
        assert_eq!(decode_bytes(&bytes).await.unwrap(), narrow);

        let wide = Atom::Handle(Handle(0x1_0000_0000));
        let bytes = wide.to_bytes();
        assert_eq!(bytes[1], 8);
        assert_eq!(decode_bytes(&bytes).await.unwrap(), wide);

        // Peers may pick any size from 1 to 8.
        let two_byte = [0x1E, 2, 0x12, 0x34];
        assert_eq!(
            decode_bytes(&two_byte).await.unwrap(),
            Atom::Handle(Handle(0x1234))
        );
    }

    #[tokio::test]
    async fn atom_handle_bad_size_is_violation() {
        for bytes in [vec![0x1E, 0], vec![0x1E, 9, 0, 0, 0, 0, 0, 0, 0, 0, 0]] {
            let err = decode_bytes(&bytes).await.unwrap_err();
            assert!(matches!(err, WireError::ProtocolViolation(_)), "got: {err}");
        }
    }

    #[tokio::test]
    async fn atom_simple_tags() {
        for atom in [
            Atom::Eom,
            Atom::Request,
            Atom::Reply,
            Atom::Error,
            Atom::Notify,
            Atom::Bool(true),
            Atom::Bool(false),
            Atom::Null,
            Atom::Undefined,
            Atom::Unused,
        ] {
            let bytes = atom.to_bytes();
            assert_eq!(bytes.len(), 1);
            assert_eq!(decode_bytes(&bytes).await.unwrap(), atom);
        }
    }

    #[tokio::test]
    async fn atom_unknown_tags_are_violations() {
        for lead in [0x05u8, 0x0F, 0x1B, 0x1C, 0x1D, 0x1F, 0x20, 0x5F] {
            let err = decode_bytes(&[lead, 0, 0, 0, 0]).await.unwrap_err();
            assert!(
                matches!(err, WireError::ProtocolViolation(_)),
                "lead 0x{lead:02X} gave {err}"
            );
        }
    }

    #[tokio::test]
    async fn atom_truncated_stream_never_yields_value() {
        let atoms = [
            Atom::Int(1000),
            Atom::Int(-5),
            Atom::Float(3.25),
            Atom::from("hello"),
            Atom::String("w".repeat(40)),
            Atom::Buffer(vec![9; 10]),
            Atom::Handle(Handle(42)),
        ];
        for atom in atoms {
            let bytes = atom.to_bytes();
            for n in 0..bytes.len() {
                let err = decode_bytes(&bytes[..n]).await.unwrap_err();
                assert!(
                    matches!(
                        err,
                        WireError::TransportLost(_) | WireError::ProtocolViolation(_)
                    ),
                    "{atom:?} truncated to {n} bytes gave {err}"
                );
            }
        }
    }

    #[tokio::test]
    async fn atom_oversized_length_is_violation() {
        let bytes = [0x13, 0xFF, 0xFF, 0xFF, 0xFF];
        let err = decode_bytes(&bytes).await.unwrap_err();
        assert!(matches!(err, WireError::ProtocolViolation(_)));
    }

    #[test]
    fn atom_display() {
        assert_eq!(Atom::Int(42).to_string(), "42");
        assert_eq!(Atom::Float(1.5).to_string(), "1.5");
        assert_eq!(Atom::Float(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Atom::Float(f64::NAN).to_string(), "NaN");
        assert_eq!(Atom::from("hi").to_string(), "\"hi\"");
        assert_eq!(Atom::Bool(false).to_string(), "false");
        assert_eq!(Atom::Undefined.to_string(), "undefined");
        assert_eq!(Atom::Handle(Handle(0x1f)).to_string(), "{obj:0x1f}");
        assert_eq!(Atom::Buffer(vec![0; 4]).to_string(), "{buf:4 bytes}");
    }

    #[test]
    fn atom_accessors() {
        assert_eq!(Atom::Int(3).as_int(), Some(3));
        assert_eq!(Atom::from("a").as_int(), None);
        assert_eq!(Atom::from("a").as_str(), Some("a"));
        assert_eq!(Atom::Bool(true).as_bool(), Some(true));
        assert_eq!(Atom::Handle(Handle(9)).as_handle(), Some(Handle(9)));
        assert!(Atom::Notify.is_framing());
        assert!(!Atom::Null.is_framing());
        assert_eq!(Atom::Unused.type_name(), "unused");
    }
}
