//! Greeting line parsing and the identity data fetched during setup.

use std::sync::OnceLock;

use regex::Regex;
use ssj_wire::{Atom, Message};

use crate::error::SessionError;
use crate::protocol::{PROTOCOL_NAME, PROTOCOL_VERSION};

/// Longest greeting line accepted, terminator included.
pub const MAX_GREETING_LEN: usize = 1024;

/// The debuggee's greeting: `<protocol-name> v<version> <description>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    pub protocol: String,
    pub version: u32,
    pub description: String,
}

fn greeting_regex() -> &'static Regex {
    static GREETING: OnceLock<Regex> = OnceLock::new();
    GREETING.get_or_init(|| {
        Regex::new(r"^(\S+) v(\d+) (.+)$").expect("greeting regex is valid")
    })
}

/// Parse and check a greeting line (without its newline).
///
/// The protocol name must be [`PROTOCOL_NAME`] and the version must lie in
/// `1..=PROTOCOL_VERSION`.
pub fn parse_greeting(line: &str) -> Result<Greeting, SessionError> {
    let caps = greeting_regex()
        .captures(line)
        .ok_or_else(|| SessionError::HandshakeFailed(format!("malformed greeting {line:?}")))?;

    let protocol = &caps[1];
    if protocol != PROTOCOL_NAME {
        return Err(SessionError::HandshakeFailed(format!(
            "expected protocol {PROTOCOL_NAME}, debuggee speaks {protocol}"
        )));
    }
    let version: u32 = caps[2]
        .parse()
        .map_err(|e| SessionError::HandshakeFailed(format!("bad version {:?}: {e}", &caps[2])))?;
    if version == 0 || version > PROTOCOL_VERSION {
        return Err(SessionError::HandshakeFailed(format!(
            "unsupported protocol version {version} (supported 1..={PROTOCOL_VERSION})"
        )));
    }

    Ok(Greeting {
        protocol: protocol.to_owned(),
        version,
        description: caps[3].trim().to_owned(),
    })
}

/// Identity of the game being debugged, from the `GameInfo` reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameInfo {
    pub title: String,
    pub author: String,
    pub summary: String,
    /// Screen resolution, when reported.
    pub resolution: Option<(u32, u32)>,
}

impl GameInfo {
    /// Decode a `GameInfo` reply. Older engines send fewer fields; anything
    /// missing is left empty.
    pub fn from_reply(reply: &Message) -> Self {
        let text = |i: usize| {
            reply
                .atoms()
                .get(i)
                .and_then(Atom::as_str)
                .unwrap_or_default()
                .to_owned()
        };
        let dimension = |i: usize| {
            reply
                .atoms()
                .get(i)
                .and_then(Atom::as_int)
                .and_then(|v| u32::try_from(v).ok())
        };
        Self {
            title: text(0),
            author: text(1),
            summary: text(2),
            resolution: dimension(3).zip(dimension(4)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_parses_fields() {
        let g = parse_greeting("Ki v1 demo-game").unwrap();
        assert_eq!(g.protocol, "Ki");
        assert_eq!(g.version, 1);
        assert_eq!(g.description, "demo-game");
    }

    #[test]
    fn greeting_description_may_contain_spaces() {
        let g = parse_greeting("Ki v1 minisphere 4.3 (engine)").unwrap();
        assert_eq!(g.description, "minisphere 4.3 (engine)");
    }

    #[test]
    fn greeting_rejects_wrong_protocol() {
        let err = parse_greeting("Duk v1 demo").unwrap_err();
        assert!(matches!(err, SessionError::HandshakeFailed(_)));
        assert!(err.to_string().contains("Duk"), "got: {err}");
    }

    #[test]
    fn greeting_rejects_bad_versions() {
        for line in ["Ki vX demo", "Ki v0 demo", "Ki v2 demo", "Ki v99999999999 demo"] {
            let err = parse_greeting(line).unwrap_err();
            assert!(matches!(err, SessionError::HandshakeFailed(_)), "{line}: {err}");
        }
    }

    #[test]
    fn greeting_rejects_malformed_lines() {
        for line in ["", "Ki", "Ki v1", "Ki 1 demo", "HTTP/1.1 200 OK"] {
            assert!(parse_greeting(line).is_err(), "{line:?} should be rejected");
        }
    }

    #[test]
    fn game_info_full_reply() {
        let reply = Message::reply()
            .arg("Spectacles")
            .arg("Fat Cerberus")
            .arg("an RPG")
            .arg(320)
            .arg(240);
        let info = GameInfo::from_reply(&reply);
        assert_eq!(info.title, "Spectacles");
        assert_eq!(info.author, "Fat Cerberus");
        assert_eq!(info.summary, "an RPG");
        assert_eq!(info.resolution, Some((320, 240)));
    }

    #[test]
    fn game_info_empty_reply_defaults() {
        let info = GameInfo::from_reply(&Message::reply());
        assert_eq!(info, GameInfo::default());
    }
}
