//! Opening sessions.

use std::time::Duration;

use ssj_wire::Transport;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::error::SessionError;
use crate::notify::NotificationSink;
use crate::session::{Session, SessionId};

/// Knobs applied to every session a factory opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Limit on opening the TCP connection.
    pub connect_timeout: Duration,
    /// Limit on reading the greeting and running the setup requests.
    pub handshake_timeout: Duration,
    /// How long `detach` waits for the debuggee to confirm.
    pub detach_timeout: Duration,
    /// Text the engine overlays on screen while a debugger is attached.
    pub watermark_text: String,
    /// Watermark color as `0xRRGGBBAA`.
    pub watermark_color: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(5),
            detach_timeout: Duration::from_secs(5),
            watermark_text: "ssj".into(),
            watermark_color: 0xFF_FF_00_FF,
        }
    }
}

/// Creates sessions and hands out their ids.
#[derive(Debug)]
pub struct SessionFactory {
    settings: SessionSettings,
    next_id: u32,
}

impl SessionFactory {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            next_id: 1,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Dial `host:port` and attach to the debuggee listening there.
    pub async fn connect(
        &mut self,
        host: &str,
        port: u16,
        sink: impl NotificationSink + 'static,
    ) -> Result<Session<TcpStream>, SessionError> {
        let addr = format!("{host}:{port}");
        info!("connecting to {addr}");
        let limit = self.settings.connect_timeout;
        let transport = match timeout(limit, Transport::connect(host, port)).await {
            Ok(Ok(transport)) => transport,
            Ok(Err(source)) => return Err(SessionError::Connect { addr, source }),
            Err(_) => {
                warn!("no answer from {addr} within {limit:?}");
                return Err(SessionError::TimedOut(limit));
            }
        };
        self.handshake(transport, sink).await
    }

    /// Attach over an already-open stream.
    pub async fn attach<S>(
        &mut self,
        stream: S,
        peer: impl Into<String>,
        sink: impl NotificationSink + 'static,
    ) -> Result<Session<S>, SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.handshake(Transport::new(stream, peer), sink).await
    }

    async fn handshake<S>(
        &mut self,
        transport: Transport<S>,
        sink: impl NotificationSink + 'static,
    ) -> Result<Session<S>, SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let id = self.allocate_id();
        let limit = self.settings.handshake_timeout;
        let establish = Session::establish(id, transport, &self.settings, Box::new(sink));
        match timeout(limit, establish).await {
            Ok(result) => result,
            Err(_) => {
                warn!(session = %id, "handshake did not finish within {limit:?}");
                Err(SessionError::TimedOut(limit))
            }
        }
    }

    fn allocate_id(&mut self) -> SessionId {
        let id = SessionId(self.next_id);
        self.next_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::TracingSink;
    use crate::stub;

    #[test]
    fn settings_default_values() {
        let settings = SessionSettings::default();
        assert_eq!(settings.connect_timeout, Duration::from_secs(5));
        assert_eq!(settings.watermark_text, "ssj");
    }

    #[tokio::test]
    async fn factory_numbers_sessions() {
        let mut factory = SessionFactory::new(SessionSettings::default());
        let (a, _) = stub::spawn("Ki v1 one", |_, _| None);
        let (b, _) = stub::spawn("Ki v1 two", |_, _| None);

        let first = factory.attach(a, "a", TracingSink).await.unwrap();
        let second = factory.attach(b, "b", TracingSink).await.unwrap();
        assert_eq!(first.id(), SessionId(1));
        assert_eq!(second.id(), SessionId(2));
        assert_eq!(second.peer(), "b");
    }

    #[tokio::test]
    async fn factory_connect_refused() {
        // Bind then drop a listener so the port is known to be closed.
        let port = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut factory = SessionFactory::new(SessionSettings::default());
        let err = factory
            .connect("127.0.0.1", port, TracingSink)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Connect { .. }), "{err}");
    }

    #[tokio::test]
    async fn factory_connects_over_tcp() {
        use tokio::io::AsyncWriteExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"Ki v1 tcp game\n").await.unwrap();
            // Answer the two setup requests.
            let reply = ssj_wire::framer::encode_message(&ssj_wire::Message::reply());
            for _ in 0..2 {
                ssj_wire::framer::receive(&mut socket).await.unwrap();
                socket.write_all(&reply).await.unwrap();
            }
            // Hold the socket open until the client goes away.
            let _ = ssj_wire::framer::receive(&mut socket).await;
        });

        let mut factory = SessionFactory::new(SessionSettings::default());
        let session = factory.connect("127.0.0.1", port, TracingSink).await.unwrap();
        assert!(session.is_attached());
        assert_eq!(session.peer(), format!("127.0.0.1:{port}"));
        assert_eq!(session.title(), "tcp game");
    }
}
