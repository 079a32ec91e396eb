//! The session engine: one attached debuggee.
//!
//! A [`Session`] owns its transport and keeps exactly one request in flight.
//! While it waits for a reply, notifications that arrive first are applied
//! to the session state and forwarded to the notification sink in arrival
//! order.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use ssj_wire::{Atom, Handle, Message, MessageKind, Transport, WireError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::backtrace::Backtrace;
use crate::breakpoint::{self, Breakpoint, BreakpointTable};
use crate::error::{RemoteError, SessionError};
use crate::factory::SessionSettings;
use crate::handshake::{parse_greeting, GameInfo, Greeting, MAX_GREETING_LEN};
use crate::notify::{Notification, NotificationSink};
use crate::object::{Evaluation, Property, Variable};
use crate::protocol::{Command, Location, ResumeOp};
use crate::source::{SourceCache, SourceListing};

/// Identifies a session within one debugger process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether the session still talks to its debuggee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachState {
    Attached,
    /// Terminal. Nothing is sent once a session gets here.
    Detached,
}

/// Whether the debuggee is executing script code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Paused,
}

/// A debugging session with one remote inferior.
pub struct Session<S = TcpStream> {
    id: SessionId,
    transport: Transport<S>,
    attach_state: AttachState,
    run_state: RunState,
    greeting: Greeting,
    game: GameInfo,
    breakpoints: BreakpointTable,
    /// Valid only while paused; dropped whenever execution continues.
    call_stack: Option<Backtrace>,
    sources: SourceCache,
    pause_location: Option<Location>,
    detach_timeout: Duration,
    sink: Box<dyn NotificationSink>,
}

impl<S> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("attach_state", &self.attach_state)
            .field("run_state", &self.run_state)
            .field("greeting", &self.greeting)
            .field("breakpoints", &self.breakpoints.len())
            .finish_non_exhaustive()
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Read the greeting and run the setup requests.
    ///
    /// On any failure the transport is closed and no session is returned.
    pub(crate) async fn establish(
        id: SessionId,
        mut transport: Transport<S>,
        settings: &SessionSettings,
        sink: Box<dyn NotificationSink>,
    ) -> Result<Self, SessionError> {
        let greeting = match transport.read_line(MAX_GREETING_LEN).await {
            Ok(line) => parse_greeting(&line),
            Err(e) => Err(SessionError::HandshakeFailed(format!(
                "no greeting from {}: {e}",
                transport.peer()
            ))),
        };
        let greeting = match greeting {
            Ok(greeting) => greeting,
            Err(e) => {
                transport.close().await;
                return Err(e);
            }
        };
        info!(
            session = %id,
            peer = transport.peer(),
            version = greeting.version,
            "debuggee says {:?}",
            greeting.description
        );

        let mut session = Session {
            id,
            transport,
            attach_state: AttachState::Attached,
            run_state: RunState::Running,
            greeting,
            game: GameInfo::default(),
            breakpoints: BreakpointTable::new(),
            call_stack: None,
            sources: SourceCache::new(),
            pause_location: None,
            detach_timeout: settings.detach_timeout,
            sink,
        };
        if let Err(e) = session.setup(settings).await {
            session.mark_detached();
            session.transport.close().await;
            return Err(e);
        }
        Ok(session)
    }

    async fn setup(&mut self, settings: &SessionSettings) -> Result<(), SessionError> {
        let watermark = Message::request(Command::SetWatermark.code())
            .arg(settings.watermark_text.as_str())
            .arg(settings.watermark_color as i32);
        self.request(watermark).await.map_err(setup_failure)?;

        let reply = self
            .request(Message::request(Command::GameInfo.code()))
            .await
            .map_err(setup_failure)?;
        self.game = GameInfo::from_reply(&reply);
        debug!(session = %self.id, game = ?self.game, "setup complete");
        Ok(())
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer(&self) -> &str {
        self.transport.peer()
    }

    pub fn is_attached(&self) -> bool {
        self.attach_state == AttachState::Attached
    }

    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }

    pub fn attach_state(&self) -> AttachState {
        self.attach_state
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn greeting(&self) -> &Greeting {
        &self.greeting
    }

    /// Protocol version the debuggee announced.
    pub fn protocol_version(&self) -> u32 {
        self.greeting.version
    }

    pub fn game_info(&self) -> &GameInfo {
        &self.game
    }

    /// The game title, falling back to the greeting's description for
    /// engines that report no title.
    pub fn title(&self) -> &str {
        if self.game.title.is_empty() {
            &self.greeting.description
        } else {
            &self.game.title
        }
    }

    /// Breakpoints the debuggee has confirmed during this session.
    pub fn breakpoints(&self) -> &BreakpointTable {
        &self.breakpoints
    }

    /// Where the debuggee last stopped, if it reported a position.
    pub fn pause_location(&self) -> Option<&Location> {
        self.pause_location.as_ref()
    }

    /// Send one request and wait for its reply.
    ///
    /// Notifications that arrive first are dispatched in order. An `Error`
    /// answer becomes [`SessionError::Remote`] and leaves the session
    /// attached; transport and decode failures detach it.
    pub async fn request(&mut self, message: Message) -> Result<Message, SessionError> {
        self.require_attached()?;
        let command = message.int(0).ok().and_then(Command::from_code);
        debug!(session = %self.id, ?command, "request");
        if let Err(e) = self.transport.send(&message).await {
            return Err(self.lose(e).await);
        }
        loop {
            let incoming = match self.transport.receive().await {
                Ok(incoming) => incoming,
                Err(e) => return Err(self.lose(e).await),
            };
            match incoming.kind() {
                MessageKind::Reply => return Ok(incoming),
                MessageKind::Error => {
                    let err = RemoteError::from_message(&incoming);
                    debug!(session = %self.id, ?command, "refused: {err}");
                    return Err(SessionError::Remote(err));
                }
                MessageKind::Notify => {
                    self.dispatch(&incoming);
                    if !self.is_attached() {
                        self.transport.close().await;
                        return Err(SessionError::Detached);
                    }
                }
                kind @ (MessageKind::Request | MessageKind::Unknown) => {
                    let err = WireError::violation(format!(
                        "{kind:?} message while waiting for a reply"
                    ));
                    return Err(self.lose(err).await);
                }
            }
        }
    }

    /// Receive and dispatch one message without sending anything.
    ///
    /// Waits until the debuggee sends something. A reply nobody asked for
    /// is logged and dropped.
    pub async fn update(&mut self) -> Result<(), SessionError> {
        self.require_attached()?;
        let incoming = match self.transport.receive().await {
            Ok(incoming) => incoming,
            Err(e) => return Err(self.lose(e).await),
        };
        match incoming.kind() {
            MessageKind::Notify => {
                self.dispatch(&incoming);
                if !self.is_attached() {
                    self.transport.close().await;
                }
            }
            kind @ (MessageKind::Reply | MessageKind::Error) => {
                warn!(session = %self.id, "discarding unsolicited {kind:?}");
            }
            kind @ (MessageKind::Request | MessageKind::Unknown) => {
                let err = WireError::violation(format!("unexpected {kind:?} message"));
                return Err(self.lose(err).await);
            }
        }
        Ok(())
    }

    /// Continue or step a paused debuggee, then wait for it to stop again.
    ///
    /// Returns once the debuggee pauses or the session detaches. If the
    /// debuggee refuses, the session stays paused.
    pub async fn resume(&mut self, op: ResumeOp) -> Result<(), SessionError> {
        self.require_paused()?;
        debug!(session = %self.id, ?op, "resume");
        // A Pause notification can beat the reply, so switch state first.
        self.enter_running();
        match self.request(Message::request(op.command().code())).await {
            Ok(_) => {}
            Err(SessionError::Remote(err)) => {
                self.run_state = RunState::Paused;
                return Err(SessionError::Remote(err));
            }
            Err(SessionError::Detached) => return Ok(()),
            Err(e) => return Err(e),
        }
        self.wait_for_pause().await
    }

    /// Ask a running debuggee to stop, and wait until it does.
    pub async fn pause(&mut self) -> Result<(), SessionError> {
        self.require_attached()?;
        if self.run_state == RunState::Paused {
            return Ok(());
        }
        match self.request(Message::request(Command::Pause.code())).await {
            Ok(_) => {}
            Err(SessionError::Detached) => return Ok(()),
            Err(e) => return Err(e),
        }
        self.wait_for_pause().await
    }

    async fn wait_for_pause(&mut self) -> Result<(), SessionError> {
        while self.is_attached() && self.run_state == RunState::Running {
            self.update().await?;
        }
        Ok(())
    }

    /// End the session.
    ///
    /// Sends a detach request and waits (bounded by the detach timeout) for
    /// the debuggee to confirm. The session is detached afterwards no
    /// matter how the exchange went.
    pub async fn detach(&mut self) -> Result<(), SessionError> {
        if self.is_attached() {
            info!(session = %self.id, "detaching");
            match self.request(Message::request(Command::Detach.code())).await {
                Ok(_) => {
                    let limit = self.detach_timeout;
                    let drain = async {
                        while self.is_attached() {
                            if self.update().await.is_err() {
                                break;
                            }
                        }
                    };
                    if tokio::time::timeout(limit, drain).await.is_err() {
                        warn!(session = %self.id, "debuggee did not confirm detach within {limit:?}");
                    }
                }
                Err(e) => debug!(session = %self.id, "detach request ended early: {e}"),
            }
        }
        self.mark_detached();
        self.transport.close().await;
        Ok(())
    }

    /// Current call stack, innermost frame first.
    ///
    /// Fetched once per pause and served from cache afterwards.
    pub async fn call_stack(&mut self) -> Result<Backtrace, SessionError> {
        self.require_paused()?;
        if let Some(stack) = &self.call_stack {
            return Ok(stack.clone());
        }
        let reply = self
            .request(Message::request(Command::InspectStack.code()))
            .await?;
        let stack = self.decoded(Backtrace::from_reply(&reply)).await?;
        self.call_stack = Some(stack.clone());
        Ok(stack)
    }

    /// Local variables of the frame at `frame` (0 = innermost).
    pub async fn locals(&mut self, frame: u32) -> Result<Vec<Variable>, SessionError> {
        self.require_paused()?;
        let request =
            Message::request(Command::InspectLocals.code()).arg(int_arg("frame", frame)?);
        let reply = self.request(request).await?;
        self.decoded(Variable::list_from_reply(&reply)).await
    }

    /// Evaluate `expression` in the scope of `frame`.
    ///
    /// A refusal from the debuggee comes back as an erroring evaluation
    /// rather than an `Err`.
    pub async fn evaluate(
        &mut self,
        expression: &str,
        frame: u32,
    ) -> Result<Evaluation, SessionError> {
        self.require_paused()?;
        let request = Message::request(Command::Eval.code())
            .arg(int_arg("frame", frame)?)
            .arg(expression);
        match self.request(request).await {
            Ok(reply) => self.decoded(Evaluation::from_reply(&reply)).await,
            Err(SessionError::Remote(err)) => Ok(Evaluation {
                value: Atom::String(err.message),
                is_error: true,
            }),
            Err(e) => Err(e),
        }
    }

    /// Properties of a live object. Internal properties are left out unless
    /// `show_all` is set.
    pub async fn object_properties(
        &mut self,
        handle: Handle,
        show_all: bool,
    ) -> Result<Vec<Property>, SessionError> {
        self.require_paused()?;
        let request = Message::request(Command::InspectObject.code()).arg(handle);
        let reply = self.request(request).await?;
        self.decoded(Property::list_from_reply(&reply, show_all)).await
    }

    /// Source text of `file`, downloaded on first use and cached for the
    /// rest of the session.
    pub async fn source(&mut self, file: &str) -> Result<Arc<SourceListing>, SessionError> {
        self.require_attached()?;
        if let Some(listing) = self.sources.get(file) {
            return Ok(listing);
        }
        let reply = self
            .request(Message::request(Command::Download.code()).arg(file))
            .await?;
        let listing = self.decoded(reply.string(0).map(SourceListing::new)).await?;
        debug!(session = %self.id, file, lines = listing.len(), "downloaded source");
        Ok(self.sources.insert(file, listing))
    }

    /// Set a breakpoint. Returns the handle the debuggee assigned.
    ///
    /// The table only changes once the debuggee confirms.
    pub async fn add_breakpoint(&mut self, file: &str, line: u32) -> Result<u32, SessionError> {
        let request = Message::request(Command::AddBreakpoint.code())
            .arg(file)
            .arg(int_arg("line", line)?);
        let reply = self.request(request).await?;
        let handle = self.decoded(reply.int(0).and_then(|h| {
            u32::try_from(h)
                .map_err(|_| WireError::violation(format!("negative breakpoint handle {h}")))
        }))
        .await?;
        self.breakpoints.insert(Breakpoint::new(handle, file, line));
        info!(session = %self.id, handle, "breakpoint set at {file}:{line}");
        Ok(handle)
    }

    /// Clear a breakpoint by handle.
    ///
    /// Returns `false` if the debuggee refused; the table is left alone in
    /// that case.
    pub async fn clear_breakpoint(&mut self, handle: u32) -> Result<bool, SessionError> {
        let request = Message::request(Command::DeleteBreakpoint.code())
            .arg(int_arg("breakpoint handle", handle)?);
        match self.request(request).await {
            Ok(_) => {
                self.breakpoints.remove(handle);
                Ok(true)
            }
            Err(SessionError::Remote(err)) => {
                debug!(session = %self.id, handle, "clear refused: {err}");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Breakpoints as the debuggee itself lists them.
    pub async fn remote_breakpoints(&mut self) -> Result<Vec<Location>, SessionError> {
        let reply = self
            .request(Message::request(Command::InspectBreakpoints.code()))
            .await?;
        self.decoded(breakpoint::locations_from_reply(&reply)).await
    }

    fn dispatch(&mut self, message: &Message) {
        let notification = match Notification::from_message(message) {
            Ok(notification) => notification,
            Err(e) => {
                warn!(session = %self.id, "ignoring notification: {e}");
                return;
            }
        };
        match &notification {
            Notification::Detach(reason) => {
                info!(session = %self.id, "debuggee detached: {reason}");
                self.mark_detached();
            }
            Notification::Pause { location } => {
                self.run_state = RunState::Paused;
                self.call_stack = None;
                self.pause_location = location.clone();
            }
            Notification::Resume => self.enter_running(),
            Notification::Log { .. } | Notification::Throw { .. } => {}
        }
        self.sink.notify(self.id, &notification);
    }

    /// Turn a malformed reply payload into a fatal protocol violation.
    async fn decoded<T>(&mut self, result: Result<T, WireError>) -> Result<T, SessionError> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => Err(self.lose(e).await),
        }
    }

    async fn lose(&mut self, err: WireError) -> SessionError {
        warn!(session = %self.id, "session lost: {err}");
        self.mark_detached();
        self.transport.close().await;
        err.into()
    }

    fn enter_running(&mut self) {
        self.run_state = RunState::Running;
        self.call_stack = None;
        self.pause_location = None;
    }

    fn mark_detached(&mut self) {
        self.attach_state = AttachState::Detached;
        self.call_stack = None;
        self.pause_location = None;
    }

    fn require_attached(&self) -> Result<(), SessionError> {
        match self.attach_state {
            AttachState::Attached => Ok(()),
            AttachState::Detached => Err(SessionError::Detached),
        }
    }

    fn require_paused(&self) -> Result<(), SessionError> {
        self.require_attached()?;
        match self.run_state {
            RunState::Paused => Ok(()),
            RunState::Running => Err(SessionError::NotPaused),
        }
    }
}

fn setup_failure(err: SessionError) -> SessionError {
    match err {
        SessionError::Remote(remote) => {
            SessionError::HandshakeFailed(format!("setup request refused: {remote}"))
        }
        SessionError::Detached => {
            SessionError::HandshakeFailed("debuggee detached during setup".into())
        }
        other => other,
    }
}

fn int_arg(what: &'static str, value: u32) -> Result<i32, SessionError> {
    i32::try_from(value).map_err(|_| SessionError::OutOfRange {
        what,
        value: value.into(),
    })
}
