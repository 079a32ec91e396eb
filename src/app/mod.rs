mod commands;
mod render;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use ssj_config::DisplayConfig;
use ssj_session::{
    Frame, Notification, NotificationSink, Session, SessionError, SessionId, TracingSink,
};

use self::commands::{parse_command, UserCommand};

/// Prints notifications on the console and mirrors them to the log.
pub(crate) struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn notify(&mut self, session: SessionId, notification: &Notification) {
        TracingSink.notify(session, notification);
        if let Some(text) = render::notification(notification) {
            println!("{text}");
        }
    }
}

/// The interactive front-end around one session.
pub(crate) struct App<S = TcpStream> {
    session: Session<S>,
    display: DisplayConfig,
}

impl<S> App<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(session: Session<S>, display: DisplayConfig) -> Self {
        Self { session, display }
    }

    /// Drive the session from stdin until it detaches.
    pub(crate) async fn run(&mut self) -> Result<()> {
        self.run_with(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    async fn run_with<R, W>(&mut self, input: R, mut out: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        say(&mut out, &render::banner(&self.session)).await?;

        let mut fresh_pause = true;
        while self.session.is_attached() {
            if self.session.is_running() {
                fresh_pause = true;
                if let Err(e) = self.session.update().await {
                    say(&mut out, &format!("error: {e}")).await?;
                }
                continue;
            }
            if fresh_pause {
                fresh_pause = false;
                match self.position().await {
                    Ok(Some(text)) => say(&mut out, &text).await?,
                    Ok(None) => {}
                    Err(e) => say(&mut out, &format!("error: {e}")).await?,
                }
                continue;
            }

            out.write_all(b"(ssj) ").await?;
            out.flush().await?;
            let Some(line) = lines.next_line().await? else {
                debug!("input closed, detaching");
                self.session.detach().await?;
                break;
            };
            let command = match parse_command(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    say(&mut out, &format!("{e:#}")).await?;
                    continue;
                }
            };
            if matches!(command, UserCommand::Resume(_)) {
                fresh_pause = true;
            }
            match self.execute(command).await {
                Ok(Some(text)) => say(&mut out, &text).await?,
                Ok(None) => {}
                Err(e) => say(&mut out, &format!("error: {e}")).await?,
            }
        }
        say(&mut out, "session ended").await?;
        Ok(())
    }

    async fn execute(&mut self, command: UserCommand) -> Result<Option<String>, SessionError> {
        let text = match command {
            UserCommand::Resume(op) => {
                self.session.resume(op).await?;
                return Ok(None);
            }
            UserCommand::Backtrace => render::backtrace(&self.session.call_stack().await?),
            UserCommand::Locals => render::locals(&self.session.locals(0).await?),
            UserCommand::Eval(expression) => {
                render::evaluation(&self.session.evaluate(&expression, 0).await?)
            }
            UserCommand::Inspect(handle) => {
                let show_all = self.display.show_all_properties;
                render::properties(&self.session.object_properties(handle, show_all).await?)
            }
            UserCommand::Break { file, line } => {
                let handle = self.session.add_breakpoint(&file, line).await?;
                format!("breakpoint {handle} set at {file}:{line}")
            }
            UserCommand::Clear(handle) => {
                if self.session.clear_breakpoint(handle).await? {
                    format!("breakpoint {handle} cleared")
                } else {
                    format!("breakpoint {handle} could not be cleared")
                }
            }
            UserCommand::List(file) => {
                let listing = self.session.source(&file).await?;
                render::source(&file, &listing, self.session.breakpoints())
            }
            UserCommand::Quit => {
                self.session.detach().await?;
                return Ok(None);
            }
        };
        Ok(Some(text))
    }

    /// Where execution stopped, with the surrounding source when the
    /// debuggee can provide it.
    async fn position(&mut self) -> Result<Option<String>, SessionError> {
        let location = match self.session.pause_location().cloned() {
            Some(location) => location,
            None => match self.session.call_stack().await?.top().and_then(Frame::location) {
                Some(location) => location,
                None => return Ok(None),
            },
        };
        let listing = match self.session.source(&location.file).await {
            Ok(listing) => listing,
            Err(SessionError::Remote(e)) => {
                debug!("no source for {}: {e}", location.file);
                return Ok(Some(format!("paused at {location}")));
            }
            Err(e) => return Err(e),
        };
        Ok(Some(format!(
            "paused at {location}\n{}",
            render::listing(
                &location,
                &listing,
                self.session.breakpoints(),
                self.display.listing_context
            )
        )))
    }
}

async fn say<W: AsyncWrite + Unpin>(out: &mut W, text: &str) -> std::io::Result<()> {
    out.write_all(text.as_bytes()).await?;
    if !text.ends_with('\n') {
        out.write_all(b"\n").await?;
    }
    out.flush().await
}
