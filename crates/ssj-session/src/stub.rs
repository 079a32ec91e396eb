//! Scripted debuggee used by the session tests.
//!
//! The stub sends a greeting, then answers each request according to a
//! script closure. Requests the script does not claim get an empty reply, so
//! tests only describe the traffic they care about.

use std::sync::{Arc, Mutex};

use ssj_wire::framer;
use ssj_wire::{Message, MessageKind};
use tokio::io::{AsyncWriteExt, DuplexStream};

use crate::notify::{Notification, NotificationSink};
use crate::protocol::Command;
use crate::session::SessionId;

/// What the stub does with one request.
pub(crate) enum Answer {
    /// Write these messages, in order.
    Send(Vec<Message>),
    /// Write raw bytes, bypassing the framer.
    Raw(Vec<u8>),
    /// Drop the connection.
    HangUp,
}

impl Answer {
    pub(crate) fn reply(reply: Message) -> Option<Answer> {
        Some(Answer::Send(vec![reply]))
    }

    pub(crate) fn error(text: &str) -> Option<Answer> {
        Some(Answer::Send(vec![error_message(text)]))
    }
}

pub(crate) fn error_message(text: &str) -> Message {
    Message::new(MessageKind::Error).arg(text)
}

/// Requests the stub has seen.
#[derive(Clone, Default)]
pub(crate) struct RequestLog(Arc<Mutex<Vec<Message>>>);

impl RequestLog {
    pub(crate) fn commands(&self) -> Vec<Command> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter_map(|m| m.int(0).ok().and_then(Command::from_code))
            .collect()
    }

    pub(crate) fn count(&self, command: Command) -> usize {
        self.commands().into_iter().filter(|c| *c == command).count()
    }

    pub(crate) fn last(&self) -> Option<Message> {
        self.0.lock().unwrap().last().cloned()
    }

    fn push(&self, message: Message) {
        self.0.lock().unwrap().push(message);
    }
}

/// Start a stub debuggee. Returns the client end of the pipe.
pub(crate) fn spawn<F>(greeting: &str, mut script: F) -> (DuplexStream, RequestLog)
where
    F: FnMut(Command, &Message) -> Option<Answer> + Send + 'static,
{
    let (client, mut server) = tokio::io::duplex(64 * 1024);
    let log = RequestLog::default();
    let seen = log.clone();
    let greeting = format!("{greeting}\n");
    tokio::spawn(async move {
        if server.write_all(greeting.as_bytes()).await.is_err() {
            return;
        }
        loop {
            let Ok(request) = framer::receive(&mut server).await else {
                return;
            };
            seen.push(request.clone());
            let answer = match request.int(0).ok().and_then(Command::from_code) {
                Some(command) => script(command, &request).unwrap_or(Answer::Send(vec![Message::reply()])),
                None => Answer::Send(vec![error_message("unknown command")]),
            };
            match answer {
                Answer::Send(messages) => {
                    for message in &messages {
                        if framer::send(&mut server, message).await.is_err() {
                            return;
                        }
                    }
                }
                Answer::Raw(bytes) => {
                    if server.write_all(&bytes).await.is_err() {
                        return;
                    }
                }
                Answer::HangUp => return,
            }
        }
    });
    (client, log)
}

/// A sink that records every notification it is handed.
pub(crate) fn recorder() -> (impl NotificationSink + 'static, Arc<Mutex<Vec<Notification>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let seen = Arc::clone(&seen);
        move |_: SessionId, n: &Notification| seen.lock().unwrap().push(n.clone())
    };
    (sink, seen)
}
