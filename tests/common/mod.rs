#![allow(dead_code)]

use smt_bridge::{Session, SessionBuilder, Transport, TransportError};
use std::collections::VecDeque;
use std::io;

pub const PROMPT: &str = "yices > ";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A stand-in engine that answers from a fixed script and records every line
/// it was sent. Once the script runs out it answers with a bare prompt.
#[derive(Default)]
pub struct Scripted {
    pub sent: Vec<String>,
    pub started: bool,
    pub exited: bool,
    pub fail_start: bool,
    replies: VecDeque<Result<String, TransportError>>,
    partial: String,
}

impl Scripted {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `text` followed by a prompt.
    pub fn reply(mut self, text: &str) -> Self {
        self.replies.push_back(Ok(format!("{}{}", text, PROMPT)));
        self
    }

    /// Queue a bare prompt, the engine's answer to a command that succeeded
    /// silently.
    pub fn ok(self) -> Self {
        self.reply("")
    }

    pub fn broken_pipe(mut self) -> Self {
        self.replies
            .push_back(Err(io::Error::from(io::ErrorKind::BrokenPipe).into()));
        self
    }

    /// Queue the engine dying after printing `partial`.
    pub fn crash(mut self, partial: &str) -> Self {
        self.replies.push_back(Err(TransportError::Closed {
            partial: partial.to_string(),
        }));
        self
    }

    pub fn unable_to_start(mut self) -> Self {
        self.fail_start = true;
        self
    }
}

impl Transport for Scripted {
    fn start(&mut self) -> Result<(), TransportError> {
        if self.fail_start {
            return Err(TransportError::Start {
                program: "yices".into(),
                source: io::ErrorKind::NotFound.into(),
            });
        }
        self.started = true;
        Ok(())
    }

    fn send(&mut self, text: &str) -> Result<(), TransportError> {
        self.partial.push_str(text);
        Ok(())
    }

    fn send_and_listen(&mut self, text: &str) -> Result<String, TransportError> {
        let mut line = std::mem::take(&mut self.partial);
        line.push_str(text);
        self.sent.push(line);
        match self.replies.pop_front() {
            Some(reply) => reply,
            None => Ok(PROMPT.to_string()),
        }
    }

    fn exit(&mut self) -> Result<(), TransportError> {
        self.exited = true;
        self.started = false;
        Ok(())
    }
}

/// A started session over `script`.
pub fn session(script: Scripted) -> Session<Scripted> {
    init_logging();
    let mut session = SessionBuilder::new().build_with(script);
    assert!(session.start().is_ok());
    session
}
