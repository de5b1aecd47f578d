//! The conversational channel to the engine process.
//!
//! The engine prints a fixed prompt once it has finished answering a command,
//! so a reply is everything read up to and including the next prompt.

use crate::error::TransportError;
use std::ffi;
use std::io::{self, BufRead, Write};
use std::process;

type Result<T> = std::result::Result<T, TransportError>;

/// A blocking request/response channel to an engine.
///
/// Only one command may be in flight: callers must consume the reply to a
/// command before sending the next one.
pub trait Transport {
    /// Launch the engine and consume its banner up to the first prompt.
    fn start(&mut self) -> Result<()>;

    /// Write `text` without terminating the line or waiting for a reply.
    fn send(&mut self, text: &str) -> Result<()>;

    /// Write `text` and a line break, then block until the next prompt. The
    /// returned reply includes the prompt. If the engine closes its output
    /// first, this fails with [`TransportError::Closed`].
    fn send_and_listen(&mut self, text: &str) -> Result<String>;

    /// Terminate the engine.
    fn exit(&mut self) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn start(&mut self) -> Result<()> {
        (**self).start()
    }

    fn send(&mut self, text: &str) -> Result<()> {
        (**self).send(text)
    }

    fn send_and_listen(&mut self, text: &str) -> Result<String> {
        (**self).send_and_listen(text)
    }

    fn exit(&mut self) -> Result<()> {
        (**self).exit()
    }
}

struct Running {
    handle: process::Child,
    stdin: io::BufWriter<process::ChildStdin>,
    stdout: io::BufReader<process::ChildStdout>,
    pending: Vec<u8>,
}

/// An engine running as a child process, talking over its stdin and stdout.
///
/// Everything written to the engine is tee'd to the transcript, with replies
/// recorded as `;` comments so the transcript can be fed back to the engine.
pub struct ProcessTransport {
    program: ffi::OsString,
    args: Vec<ffi::OsString>,
    prompt: String,
    transcript: io::BufWriter<Box<dyn io::Write + Send>>,
    process: Option<Running>,
}

impl ProcessTransport {
    pub fn new(
        program: ffi::OsString,
        args: Vec<ffi::OsString>,
        prompt: String,
        transcript: Box<dyn io::Write + Send>,
    ) -> Self {
        Self {
            program,
            args,
            prompt,
            transcript: io::BufWriter::new(transcript),
            process: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.process.is_some()
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    fn write(&mut self, text: &str, newline: bool) -> Result<()> {
        let running = self.process.as_mut().ok_or(TransportError::NotRunning)?;
        write!(self.transcript, "{}", text)?;
        write!(running.stdin, "{}", text)?;
        if newline {
            writeln!(self.transcript)?;
            writeln!(running.stdin)?;
        }
        self.transcript.flush()?;
        running.stdin.flush()?;
        Ok(())
    }

    fn listen(&mut self) -> Result<String> {
        let prompt = self.prompt.as_bytes();
        let running = self.process.as_mut().ok_or(TransportError::NotRunning)?;

        let (bytes, closed) = loop {
            if let Some(end) = find_prompt(&running.pending, prompt) {
                let rest = running.pending.split_off(end);
                break (std::mem::replace(&mut running.pending, rest), false);
            }

            let buf = running.stdout.fill_buf()?;
            if buf.is_empty() {
                log::debug!("solver output closed while waiting for a prompt");
                break (std::mem::take(&mut running.pending), true);
            }
            let n = buf.len();
            running.pending.extend_from_slice(buf);
            running.stdout.consume(n);
        };

        let reply = String::from_utf8_lossy(&bytes).into_owned();
        log::trace!("<- {}", reply);
        for line in reply.lines() {
            writeln!(self.transcript, "; {}", line)?;
        }
        self.transcript.flush()?;
        if closed {
            return Err(TransportError::Closed { partial: reply });
        }
        Ok(reply)
    }
}

/// The offset just past the first occurrence of `prompt`, or just past the
/// first line break when there is no prompt to look for.
fn find_prompt(pending: &[u8], prompt: &[u8]) -> Option<usize> {
    if prompt.is_empty() {
        return pending.iter().position(|&b| b == b'\n').map(|ix| ix + 1);
    }
    pending
        .windows(prompt.len())
        .position(|w| w == prompt)
        .map(|ix| ix + prompt.len())
}

impl Transport for ProcessTransport {
    fn start(&mut self) -> Result<()> {
        if self.process.is_some() {
            return Ok(());
        }

        let mut handle = process::Command::new(&self.program)
            .args(&self.args)
            .stdin(process::Stdio::piped())
            .stdout(process::Stdio::piped())
            .spawn()
            .map_err(|source| TransportError::Start {
                program: self.program.to_string_lossy().into_owned(),
                source,
            })?;
        let (stdin, stdout) = match (handle.stdin.take(), handle.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = handle.kill();
                let _ = handle.wait();
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "solver pipes unavailable").into());
            }
        };

        self.process = Some(Running {
            handle,
            stdin: io::BufWriter::new(stdin),
            stdout: io::BufReader::new(stdout),
            pending: Vec::new(),
        });

        let banner = match self.listen() {
            Ok(banner) => banner,
            Err(e) => {
                if let Some(mut running) = self.process.take() {
                    let _ = running.handle.kill();
                    let _ = running.handle.wait();
                }
                return Err(e);
            }
        };
        log::debug!("started {:?}: {}", self.program, banner.trim());
        Ok(())
    }

    fn send(&mut self, text: &str) -> Result<()> {
        log::trace!("-> {}", text);
        self.write(text, false)
    }

    fn send_and_listen(&mut self, text: &str) -> Result<String> {
        log::trace!("-> {}", text);
        self.write(text, true)?;
        self.listen()
    }

    fn exit(&mut self) -> Result<()> {
        let mut running = match self.process.take() {
            Some(running) => running,
            None => return Ok(()),
        };
        // closing stdin lets a well-behaved engine finish on its own
        drop(running.stdin);
        if running.handle.try_wait()?.is_none() {
            let _ = running.handle.kill();
        }
        running.handle.wait()?;
        self.transcript.flush()?;
        Ok(())
    }
}

impl Drop for ProcessTransport {
    fn drop(&mut self) {
        if let Some(mut running) = self.process.take() {
            let _ = running.handle.kill();
            let _ = running.handle.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_search_includes_the_prompt() {
        let out = b"sat\nyices > (more";
        assert_eq!(find_prompt(out, b"yices > "), Some(12));
        assert_eq!(find_prompt(b"sat\n", b"yices > "), None);
    }

    #[test]
    fn empty_prompt_reads_lines() {
        assert_eq!(find_prompt(b"unsat\nrest", b""), Some(6));
        assert_eq!(find_prompt(b"unsat", b""), None);
    }

    #[test]
    fn unstarted_transport_refuses_io() {
        let mut t = ProcessTransport::new("yices".into(), vec![], "yices > ".into(), Box::new(io::sink()));
        assert!(!t.is_running());
        assert!(matches!(t.send("(check)"), Err(TransportError::NotRunning)));
        assert!(matches!(t.send_and_listen("(check)"), Err(TransportError::NotRunning)));
        assert!(t.exit().is_ok());
    }

    #[test]
    fn missing_program_fails_to_start() {
        let mut t = ProcessTransport::new(
            "/nonexistent/solver/binary".into(),
            vec![],
            "yices > ".into(),
            Box::new(io::sink()),
        );
        let err = t.start().unwrap_err();
        assert!(matches!(err, TransportError::Start { .. }));
        assert!(err.to_string().contains("/nonexistent/solver/binary"));
    }
}
