//! Per-window session state.
//!
//! Every shell window runs commands on its own logical thread with its own
//! standard streams, command history and terminal appearance, while sharing
//! the persisted defaults store with every other window. Handlers receive
//! the session explicitly instead of discovering "the active window" through
//! an ambient lookup.

use crate::appearance::Appearance;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};

pub struct Session {
    pub stdout: Box<dyn Write + Send>,
    pub stderr: Box<dyn Write + Send>,
    pub stdin: Box<dyn Read + Send>,
    pub appearance: Appearance,
    /// Command lines executed in this window, oldest first.
    pub history: Vec<String>,
}

impl Session {
    pub fn new(
        stdout: Box<dyn Write + Send>,
        stderr: Box<dyn Write + Send>,
        stdin: Box<dyn Read + Send>,
    ) -> Self {
        Self {
            stdout,
            stderr,
            stdin,
            appearance: Appearance::default(),
            history: Vec::new(),
        }
    }

    /// A session whose output streams are captured in memory. Used by tests
    /// and by embedding hosts that render the streams themselves.
    pub fn piped() -> (Self, Capture, Capture) {
        let stdout = Capture::new();
        let stderr = Capture::new();
        let session = Self::new(
            Box::new(stdout.clone()),
            Box::new(stderr.clone()),
            Box::new(std::io::empty()),
        );
        (session, stdout, stderr)
    }

    /// Replaces the input stream (interactive prompts read from it).
    pub fn set_input(&mut self, bytes: Vec<u8>) {
        self.stdin = Box::new(std::io::Cursor::new(bytes));
    }

    pub fn record(&mut self, line: &str) {
        self.history.push(line.to_string());
    }

    /// Reads a single byte from the session input; true for `y`/`Y`.
    /// Interactive y/N prompts treat everything else (including a closed
    /// stream) as "no".
    pub fn confirmed(&mut self) -> bool {
        let mut byte = [0u8; 1];
        match self.stdin.read(&mut byte) {
            Ok(1) => byte[0] == b'y' || byte[0] == b'Y',
            _ => false,
        }
    }
}

/// Shared in-memory sink implementing `Write`.
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        match self.0.lock() {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => String::new(),
        }
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(mut bytes) = self.0.lock() {
            bytes.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn piped_sessions_capture_their_streams() {
        let (mut session, stdout, stderr) = Session::piped();
        writeln!(session.stdout, "out").unwrap();
        writeln!(session.stderr, "err").unwrap();
        assert_eq!(stdout.contents(), "out\n");
        assert_eq!(stderr.contents(), "err\n");
    }

    #[test]
    fn confirmation_reads_a_single_byte() {
        let (mut session, _, _) = Session::piped();
        session.set_input(b"y".to_vec());
        assert!(session.confirmed());

        session.set_input(b"n".to_vec());
        assert!(!session.confirmed());

        // empty input counts as "no"
        session.set_input(Vec::new());
        assert!(!session.confirmed());
    }

    #[test]
    fn history_accumulates_in_order() {
        let (mut session, _, _) = Session::piped();
        session.record("bookmark work");
        session.record("jump work");
        assert_eq!(session.history, vec!["bookmark work", "jump work"]);
    }
}
