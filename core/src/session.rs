//! Interactive bridge to a live remote session.

use std::io::{BufRead, ErrorKind, Write};

use redops_backends::msf::{MsfRpc, SessionId};
use redops_common::Result;

pub const INTRO: &str = "Session interpreter ready";
pub const PROMPT: &str = ">> ";

/// Line-oriented read/write bridge between operator input and one remote
/// session stream.
///
/// Each turn is strictly request-then-response: the input line plus a
/// newline is written to the session, then one blocking read is
/// displayed. The session handle is owned exclusively for the duration
/// of the interaction.
pub struct SessionShell<'a, C: MsfRpc + ?Sized> {
    client: &'a mut C,
    id: SessionId,
}

impl<'a, C: MsfRpc + ?Sized> SessionShell<'a, C> {
    pub fn new(client: &'a mut C, id: SessionId) -> Self {
        Self { client, id }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Runs the loop until the operator detaches.
    ///
    /// Exits on end-of-input, an interrupted read, or when `interrupted`
    /// reports a pending signal. Exiting leaves module-selection and
    /// option state untouched; control returns to the outer dispatch.
    pub fn run<R, W, F>(&mut self, mut input: R, mut output: W, interrupted: F) -> Result<()>
    where
        R: BufRead,
        W: Write,
        F: Fn() -> bool,
    {
        writeln!(output, "{INTRO}")?;
        loop {
            write!(output, "{PROMPT}")?;
            output.flush()?;

            let mut line = String::new();
            match input.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(err) if err.kind() == ErrorKind::Interrupted => break,
                Err(err) => return Err(err.into()),
            }
            if interrupted() {
                break;
            }

            let line = line.trim_end_matches(['\r', '\n']);
            self.client.session_write(self.id, &format!("{line}\n"))?;
            let reply = self.client.session_read(self.id)?;
            writeln!(output, "{reply}")?;
        }
        Ok(())
    }
}
