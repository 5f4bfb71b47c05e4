//! Terminal input and output.

use std::fmt::Display;
use std::io::{BufRead, Write};

use anyhow::{Context, Result};

use pgpeek_core::ConnectionParams;

/// Line-oriented console over any reader and writer.
///
/// Passwords are read without echo through the controlling terminal when `interactive` is set,
/// and as plain lines otherwise.
pub struct Console<R, W> {
    input: R,
    output: W,
    interactive: bool,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W, interactive: bool) -> Self {
        Self { input, output, interactive }
    }

    /// Print one block of text followed by a newline.
    pub fn print(&mut self, text: impl Display) -> Result<()> {
        writeln!(self.output, "{text}").context("Failed to write output")
    }

    /// Show `prompt` and read one line. `None` at end of input.
    pub fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line).context("Failed to read input")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Ask for a value, offering `default` when the answer is blank.
    pub fn ask(&mut self, label: &str, default: &str) -> Result<Option<String>> {
        let prompt = if default.is_empty() {
            format!("{label}: ")
        } else {
            format!("{label} [{default}]: ")
        };
        let answer = self.read_line(&prompt)?;
        Ok(answer.map(|answer| {
            let answer = answer.trim();
            if answer.is_empty() {
                default.to_string()
            } else {
                answer.to_string()
            }
        }))
    }

    /// Ask for a secret without echoing it.
    pub fn ask_secret(&mut self, label: &str) -> Result<Option<String>> {
        if !self.interactive {
            return self.read_line(&format!("{label}: "));
        }
        self.output.flush()?;
        let secret =
            rpassword::prompt_password(format!("{label}: ")).context("Failed to read password")?;
        Ok(Some(secret))
    }

    /// The connection form: five fields, each defaulting to the usual local values.
    ///
    /// `None` when input ends before the form is complete.
    pub fn connection_form(&mut self) -> Result<Option<ConnectionParams>> {
        let defaults = ConnectionParams::default();

        let Some(host) = self.ask("Host", &defaults.host)? else { return Ok(None) };
        let Some(port) = self.ask("Port", &defaults.port)? else { return Ok(None) };
        let Some(database) = self.ask("Database", &defaults.database)? else { return Ok(None) };
        let Some(user) = self.ask("User", &defaults.user)? else { return Ok(None) };
        let Some(password) = self.ask_secret("Password")? else { return Ok(None) };

        Ok(Some(ConnectionParams::new(host, port, database, user, password)))
    }
}

#[cfg(test)]
impl<R, W> Console<R, W> {
    pub fn into_output(self) -> W {
        self.output
    }
}
