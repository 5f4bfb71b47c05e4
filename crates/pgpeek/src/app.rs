//! The interactive command loop.

use std::io::{BufRead, Write};

use anyhow::Result;

use pgpeek_core::services::export::with_default_extension;
use pgpeek_core::{ExportOutcome, PeekError, ResultSet, Session, SessionPhase};

use crate::commands::{Command, TableRef, HELP};
use crate::prompt::Console;
use crate::render;

const PROMPT: &str = "pgpeek> ";

/// Reads commands, drives the session and prints what it returns.
///
/// Session errors are reported as notifications and the loop carries on. Only terminal I/O
/// failures end it.
pub struct App<R, W> {
    session: Session,
    console: Console<R, W>,
}

impl<R: BufRead, W: Write> App<R, W> {
    pub fn new(session: Session, console: Console<R, W>) -> Self {
        Self { session, console }
    }

    /// Run until `quit` or end of input.
    pub fn run(&mut self) -> Result<()> {
        self.console.print(format!(
            "pgpeek {}. Type `connect` to open a connection, `help` for commands.",
            env!("CARGO_PKG_VERSION")
        ))?;

        while let Some(line) = self.console.read_line(PROMPT)? {
            if line.trim().is_empty() {
                continue;
            }
            let command = match Command::parse(&line) {
                Ok(command) => command,
                Err(e) => {
                    self.console.print(e)?;
                    continue;
                }
            };
            tracing::debug!(?command, "Command");

            if command == Command::Quit {
                break;
            }
            self.dispatch(command)?;
        }

        self.session.disconnect();
        Ok(())
    }

    fn dispatch(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Connect => self.connect(),
            Command::Disconnect => {
                if self.session.is_connected() {
                    self.session.disconnect();
                    self.console.print(render::info_notice("Disconnected", "Connection closed"))
                } else {
                    self.console.print("Not connected.")
                }
            }
            Command::Tables => {
                if !self.session.is_connected() {
                    return self.report(&PeekError::not_connected());
                }
                let browser = self.session.browser();
                self.console.print(render::table_list(browser.tables(), browser.selected_table()))
            }
            Command::Use(table) => self.pick_table(table),
            Command::Show(table) => {
                let outcome = self.session.show_table(table.as_deref());
                Self::show_outcome(&mut self.console, outcome, "No table selected.")
            }
            Command::Filter { column, text } => self.set_filter_text(&column, &text),
            Command::Clear(column) => self.set_filter_text(&column, ""),
            Command::Controls => {
                let browser = self.session.browser();
                if browser.panel().is_empty() {
                    self.console.print("No table shown.")
                } else {
                    self.console.print(render::filter_panel(browser.panel(), browser.sort()))
                }
            }
            Command::Apply => {
                let outcome = self.session.apply_filter();
                Self::show_outcome(&mut self.console, outcome, "No table shown.")
            }
            Command::Reset => {
                let outcome = self.session.reset_filter();
                Self::show_outcome(&mut self.console, outcome, "No table shown.")
            }
            Command::Sort { column, descending } => {
                let outcome = self.session.sort_by_column(&column, descending);
                Self::show_outcome(&mut self.console, outcome, "No table shown.")
            }
            Command::Grid => {
                let outcome = Ok(self.session.browser().last_result());
                Self::show_outcome(&mut self.console, outcome, "No result.")
            }
            Command::Export(path) => self.export(path),
            Command::Status => self.status(),
            Command::Help => self.console.print(HELP),
            Command::Quit => Ok(()),
        }
    }

    fn connect(&mut self) -> Result<()> {
        let Some(params) = self.console.connection_form()? else {
            return Ok(());
        };
        let url = params.display_url();

        if let Err(e) = self.session.connect(params) {
            return self.report(&e);
        }
        self.console.print(render::info_notice("Connected", &format!("Connected to {url}")))?;

        match self.session.load_tables() {
            Ok(_) => {
                let browser = self.session.browser();
                self.console.print(render::table_list(browser.tables(), browser.selected_table()))
            }
            Err(e) => self.report(&e),
        }
    }

    fn pick_table(&mut self, table: TableRef) -> Result<()> {
        let name = match table {
            TableRef::Name(name) => name,
            TableRef::Index(n) => {
                let tables = self.session.browser().tables();
                match n.checked_sub(1).and_then(|i| tables.get(i)).cloned() {
                    Some(name) => name,
                    None => {
                        let err = PeekError::invalid_input(format!("No table number {n}"));
                        return self.report(&err);
                    }
                }
            }
        };

        match self.session.pick_table(&name) {
            Ok(()) => self.console.print(format!("Selected {name}. Type `show` to load it.")),
            Err(e) => self.report(&e),
        }
    }

    fn set_filter_text(&mut self, column: &str, text: &str) -> Result<()> {
        match self.session.set_filter_text(column, text) {
            Ok(()) if text.trim().is_empty() => {
                self.console.print(format!("Filter on {column} cleared. Type `apply` to run."))
            }
            Ok(()) => {
                self.console.print(format!("Filter on {column}: {text}. Type `apply` to run."))
            }
            Err(e) => self.report(&e),
        }
    }

    fn export(&mut self, path: Option<String>) -> Result<()> {
        if self.session.browser().last_result().map_or(true, ResultSet::is_empty) {
            return self.console.print(render::info_notice("Export", "No data to export"));
        }

        let path = match path {
            Some(path) => path,
            None => match self.console.ask("Export to", "")? {
                Some(path) => path,
                None => return Ok(()),
            },
        };
        if path.trim().is_empty() {
            return Ok(());
        }

        match self.session.export(with_default_extension(path.trim())) {
            Ok(ExportOutcome::Written { path, rows }) => self.console.print(render::info_notice(
                "Export",
                &format!("Wrote {rows} rows to {}", path.display()),
            )),
            Ok(ExportOutcome::NoData) => {
                self.console.print(render::info_notice("Export", "No data to export"))
            }
            Err(e) => self.report(&e),
        }
    }

    fn status(&mut self) -> Result<()> {
        let phase = self.session.phase();
        let mut lines = vec![match self.session.connection_params() {
            Some(params) => format!("Connected to {}", params.display_url()),
            None => "Not connected".to_string(),
        }];

        let browser = self.session.browser();
        if let Some(table) = browser.current_table() {
            lines.push(format!("Table: {table}"));
            let filters: Vec<String> =
                browser.filters().active().map(|(c, t)| format!("{c} ~ {t}")).collect();
            if !filters.is_empty() {
                lines.push(format!("Filters: {}", filters.join(", ")));
            }
            if let Some(sort) = browser.sort() {
                let direction = if sort.descending { "desc" } else { "asc" };
                lines.push(format!("Sort: {} {direction}", sort.column));
            }
        } else if phase == SessionPhase::Connected {
            if let Some(selected) = browser.selected_table() {
                lines.push(format!("Selected: {selected}"));
            }
        }
        if let Some(result) = browser.last_result() {
            lines.push(format!("Last result: {}", render::result_summary(result)));
        }

        self.console.print(lines.join("\n"))
    }

    fn show_outcome(
        console: &mut Console<R, W>,
        outcome: Result<Option<&ResultSet>, PeekError>,
        nothing: &str,
    ) -> Result<()> {
        match outcome {
            Ok(Some(result)) => {
                console.print(render::result_grid(result))?;
                console.print(render::result_summary(result))
            }
            Ok(None) => console.print(nothing),
            Err(e) => Self::report_to(console, &e),
        }
    }

    fn report(&mut self, err: &PeekError) -> Result<()> {
        Self::report_to(&mut self.console, err)
    }

    fn report_to(console: &mut Console<R, W>, err: &PeekError) -> Result<()> {
        tracing::warn!(category = err.category(), error = %err, "Action failed");
        console.print(render::error_notice(&err.to_error_info()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run_script(script: &str) -> String {
        let console = Console::new(Cursor::new(script.as_bytes().to_vec()), Vec::new(), false);
        let mut app = App::new(Session::new().unwrap(), console);
        app.run().unwrap();
        String::from_utf8(app.console.into_output()).unwrap()
    }

    #[test]
    fn test_help_and_quit() {
        let output = run_script("help\nquit\nstatus\n");
        assert!(output.contains("sort <column> asc|desc"));
        assert!(!output.contains("Not connected"));
    }

    #[test]
    fn test_status_when_disconnected() {
        let output = run_script("status\n");
        assert!(output.contains("Not connected"));
    }

    #[test]
    fn test_unknown_command_does_not_end_session() {
        let output = run_script("frobnicate\nstatus\n");
        assert!(output.contains("Unknown command: frobnicate"));
        assert!(output.contains("Not connected"));
    }

    #[test]
    fn test_table_actions_require_connection() {
        let output = run_script("tables\nshow medals\n");
        assert_eq!(output.matches("[Connection Error] Connection error: Not connected").count(), 2);
    }

    #[test]
    fn test_actions_without_table_are_noops() {
        let output = run_script("apply\nreset\nsort count desc\ncontrols\ngrid\n");
        assert_eq!(output.matches("No table shown.").count(), 4);
        assert!(output.contains("No result."));
    }

    #[test]
    fn test_export_without_result() {
        let output = run_script("export out.csv\n");
        assert!(output.contains("[Export] No data to export"));
    }

    #[test]
    fn test_failed_connect_is_reported() {
        let output = run_script("connect\nlocalhost\nnot-a-port\n\n\n\nstatus\n");
        assert!(output.contains("[Connection Error]"));
        assert!(output.contains("Invalid port"));
        assert!(output.contains("Not connected"));
    }

    #[test]
    fn test_filter_for_unknown_column_is_reported() {
        let output = run_script("filter year 2021\n");
        assert!(output.contains("[Input Error] Unknown column: year"));
    }
}
