//! Command line parsing for the interactive prompt.

use anyhow::{bail, Result};

/// A table reference typed by the user: a position in the listing or a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableRef {
    /// 1-based position in the table listing
    Index(usize),
    /// Table name
    Name(String),
}

/// One user command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect,
    Disconnect,
    Tables,
    Use(TableRef),
    Show(Option<String>),
    Filter { column: String, text: String },
    Clear(String),
    Controls,
    Apply,
    Reset,
    Sort { column: String, descending: bool },
    Grid,
    Export(Option<String>),
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  connect                    Open a connection (prompts for host, port, database, user, password)
  disconnect                 Close the connection
  tables                     List tables; * marks the selected one
  use <n|name>               Select a table by number or name
  show [table]               Show the selected table, or the given one
  filter <column> <text>     Set the filter text for a column (run `apply` to use it)
  clear <column>             Clear the filter text for a column
  controls                   Show filter slots and sort triggers
  apply                      Re-run the table query with the current filter texts
  reset                      Clear every filter and the sort order, then re-run
  sort <column> asc|desc     Order by a column, keeping applied filters
  grid                       Show the last result again
  export [path]              Write the last result to a CSV file
  status                     Show connection and table state
  help                       Show this help
  quit                       Exit

Numbers match exactly; any other filter text matches as a case-insensitive substring.
Quote column names that contain spaces: filter \"first name\" ann";

impl Command {
    /// Parse one non-empty input line.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim_start()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "connect" => Command::Connect,
            "disconnect" => Command::Disconnect,
            "tables" | "ls" => Command::Tables,
            "use" => {
                let (name, _) = take_word(rest)?;
                match name.parse::<usize>() {
                    Ok(n) => Command::Use(TableRef::Index(n)),
                    Err(_) => Command::Use(TableRef::Name(name)),
                }
            }
            "show" => Command::Show(optional_word(rest)?),
            "filter" => {
                let (column, text) = take_word(rest)?;
                Command::Filter { column, text: text.to_string() }
            }
            "clear" => Command::Clear(take_word(rest)?.0),
            "controls" => Command::Controls,
            "apply" => Command::Apply,
            "reset" => Command::Reset,
            "sort" => {
                let (column, direction) = take_word(rest)?;
                let descending = match direction.trim().to_ascii_lowercase().as_str() {
                    "" | "asc" => false,
                    "desc" => true,
                    other => bail!("Unknown sort direction: {other} (use asc or desc)"),
                };
                Command::Sort { column, descending }
            }
            "grid" => Command::Grid,
            "export" => Command::Export(if rest.is_empty() { None } else { Some(rest.to_string()) }),
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => bail!("Unknown command: {other} (type `help` for a list)"),
        };
        Ok(command)
    }
}

/// Split the first word (optionally double-quoted) off `input`.
fn take_word(input: &str) -> Result<(String, &str)> {
    if input.is_empty() {
        bail!("Missing argument (type `help` for usage)");
    }

    if let Some(quoted) = input.strip_prefix('"') {
        let Some(end) = quoted.find('"') else {
            bail!("Unterminated quote in: {input}");
        };
        return Ok((quoted[..end].to_string(), quoted[end + 1..].trim_start()));
    }

    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => Ok((word.to_string(), rest.trim_start())),
        None => Ok((input.to_string(), "")),
    }
}

fn optional_word(input: &str) -> Result<Option<String>> {
    if input.is_empty() {
        Ok(None)
    } else {
        take_word(input).map(|(word, _)| Some(word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_commands() {
        assert_eq!(Command::parse("connect").unwrap(), Command::Connect);
        assert_eq!(Command::parse("  APPLY  ").unwrap(), Command::Apply);
        assert_eq!(Command::parse("quit").unwrap(), Command::Quit);
        assert_eq!(Command::parse("q").unwrap(), Command::Quit);
        assert_eq!(Command::parse("show").unwrap(), Command::Show(None));
    }

    #[test]
    fn test_use_by_index_or_name() {
        assert_eq!(Command::parse("use 2").unwrap(), Command::Use(TableRef::Index(2)));
        assert_eq!(
            Command::parse("use medals").unwrap(),
            Command::Use(TableRef::Name("medals".to_string()))
        );
        assert!(Command::parse("use").is_err());
    }

    #[test]
    fn test_filter_keeps_rest_of_line() {
        assert_eq!(
            Command::parse("filter country united states").unwrap(),
            Command::Filter { column: "country".to_string(), text: "united states".to_string() }
        );
        assert_eq!(
            Command::parse("filter year").unwrap(),
            Command::Filter { column: "year".to_string(), text: String::new() }
        );
    }

    #[test]
    fn test_quoted_column() {
        assert_eq!(
            Command::parse("filter \"first name\" ann").unwrap(),
            Command::Filter { column: "first name".to_string(), text: "ann".to_string() }
        );
        assert_eq!(
            Command::parse("show \"Medal Table\"").unwrap(),
            Command::Show(Some("Medal Table".to_string()))
        );
        assert!(Command::parse("clear \"first name").is_err());
    }

    #[test]
    fn test_sort_direction() {
        assert_eq!(
            Command::parse("sort count desc").unwrap(),
            Command::Sort { column: "count".to_string(), descending: true }
        );
        assert_eq!(
            Command::parse("sort count").unwrap(),
            Command::Sort { column: "count".to_string(), descending: false }
        );
        let err = Command::parse("sort count sideways").unwrap_err();
        assert!(err.to_string().contains("sideways"));
    }

    #[test]
    fn test_export_path_is_optional() {
        assert_eq!(Command::parse("export").unwrap(), Command::Export(None));
        assert_eq!(
            Command::parse("export out/medals 2021.csv").unwrap(),
            Command::Export(Some("out/medals 2021.csv".to_string()))
        );
    }

    #[test]
    fn test_unknown_command() {
        let err = Command::parse("select * from medals").unwrap_err();
        assert!(err.to_string().starts_with("Unknown command: select"));
    }
}
