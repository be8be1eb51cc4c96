//! Console output helpers
//!
//! Colored status lines, fixed-width tables and a small prompt/menu reader
//! that works over any `BufRead`/`Write` pair so the interactive game can
//! be driven from tests.

use std::io::{self, BufRead, Write};
use std::str::FromStr;

use colored::{ColoredString, Colorize};

use crate::models::parse_timestamp;

const COLUMN_WIDTH: usize = 15;

/// Status line styles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Error,
    Warning,
    Info,
}

/// Prefix `text` with the tone's symbol and color it
pub fn styled(tone: Tone, text: &str) -> ColoredString {
    match tone {
        Tone::Success => format!("✓ {}", text).green(),
        Tone::Error => format!("✗ {}", text).red(),
        Tone::Warning => format!("⚠ {}", text).yellow(),
        Tone::Info => format!("ℹ {}", text).blue(),
    }
}

pub fn banner(text: &str) -> ColoredString {
    let border = "=".repeat(text.chars().count() + 4);
    format!("{}\n  {}\n{}", border, text, border).cyan().bold()
}

pub fn print_error(text: &str) {
    eprintln!("{}", styled(Tone::Error, text));
}

/// Center each value in a fixed-width column, separated by " | "
pub fn table_row<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(|v| {
            let cell = truncate_text(v.as_ref(), COLUMN_WIDTH);
            format!("{:^width$}", cell, width = COLUMN_WIDTH)
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Write a bold header row, a separator and the data rows
pub fn write_table<W, S>(out: &mut W, headers: &[&str], rows: &[Vec<S>]) -> io::Result<()>
where
    W: Write + ?Sized,
    S: AsRef<str>,
{
    let header = table_row(headers);
    writeln!(out, "{}", header.bold())?;
    writeln!(out, "{}", "-".repeat(header.chars().count()))?;
    for row in rows {
        writeln!(out, "{}", table_row(row))?;
    }
    Ok(())
}

/// Underlined section title
pub fn write_header<W: Write + ?Sized>(out: &mut W, text: &str) -> io::Result<()> {
    writeln!(out, "\n{}", text.bold().underline())
}

/// Truncate to `max_length` characters, ending in "..." when shortened
pub fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    let keep = max_length.saturating_sub(3);
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str("...");
    truncated
}

/// Render a stored timestamp as `YYYY-MM-DD HH:MM:SS`.
///
/// Missing values render as "Never"; unparseable ones are shown as stored.
pub fn format_datetime(value: Option<&str>) -> String {
    match value {
        None | Some("") => "Never".to_string(),
        Some(raw) => match parse_timestamp(raw) {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => raw.to_string(),
        },
    }
}

/// Format an optional ratio as a percentage
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.0}%", v * 100.0),
        None => "-".to_string(),
    }
}

/// Line-oriented prompt reader
pub struct Prompter<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Ask for a line of input. Returns None at end of input.
    ///
    /// Required prompts repeat until a non-blank answer is given.
    pub fn ask(&mut self, prompt: &str, required: bool) -> io::Result<Option<String>> {
        loop {
            write!(self.writer, "{}", prompt.cyan())?;
            self.writer.flush()?;

            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                writeln!(self.writer)?;
                return Ok(None);
            }

            let answer = line.trim();
            if answer.is_empty() && required {
                writeln!(self.writer, "{}", styled(Tone::Error, "This field is required. Please try again."))?;
                continue;
            }
            return Ok(Some(answer.to_string()));
        }
    }

    /// Ask until the answer parses as `T`. Returns None at end of input.
    pub fn ask_parsed<T: FromStr>(&mut self, prompt: &str, type_name: &str) -> io::Result<Option<T>> {
        loop {
            let Some(answer) = self.ask(prompt, true)? else {
                return Ok(None);
            };
            match answer.parse() {
                Ok(value) => return Ok(Some(value)),
                Err(_) => {
                    let message = format!("Please enter a valid {}.", type_name);
                    writeln!(self.writer, "{}", styled(Tone::Error, &message))?;
                }
            }
        }
    }

    /// Show a numbered menu and return the chosen 1-based option
    pub fn menu_choice(&mut self, title: &str, options: &[&str]) -> io::Result<Option<usize>> {
        write_header(&mut self.writer, title)?;
        for (i, option) in options.iter().enumerate() {
            writeln!(self.writer, "{} {}", format!("{}.", i + 1).cyan(), option)?;
        }
        writeln!(self.writer)?;

        loop {
            let Some(choice) = self.ask_parsed::<usize>("Enter your choice: ", "number")? else {
                return Ok(None);
            };
            if (1..=options.len()).contains(&choice) {
                return Ok(Some(choice));
            }
            let message = format!("Please enter a number between 1 and {}.", options.len());
            writeln!(self.writer, "{}", styled(Tone::Error, &message))?;
        }
    }

    /// Yes/no question defaulting to no
    pub fn confirm(&mut self, message: &str) -> io::Result<bool> {
        let answer = self.ask(&format!("{} (y/N): ", message), false)?;
        Ok(matches!(
            answer.as_deref().map(str::to_lowercase).as_deref(),
            Some("y") | Some("yes")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        colored::control::set_override(false);
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 50), "short");
        assert_eq!(truncate_text("abcdefghij", 8), "abcde...");
        assert_eq!(truncate_text("ééééééééé", 6), "ééé...");
        assert_eq!(truncate_text("abcdef", 2), "...");
    }

    #[test]
    fn test_format_datetime() {
        assert_eq!(format_datetime(None), "Never");
        assert_eq!(format_datetime(Some("")), "Never");
        assert_eq!(
            format_datetime(Some("2026-02-05T10:30:00.000000Z")),
            "2026-02-05 10:30:00"
        );
        assert_eq!(format_datetime(Some("sometime")), "sometime");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(Some(0.5)), "50%");
        assert_eq!(format_percent(None), "-");
    }

    #[test]
    fn test_table_row_centers_cells() {
        let row = table_row(&["ab", "1"]);
        let cells: Vec<&str> = row.split(" | ").collect();
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].len(), COLUMN_WIDTH);
        assert_eq!(cells[0].trim(), "ab");
        assert_eq!(cells[1].trim(), "1");
    }

    #[test]
    fn test_write_table() {
        colored::control::set_override(false);
        let mut out = Vec::new();
        write_table(&mut out, &["Rank", "User"], &[vec!["1", "alice"], vec!["2", "bob"]]).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].chars().all(|c| c == '-'));
        assert!(lines[2].contains("alice"));
    }

    #[test]
    fn test_styled_prefixes() {
        colored::control::set_override(false);
        assert_eq!(styled(Tone::Success, "done").to_string(), "✓ done");
        assert_eq!(styled(Tone::Error, "nope").to_string(), "✗ nope");
    }

    #[test]
    fn test_ask_repeats_required() {
        let mut p = prompter("\n  \nalice\n");
        assert_eq!(p.ask("Name: ", true).unwrap().as_deref(), Some("alice"));
        let output = String::from_utf8(p.writer().clone()).unwrap();
        assert_eq!(output.matches("This field is required").count(), 2);
    }

    #[test]
    fn test_ask_eof() {
        let mut p = prompter("");
        assert_eq!(p.ask("Name: ", true).unwrap(), None);
    }

    #[test]
    fn test_menu_choice_validates_range() {
        let mut p = prompter("0\nabc\n4\n2\n");
        let choice = p.menu_choice("Menu", &["One", "Two", "Three"]).unwrap();
        assert_eq!(choice, Some(2));

        let output = String::from_utf8(p.writer().clone()).unwrap();
        assert!(output.contains("1. One"));
        assert!(output.contains("between 1 and 3"));
        assert!(output.contains("valid number"));
    }

    #[test]
    fn test_confirm() {
        assert!(prompter("y\n").confirm("Sure?").unwrap());
        assert!(prompter("YES\n").confirm("Sure?").unwrap());
        assert!(!prompter("\n").confirm("Sure?").unwrap());
        assert!(!prompter("").confirm("Sure?").unwrap());
    }
}
