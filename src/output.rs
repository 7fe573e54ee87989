//! Output Formatting - status lines, tables, markdown, spinners and prompts
//!
//! This module provides consistent output across all CLI commands. Status
//! lines go through `OutputWriter`, long-running remote calls are wrapped in a
//! `ProgressIndicator`, and interactive input goes through the `Prompter`
//! trait so flows can be driven by a fake in tests.

use std::io;
use std::time::Duration;

use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

/// Output writer for human-readable status lines and machine output
#[derive(Clone, Copy, Debug, Default)]
pub struct OutputWriter {
    quiet: bool,
}

impl OutputWriter {
    /// Create a new output writer
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        println!("{} {}", style("✓").green().bold(), message);
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        if self.quiet {
            return;
        }
        eprintln!("{} {}", style("⚠").yellow().bold(), message);
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red().bold(), message);
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        println!("{} {}", style("ℹ").cyan().bold(), message);
    }

    /// Print raw output to stderr
    pub fn eprint(&self, message: &str) {
        eprintln!("{}", message);
    }

    /// Print command results (always prints, ignores quiet)
    pub fn data(&self, text: &str) {
        println!("{}", text);
    }

    /// Create a new styled table
    pub fn create_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table
    }

    /// Create a table with headers
    pub fn create_table_with_headers(&self, headers: &[&str]) -> Table {
        let mut table = self.create_table();
        table.set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
        table
    }
}

/// Render a GitHub-flavoured markdown table
pub fn markdown_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let escape = |s: &str| s.replace('|', "\\|");

    let mut out = String::new();
    out.push_str(&format!("| {} |\n", headers.join(" | ")));
    out.push_str(&format!(
        "| {} |\n",
        headers.iter().map(|_| "---").collect::<Vec<_>>().join(" | ")
    ));
    for row in rows {
        let cells: Vec<String> = row.iter().map(|c| escape(c)).collect();
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    out
}

/// Spinner shown while a remote call is in flight
///
/// `fail`, `succeed` and `stop` all finish the spinner; a finished spinner
/// never spins again.
pub struct ProgressIndicator {
    bar: indicatif::ProgressBar,
}

impl ProgressIndicator {
    /// Create and start a spinner
    pub fn spinner(message: &str) -> Self {
        let bar = indicatif::ProgressBar::new_spinner();
        if let Ok(spinner_style) =
            indicatif::ProgressStyle::default_spinner().template("{spinner:.green} {msg}")
        {
            bar.set_style(spinner_style);
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// A spinner that never draws (quiet mode, tests)
    pub fn hidden() -> Self {
        Self {
            bar: indicatif::ProgressBar::hidden(),
        }
    }

    /// Finish with a success glyph
    pub fn succeed(&self, message: &str) {
        self.bar
            .finish_with_message(format!("{} {}", style("✓").green().bold(), message));
    }

    /// Finish with a failure glyph
    pub fn fail(&self, message: &str) {
        self.bar
            .finish_with_message(format!("{} {}", style("✗").red().bold(), message));
    }

    /// Finish and clear
    pub fn stop(&self) {
        self.bar.finish_and_clear();
    }

    /// Whether the spinner has been stopped
    pub fn is_finished(&self) -> bool {
        self.bar.is_finished()
    }
}

/// Interactive input
pub trait Prompter {
    /// Ask for hidden input
    fn password(&mut self, prompt: &str) -> io::Result<String>;

    /// Ask for any number of items; returns the selected indices
    fn multi_select(&mut self, prompt: &str, items: &[String]) -> io::Result<Vec<usize>>;

    /// Ask for confirmation
    fn confirm(&mut self, prompt: &str, default: bool) -> io::Result<bool>;
}

/// Terminal prompts backed by `dialoguer`
#[derive(Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn password(&mut self, prompt: &str) -> io::Result<String> {
        let result = dialoguer::Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map_err(io::Error::other)?;
        Ok(result)
    }

    fn multi_select(&mut self, prompt: &str, items: &[String]) -> io::Result<Vec<usize>> {
        let result = dialoguer::MultiSelect::new()
            .with_prompt(prompt)
            .items(items)
            .interact()
            .map_err(io::Error::other)?;
        Ok(result)
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> io::Result<bool> {
        let result = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(io::Error::other)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_table() {
        let rows = vec![
            vec!["acme".to_string(), "1".to_string()],
            vec!["a|b".to_string(), "2".to_string()],
        ];
        let md = markdown_table(&["Name", "Count"], &rows);
        assert_eq!(
            md,
            "| Name | Count |\n| --- | --- |\n| acme | 1 |\n| a\\|b | 2 |\n"
        );
    }

    #[test]
    fn test_progress_indicator_lifecycle() {
        let progress = ProgressIndicator::hidden();
        assert!(!progress.is_finished());
        progress.fail("nope");
        assert!(progress.is_finished());
    }
}
