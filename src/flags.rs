//! Flag parsing - the narrow contract between commands and the argument parser
//!
//! Each command declares its flags as a clap derive struct (the schema) and
//! hands the remaining argv to [`parse`]. Help requests are printed here and
//! reported as `None`; every other parse failure becomes an input error.

use clap::error::ErrorKind;
use clap::{Args, Parser};

use crate::errors::CliError;

/// How a data command renders its result
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputKind {
    #[default]
    Text,
    Json,
    Markdown,
}

/// Global output flags shared by data commands
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct OutputFlags {
    /// Output result as json
    #[arg(short, long, conflicts_with = "markdown")]
    pub json: bool,

    /// Output result as markdown
    #[arg(short, long)]
    pub markdown: bool,
}

impl OutputFlags {
    pub fn kind(&self) -> OutputKind {
        if self.json {
            OutputKind::Json
        } else if self.markdown {
            OutputKind::Markdown
        } else {
            OutputKind::Text
        }
    }
}

/// Parse `args` against the schema `T`
///
/// `command_path` (e.g. `socket audit-log`) is used as the program name in
/// usage and help text. Returns `Ok(None)` when help or version was printed.
pub fn parse<T: Parser>(command_path: &str, args: &[String]) -> Result<Option<T>, CliError> {
    let argv = std::iter::once(command_path.to_string()).chain(args.iter().cloned());

    match T::try_parse_from(argv) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            // Printing help can only fail on a closed stdout
            let _ = e.print();
            Ok(None)
        }
        Err(e) => Err(CliError::input(e.render().to_string().trim_end())),
    }
}
