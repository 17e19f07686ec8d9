//! Text utilities: escaping and tag-name sanitizing.

use std::io::{self, Write};

use dfxml_core::{escape_text, sanitize_tag_name};

use crate::cli::TextArgs;
use crate::error::CliError;

pub fn escape(args: &TextArgs) -> Result<(), CliError> {
    print_line(&escape_text(&args.text))
}

pub fn tag_name(args: &TextArgs) -> Result<(), CliError> {
    let name = sanitize_tag_name(&args.text);
    if name.is_empty() {
        return Err(CliError::Argument(format!(
            "'{}' contains no characters usable in an element name",
            args.text
        )));
    }
    print_line(&name)
}

fn print_line(text: &str) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{text}")?;
    Ok(())
}
