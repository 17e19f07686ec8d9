mod report;
mod text;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Report(args) => report::run(args),
        Command::Escape(args) => text::escape(args),
        Command::TagName(args) => text::tag_name(args),
    }
}
