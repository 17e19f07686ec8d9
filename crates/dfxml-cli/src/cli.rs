//! CLI argument definitions for dfxml.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `report` | Write a DFXML document describing this run's environment |
//! | `escape` | Print text escaped for DFXML element bodies |
//! | `tag-name` | Print an element name derived from arbitrary text |
//!
//! # Examples
//!
//! ```bash
//! # Environment report on stdout
//! dfxml report
//!
//! # Report file with an injected DTD
//! dfxml report --output run.xml --dtd
//!
//! # Same facts as JSON
//! dfxml report --format json
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Digital Forensics XML writer
#[derive(Debug, Parser)]
#[command(name = "dfxml", author, version, about = "Digital Forensics XML writer")]
pub struct Cli {
    /// Log debug output to stderr (overrides RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write a creator/environment report.
    Report(ReportArgs),
    /// Escape text for use in element bodies and attributes.
    Escape(TextArgs),
    /// Derive an element name from text.
    TagName(TextArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// DFXML document.
    Xml,
    /// The collected facts as one JSON object.
    Json,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Output file (stdout when omitted).
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Inject a DTD declaring every element (requires --output).
    #[arg(long, default_value_t = false, requires = "output")]
    pub dtd: bool,

    /// Staging file template; trailing X characters are randomized.
    #[arg(long, env = "DFXML_TEMPFILE_TEMPLATE")]
    pub tempfile_template: Option<String>,

    /// Name of the DOCTYPE declaration.
    #[arg(long, env = "DFXML_DOCTYPE_ROOT")]
    pub doctype_root: Option<String>,

    /// Program name recorded in the creator block.
    #[arg(long, default_value = "dfxml")]
    pub program: String,

    /// Program version recorded in the creator block.
    #[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
    pub program_version: String,

    /// Source revision recorded in the creator block.
    #[arg(long)]
    pub commit: Option<String>,

    /// Library to report, as NAME=VERSION (repeatable).
    #[arg(long = "library", value_name = "NAME=VERSION")]
    pub libraries: Vec<String>,

    #[arg(long, value_enum, default_value_t = ReportFormat::Xml)]
    pub format: ReportFormat,
}

#[derive(Debug, Args)]
pub struct TextArgs {
    pub text: String,
}
