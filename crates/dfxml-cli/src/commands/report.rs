//! Environment report: a `<dfxml>` document with the creator block, resource
//! usage and timestamps around the collection.

use std::io::{self, Write};

use dfxml_core::{DfxmlWriter, OutputTarget, WriterConfig};
use dfxml_env::{
    add_rusage, BuildEnvironment, Creator, LibraryVersion, ResourceUsage, WriteDfxml,
};
use serde::Serialize;
use tracing::info;

use crate::cli::{ReportArgs, ReportFormat};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct JsonReport {
    creator: Creator,
    #[serde(skip_serializing_if = "Option::is_none")]
    rusage: Option<ResourceUsage>,
}

pub fn run(args: &ReportArgs) -> Result<(), CliError> {
    let creator = collect_creator(args)?;
    match args.format {
        ReportFormat::Json => write_json(args, creator),
        ReportFormat::Xml => {
            let writer = DfxmlWriter::open(writer_config(args))?;
            write_report(&writer, &creator)?;
            writer.close()?;
            if let Some(path) = &args.output {
                info!(path = %path.display(), dtd = args.dtd, "report written");
            }
            Ok(())
        }
    }
}

pub(crate) fn writer_config(args: &ReportArgs) -> WriterConfig {
    let mut config = WriterConfig::from_env().with_dtd(args.dtd);
    if let Some(path) = &args.output {
        config = config.with_output(OutputTarget::File(path.clone()));
    }
    if let Some(template) = &args.tempfile_template {
        config = config.with_tempfile_template(template.clone());
    }
    if let Some(root) = &args.doctype_root {
        config = config.with_doctype_root(root.clone());
    }
    config
}

fn parse_library(entry: &str) -> Result<LibraryVersion, CliError> {
    match entry.split_once('=') {
        Some((name, version)) if !name.is_empty() && !version.is_empty() => {
            Ok(LibraryVersion::new(name, version))
        }
        _ => Err(CliError::Argument(format!(
            "library '{entry}' must be given as NAME=VERSION"
        ))),
    }
}

fn collect_creator(args: &ReportArgs) -> Result<Creator, CliError> {
    let mut build = BuildEnvironment::current();
    for entry in &args.libraries {
        build = build.with_library(parse_library(entry)?);
    }
    let creator = Creator::collect(
        args.program.as_str(),
        args.program_version.as_str(),
        args.commit.clone(),
        std::env::args(),
    )?;
    Ok(creator.with_build(build))
}

/// Write the report body into an already open document.
pub(crate) fn write_report(writer: &DfxmlWriter, creator: &Creator) -> Result<(), CliError> {
    writer.push("dfxml", "version='1.0'")?;
    writer.add_timestamp("start")?;
    creator.write_dfxml(writer)?;
    add_rusage(writer)?;
    writer.add_timestamp("end")?;
    writer.pop()?;
    Ok(())
}

fn write_json(args: &ReportArgs, creator: Creator) -> Result<(), CliError> {
    let report = JsonReport {
        creator,
        rusage: dfxml_env::rusage::collect(),
    };
    let payload = serde_json::to_string_pretty(&report)?;
    match &args.output {
        Some(path) => std::fs::write(path, payload + "\n")?,
        None => writeln!(io::stdout().lock(), "{payload}")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use clap::Parser;
    use dfxml_core::SharedBuffer;

    use crate::cli::{Cli, Command};

    fn report_args(argv: &[&str]) -> ReportArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Command::Report(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn library_entries_need_name_and_version() {
        assert_eq!(
            parse_library("tsk=4.12").unwrap(),
            LibraryVersion::new("tsk", "4.12")
        );
        assert!(matches!(parse_library("tsk"), Err(CliError::Argument(_))));
        assert!(parse_library("=1").is_err());
    }

    #[test]
    fn config_follows_flags() {
        let args = report_args(&[
            "dfxml",
            "report",
            "-o",
            "out.xml",
            "--dtd",
            "--doctype-root",
            "dfxml",
        ]);
        let config = writer_config(&args);
        assert_eq!(config.output, OutputTarget::File(PathBuf::from("out.xml")));
        assert!(config.make_dtd);
        assert_eq!(config.doctype_root, "dfxml");
    }

    #[test]
    fn report_contains_creator_rusage_and_timestamps() {
        let args = report_args(&["dfxml", "report", "--program", "fiwalk", "--commit", "abc"]);
        let creator = collect_creator(&args).unwrap();

        let buffer = SharedBuffer::new();
        let writer = DfxmlWriter::from_writer(buffer.clone()).unwrap();
        write_report(&writer, &creator).unwrap();
        writer.close().unwrap();

        let document = buffer.contents();
        assert!(document.contains("<dfxml version='1.0'>\n  <timestamp name='start'"));
        assert!(document.contains("    <program>fiwalk</program>\n"));
        assert!(document.contains("    <commit>abc</commit>\n"));
        assert!(document.contains("  <timestamp name='end'"));
        assert!(document.ends_with("</dfxml>\n"));
        #[cfg(unix)]
        assert!(document.contains("  <rusage>\n"));
    }

    #[test]
    fn dtd_report_is_written_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xml");
        let path_arg = path.to_string_lossy().into_owned();
        let args = report_args(&["dfxml", "report", "--output", &path_arg, "--dtd"]);

        run(&args).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let mut lines = written.lines();
        assert_eq!(lines.next(), Some("<?xml version='1.0' encoding='UTF-8'?>"));
        assert!(lines.next().unwrap().starts_with("<!DOCTYPE "));
        assert!(written.contains("<!ELEMENT creator ANY >\n"));
        assert!(written.contains("<!ELEMENT timestamp ANY >\n"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn json_report_is_machine_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let path_arg = path.to_string_lossy().into_owned();
        let args = report_args(&[
            "dfxml",
            "report",
            "--format",
            "json",
            "--output",
            &path_arg,
            "--library",
            "zlib=1.3",
        ]);

        run(&args).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["creator"]["program"], "dfxml");
        assert_eq!(value["creator"]["build"]["libraries"][0]["name"], "zlib");
    }
}
