//! The `<creator>` block: which program produced the document, how it was
//! built and where it ran.

use dfxml_core::DfxmlWriter;
use serde::Serialize;

use crate::build_info::BuildEnvironment;
use crate::command_line::make_command_line;
use crate::error::Result;
use crate::execution::ExecutionEnvironment;
use crate::WriteDfxml;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Creator {
    pub program: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    pub build: BuildEnvironment,
    pub execution: ExecutionEnvironment,
}

impl Creator {
    /// Gather build and execution facts for `program` run with `args`.
    pub fn collect<I, S>(
        program: impl Into<String>,
        version: impl Into<String>,
        commit: Option<String>,
        args: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            program: program.into(),
            version: version.into(),
            commit: commit.filter(|c| !c.is_empty()),
            build: BuildEnvironment::current(),
            execution: ExecutionEnvironment::collect(make_command_line(args))?,
        })
    }

    pub fn with_build(mut self, build: BuildEnvironment) -> Self {
        self.build = build;
        self
    }
}

impl WriteDfxml for Creator {
    fn write_dfxml(&self, writer: &DfxmlWriter) -> Result<()> {
        writer.push("creator", "version='1.0'")?;
        writer.write_element("program", &self.program, "")?;
        writer.write_element("version", &self.version, "")?;
        if let Some(commit) = &self.commit {
            writer.write_element("commit", commit, "")?;
        }
        self.build.write_dfxml(writer)?;
        self.execution.write_dfxml(writer)?;
        writer.pop()?;
        Ok(())
    }
}

/// Collect and write a creator block in one call.
pub fn add_creator<I, S>(
    writer: &DfxmlWriter,
    program: &str,
    version: &str,
    commit: Option<&str>,
    args: I,
) -> Result<Creator>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let creator = Creator::collect(program, version, commit.map(str::to_owned), args)?;
    creator.write_dfxml(writer)?;
    Ok(creator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dfxml_core::SharedBuffer;

    #[test]
    fn creator_block_nests_environment() {
        let buffer = SharedBuffer::new();
        let writer = DfxmlWriter::from_writer(buffer.clone()).unwrap();
        writer.push("dfxml", "version='1.0'").unwrap();
        let creator = add_creator(&writer, "fiwalk", "4.3.0", Some(""), ["fiwalk", "-X", "a b"])
            .unwrap();
        writer.pop().unwrap();
        let tags = writer.registered_tags();
        writer.close().unwrap();

        assert_eq!(creator.commit, None, "empty commit is dropped");
        assert_eq!(creator.execution.command_line, "fiwalk -X \"a b\"");

        let document = buffer.contents();
        assert!(document.contains(
            "  <creator version='1.0'>\n    <program>fiwalk</program>\n    <version>4.3.0</version>\n    <build_environment>\n"
        ));
        assert!(document.contains("    <execution_environment>\n"));
        assert!(document.ends_with("    </execution_environment>\n  </creator>\n</dfxml>\n"));
        for tag in ["creator", "build_environment", "execution_environment", "start_time"] {
            assert!(tags.iter().any(|t| t == tag), "{tag} registered");
        }
    }

    #[test]
    fn creator_serializes_to_json() {
        let creator = Creator::collect("tool", "1.0", Some(String::from("deadbeef")), ["tool"])
            .unwrap();
        let json = serde_json::to_value(&creator).unwrap();
        assert_eq!(json["program"], "tool");
        assert_eq!(json["commit"], "deadbeef");
        assert_eq!(json["execution"]["command_line"], "tool");
    }
}
