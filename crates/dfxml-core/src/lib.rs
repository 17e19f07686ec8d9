//! # dfxml-core
//!
//! Streaming writer for Digital Forensics XML (DFXML) documents.
//!
//! ## Overview
//!
//! A forensic tool opens a [`DfxmlWriter`], streams nested elements describing
//! what it did (environment facts, timings, results) and closes it. The
//! writer keeps the document well formed, escapes text, records timing
//! deltas and, on request, injects a DTD declaring every element it wrote.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`escape`] | Text escaping, attribute building, tag-name sanitizing |
//! | [`tags`] | Open-element stack and element-name registry |
//! | [`clock`] | Wall-clock marks and timestamp deltas |
//! | [`sink`] | Output destinations and the two-pass DTD rewrite |
//! | [`dtd`] | DTD block generation |
//! | [`config`] | Writer configuration |
//! | [`writer`] | The [`DfxmlWriter`] facade |
//! | [`error`] | Error types |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dfxml_core::DfxmlWriter;
//!
//! let writer = DfxmlWriter::create("report.xml", true)?;
//! writer.push("dfxml", "version='1.0'")?;
//! writer.write_element("source", "disk.raw", "")?;
//! writer.add_timestamp("done")?;
//! writer.pop()?;
//! writer.close()?;
//! # Ok::<(), dfxml_core::DfxmlError>(())
//! ```
//!
//! ## Output
//!
//! ```text
//! <?xml version='1.0' encoding='UTF-8'?>
//! <!DOCTYPE fiwalk
//! [
//! <!ELEMENT dfxml ANY >
//! <!ELEMENT source ANY >
//! <!ELEMENT timestamp ANY >
//! <!ATTLIST volume startsector CDATA #IMPLIED>
//! <!ATTLIST run start CDATA #IMPLIED>
//! <!ATTLIST run len CDATA #IMPLIED>
//! ]>
//! <dfxml version='1.0'>
//!   <source>disk.raw</source>
//!   <timestamp name='done' delta='0.000012' total='0.000012'/>
//! </dfxml>
//! ```

pub mod clock;
pub mod config;
pub mod dtd;
pub mod error;
pub mod escape;
pub mod sink;
pub mod tags;
pub mod writer;

pub use clock::{Clock, Elapsed, ManualClock, Mark, SystemClock, TimeTracker, TimestampDeltas};
pub use config::{OutputTarget, WriterConfig};
pub use dtd::Dtd;
pub use error::{DfxmlError, ErrorKind, Result};
pub use escape::{escape_text, render_map, sanitize_tag_name, unescape_text, Attributes};
pub use sink::{OutputSink, SharedBuffer};
pub use writer::{DfxmlWriter, XML_DECLARATION};
