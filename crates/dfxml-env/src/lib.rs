//! # dfxml-env
//!
//! Environment facts for DFXML documents.
//!
//! Each collector returns a plain record (also `Serialize`, for JSON
//! reports). Records reach the document only through the public
//! [`DfxmlWriter`] operations, via [`WriteDfxml`].
//!
//! | Module | Element | Source |
//! |--------|---------|--------|
//! | [`creator`] | `<creator>` | program name/version plus the two blocks below |
//! | [`build_info`] | `<build_environment>` | compile-time env (`build.rs`) |
//! | [`execution`] | `<execution_environment>` | `uname`, uid, username, clock |
//! | [`cpuid`] | `<cpuid>` | `cpuid` instruction (x86 only) |
//! | [`rusage`] | `<rusage>` | `getrusage` (Unix only) |
//! | [`command_line`] | - | argv reconstruction |
//!
//! ```rust,no_run
//! use dfxml_core::DfxmlWriter;
//! use dfxml_env::{add_creator, add_rusage};
//!
//! let writer = DfxmlWriter::create("report.xml", false)?;
//! writer.push("dfxml", "version='1.0'")?;
//! add_creator(&writer, "mytool", "0.1.0", None, std::env::args())?;
//! add_rusage(&writer)?;
//! writer.pop()?;
//! writer.close()?;
//! # Ok::<(), dfxml_env::EnvError>(())
//! ```

pub mod build_info;
pub mod command_line;
pub mod cpuid;
pub mod creator;
pub mod error;
pub mod execution;
pub mod rusage;

use dfxml_core::DfxmlWriter;

pub use build_info::{BuildEnvironment, LibraryVersion};
pub use command_line::make_command_line;
pub use cpuid::CpuId;
pub use creator::{add_creator, Creator};
pub use error::{EnvError, Result};
pub use execution::{ExecutionEnvironment, OsInfo};
pub use rusage::{add_rusage, ResourceUsage};

/// A fact record that knows how to write itself into a document.
pub trait WriteDfxml {
    fn write_dfxml(&self, writer: &DfxmlWriter) -> Result<()>;
}
