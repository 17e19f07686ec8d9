//! # Output Sinks
//!
//! Where document bytes go while a [`DfxmlWriter`](crate::DfxmlWriter) is
//! open, and what happens to them on close.
//!
//! | Sink | Finish |
//! |------|--------|
//! | stdout | flush |
//! | file | flush |
//! | staged | two-pass rewrite with an injected DTD, staging file removed |
//! | writer | flush |
//!
//! A staged sink streams the body into a temporary file next to the target.
//! Only when the document closes is the full element vocabulary known, so the
//! target is then written as: declaration line, DTD block, remainder of the
//! staging file copied byte for byte.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Stdout, Write};
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::dtd::Dtd;
use crate::error::{DfxmlError, Result};
use crate::tags::TagRegistry;

/// Placeholder character replaced by random characters in a staging template.
const TEMPLATE_PLACEHOLDER: char = 'X';

/// Default staging template for a given target: `<target>_tmp_XXXXXXXX`.
pub fn default_tempfile_template(target: &Path) -> String {
    format!("{}_tmp_XXXXXXXX", target.display())
}

/// A parsed staging-file template such as `/tmp/xml_XXXXXXXX`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempTemplate {
    dir: PathBuf,
    prefix: String,
    random_len: usize,
}

impl TempTemplate {
    /// Split a template into directory, file prefix and the number of
    /// trailing placeholder characters.
    pub fn parse(template: &str) -> Self {
        let path = Path::new(template);
        let file_part = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let prefix = file_part.trim_end_matches(TEMPLATE_PLACEHOLDER).to_owned();
        let random_len = file_part.len() - prefix.len();
        Self {
            dir,
            prefix,
            random_len,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn random_len(&self) -> usize {
        self.random_len
    }

    fn create(&self) -> io::Result<NamedTempFile> {
        tempfile::Builder::new()
            .prefix(&self.prefix)
            .rand_bytes(self.random_len)
            .tempfile_in(&self.dir)
    }
}

/// Cloneable in-memory destination; every clone sees the same bytes.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

enum SinkKind {
    Stdout(BufWriter<Stdout>),
    File {
        path: PathBuf,
        out: BufWriter<File>,
    },
    Staged {
        target: PathBuf,
        staging: BufWriter<NamedTempFile>,
    },
    Writer(Box<dyn Write + Send>),
    Finished,
}

/// The byte destination owned by a document.
///
/// A staged sink dropped without [`finish`](Self::finish) keeps its staging
/// file on disk and logs where it is.
pub struct OutputSink {
    kind: SinkKind,
}

impl OutputSink {
    pub fn stdout() -> Self {
        Self {
            kind: SinkKind::Stdout(BufWriter::new(io::stdout())),
        }
    }

    /// Create (truncate) `path` and write to it directly.
    pub fn file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = create_target(&path)?;
        Ok(Self {
            kind: SinkKind::File {
                path,
                out: BufWriter::new(file),
            },
        })
    }

    /// Stage output in a temporary file named by `template`.
    ///
    /// The target is created (truncated) here so an unwritable destination
    /// fails at open; its content is only written when the sink is finished.
    pub fn staged(target: impl AsRef<Path>, template: &str) -> Result<Self> {
        let target = target.as_ref().to_path_buf();
        create_target(&target)?;
        let template = TempTemplate::parse(template);
        let staging = template.create().map_err(|source| DfxmlError::Create {
            path: template.dir().join(format!("{}*", template.prefix())),
            source,
        })?;
        debug!(
            target = %target.display(),
            staging = %staging.path().display(),
            "staging document for DTD generation"
        );
        Ok(Self {
            kind: SinkKind::Staged {
                target,
                staging: BufWriter::new(staging),
            },
        })
    }

    pub fn writer(out: impl Write + Send + 'static) -> Self {
        Self {
            kind: SinkKind::Writer(Box::new(out)),
        }
    }

    pub fn is_staged(&self) -> bool {
        matches!(self.kind, SinkKind::Staged { .. })
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.kind, SinkKind::Finished)
    }

    /// Path of the staging file, if any.
    pub fn staging_path(&self) -> Option<&Path> {
        match &self.kind {
            SinkKind::Staged { staging, .. } => Some(staging.get_ref().path()),
            _ => None,
        }
    }

    /// Final destination path for file-backed sinks.
    pub fn target_path(&self) -> Option<&Path> {
        match &self.kind {
            SinkKind::File { path, .. } => Some(path),
            SinkKind::Staged { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Flush and close the sink. A staged sink is rewritten into its target
    /// with `dtd` injected after the first line.
    ///
    /// Whatever the outcome, the sink is finished afterwards and further
    /// writes fail.
    pub fn finish(&mut self, dtd: &Dtd, registry: &TagRegistry) -> Result<()> {
        match mem::replace(&mut self.kind, SinkKind::Finished) {
            SinkKind::Stdout(mut out) => Ok(out.flush()?),
            SinkKind::File { mut out, .. } => Ok(out.flush()?),
            SinkKind::Writer(mut out) => Ok(out.flush()?),
            SinkKind::Staged { target, staging } => {
                let staging = unbuffer_staging(staging, &target)?;
                rewrite_with_dtd(staging, &target, dtd, registry)
            }
            SinkKind::Finished => Ok(()),
        }
    }
}

impl Drop for OutputSink {
    fn drop(&mut self) {
        match mem::replace(&mut self.kind, SinkKind::Finished) {
            SinkKind::Staged { target, staging } => {
                match unbuffer_staging(staging, &target) {
                    Ok(staging) => {
                        let staging_path = staging.path().to_path_buf();
                        if keep_for_recovery(staging) {
                            warn!(
                                target = %target.display(),
                                staging = %staging_path.display(),
                                "document dropped before it was finished; staged body kept"
                            );
                        }
                    }
                    Err(err) => warn!("document dropped before it was finished: {err}"),
                }
            }
            SinkKind::Stdout(mut out) => drop(out.flush()),
            SinkKind::File { mut out, .. } => drop(out.flush()),
            SinkKind::Writer(mut out) => drop(out.flush()),
            SinkKind::Finished => {}
        }
    }
}

fn create_target(path: &Path) -> Result<File> {
    File::create(path).map_err(|source| DfxmlError::Create {
        path: path.to_path_buf(),
        source,
    })
}

/// Persist a staging file under its temporary name. Returns whether it was
/// kept.
fn keep_for_recovery(staging: NamedTempFile) -> bool {
    let staging_path = staging.path().to_path_buf();
    match staging.keep() {
        Ok(_) => true,
        Err(err) => {
            warn!(staging = %staging_path.display(), "could not keep staging file: {err}");
            false
        }
    }
}

/// Flush the staging buffer. If that fails the staging file is kept and the
/// error names both paths.
fn unbuffer_staging(staging: BufWriter<NamedTempFile>, target: &Path) -> Result<NamedTempFile> {
    staging.into_inner().map_err(|err| {
        let (source, writer) = err.into_parts();
        let (staging, _) = writer.into_parts();
        let staging_path = staging.path().to_path_buf();
        keep_for_recovery(staging);
        DfxmlError::Rewrite {
            target: target.to_path_buf(),
            staging: staging_path,
            source,
        }
    })
}

fn rewrite_with_dtd(
    staging: NamedTempFile,
    target: &Path,
    dtd: &Dtd,
    registry: &TagRegistry,
) -> Result<()> {
    let staging_path = staging.path().to_path_buf();
    let input = match staging.reopen() {
        Ok(input) => input,
        Err(source) => {
            keep_for_recovery(staging);
            return Err(DfxmlError::Reopen {
                path: staging_path,
                source,
            });
        }
    };

    let output = match File::create(target) {
        Ok(file) => file,
        Err(source) => {
            keep_for_recovery(staging);
            return Err(DfxmlError::Finalize {
                target: target.to_path_buf(),
                staging: staging_path,
                source,
            });
        }
    };

    let copied = match copy_with_dtd(input, output, dtd, registry) {
        Ok(copied) => copied,
        Err(source) => {
            keep_for_recovery(staging);
            return Err(DfxmlError::Rewrite {
                target: target.to_path_buf(),
                staging: staging_path,
                source,
            });
        }
    };

    staging.close()?;
    debug!(
        target = %target.display(),
        elements = registry.len(),
        body_bytes = copied,
        "document finalized with DTD"
    );
    Ok(())
}

/// Declaration line, DTD, then the rest of `input` byte for byte.
fn copy_with_dtd(
    input: File,
    output: File,
    dtd: &Dtd,
    registry: &TagRegistry,
) -> io::Result<u64> {
    let mut input = BufReader::new(input);
    let mut output = BufWriter::new(output);

    let mut declaration = Vec::new();
    input.read_until(b'\n', &mut declaration)?;
    output.write_all(&declaration)?;
    if !declaration.ends_with(b"\n") {
        output.write_all(b"\n")?;
    }
    dtd.write_to(&mut output, registry)?;
    let copied = io::copy(&mut input, &mut output)?;
    output.flush()?;
    Ok(copied)
}

fn finished_error() -> io::Error {
    io::Error::other("document already closed")
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.kind {
            SinkKind::Stdout(out) => out.write(buf),
            SinkKind::File { out, .. } => out.write(buf),
            SinkKind::Staged { staging, .. } => staging.write(buf),
            SinkKind::Writer(out) => out.write(buf),
            SinkKind::Finished => Err(finished_error()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.kind {
            SinkKind::Stdout(out) => out.flush(),
            SinkKind::File { out, .. } => out.flush(),
            SinkKind::Staged { staging, .. } => staging.flush(),
            SinkKind::Writer(out) => out.flush(),
            SinkKind::Finished => Err(finished_error()),
        }
    }
}

impl std::fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.kind {
            SinkKind::Stdout(_) => "stdout",
            SinkKind::File { .. } => "file",
            SinkKind::Staged { .. } => "staged",
            SinkKind::Writer(_) => "writer",
            SinkKind::Finished => "finished",
        };
        f.debug_struct("OutputSink")
            .field("kind", &kind)
            .field("target", &self.target_path())
            .finish()
    }
}
