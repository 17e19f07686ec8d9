//! # Streaming DFXML Writer
//!
//! [`DfxmlWriter`] streams a nested XML document to an [`OutputSink`],
//! tracking open elements for indentation and every element name for DTD
//! generation.
//!
//! ## Example
//!
//! ```rust
//! use dfxml_core::{DfxmlWriter, SharedBuffer};
//!
//! let buffer = SharedBuffer::new();
//! let writer = DfxmlWriter::from_writer(buffer.clone())?;
//! writer.push("dfxml", "version='1.0'")?;
//! writer.write_element("program", "fiwalk", "")?;
//! writer.write_formatted("pid", "", format_args!("{}", 4242))?;
//! writer.add_timestamp("scan")?;
//! writer.pop()?;
//! writer.close()?;
//!
//! assert!(buffer.contents().contains("  <program>fiwalk</program>\n"));
//! # Ok::<(), dfxml_core::DfxmlError>(())
//! ```
//!
//! ## Thread Safety
//!
//! Every operation takes the same internal lock for its full duration, so
//! calls from different threads land in the output as whole units. Leaf
//! writes (`write_element`, `write_formatted`, `comment`, ...) are complete
//! lines and are flushed before the lock is released. `push`/`pop` are
//! serialized too, but which thread's element ends up nested inside which is
//! still up to the callers.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Write as _};
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::{Clock, Elapsed, SystemClock, TimeTracker, TimestampDeltas};
use crate::config::{OutputTarget, WriterConfig};
use crate::dtd::Dtd;
use crate::error::Result;
use crate::escape::{escape_text, render_map, Attributes};
use crate::sink::OutputSink;
use crate::tags::{validate_tag, TagRegistry, TagStack};

/// First line of every document.
pub const XML_DECLARATION: &str = "<?xml version='1.0' encoding='UTF-8'?>\n";

/// Element name used by [`DfxmlWriter::add_timestamp`].
pub const TIMESTAMP_TAG: &str = "timestamp";

struct DocumentState {
    sink: OutputSink,
    stack: TagStack,
    registry: TagRegistry,
    clock: TimeTracker,
    one_line: bool,
}

impl DocumentState {
    fn indent(&self, line: &mut String) {
        if !self.one_line {
            for _ in 0..self.stack.depth() {
                line.push_str("  ");
            }
        }
    }

    fn end_line(&self, line: &mut String) {
        if !self.one_line {
            line.push('\n');
        }
    }

    /// Validate and register `tag`, returning the bare element name.
    fn register<'t>(&mut self, tag: &'t str) -> Result<&'t str> {
        let name = validate_tag(tag)?;
        self.registry.register(name);
        Ok(name)
    }

    fn emit(&mut self, text: &str) -> Result<()> {
        self.sink.write_all(text.as_bytes())?;
        Ok(())
    }

    fn emit_and_flush(&mut self, text: &str) -> Result<()> {
        self.sink.write_all(text.as_bytes())?;
        self.sink.flush()?;
        Ok(())
    }

    /// Render `<tag attrs>body</tag>` (or `<tag attrs/>` for an empty body)
    /// as a single indented line.
    fn leaf_line(&mut self, tag: &str, attrs: &str, body: &str) -> Result<String> {
        let name = self.register(tag)?;
        let mut line = String::with_capacity(2 * name.len() + attrs.len() + body.len() + 16);
        self.indent(&mut line);
        line.push('<');
        line.push_str(name);
        if !attrs.is_empty() {
            line.push(' ');
            line.push_str(attrs);
        }
        if body.is_empty() {
            line.push_str("/>");
        } else {
            line.push('>');
            line.push_str(body);
            line.push_str("</");
            line.push_str(name);
            line.push('>');
        }
        self.end_line(&mut line);
        Ok(line)
    }

    fn warn_unclosed(&self, message: &str) {
        if !self.stack.is_empty() {
            warn!(
                open = self.stack.depth(),
                innermost = self.stack.top().unwrap_or_default(),
                "{message}"
            );
        }
    }

    fn write_leaf(&mut self, tag: &str, attrs: &str, body: &str) -> Result<()> {
        let line = self.leaf_line(tag, attrs, body)?;
        self.emit_and_flush(&line)
    }
}

/// A DFXML document being written.
///
/// Created with one of the constructors, which write the XML declaration,
/// and finished with [`close`](Self::close).
pub struct DfxmlWriter {
    state: Mutex<DocumentState>,
    dtd: Dtd,
    make_dtd: bool,
}

impl DfxmlWriter {
    /// Write to standard output.
    pub fn stdout() -> Result<Self> {
        Self::open(WriterConfig::default())
    }

    /// Write to `path`, optionally staging the body so a DTD can be
    /// injected on close.
    pub fn create(path: impl AsRef<Path>, make_dtd: bool) -> Result<Self> {
        Self::open(WriterConfig::file(path.as_ref()).with_dtd(make_dtd))
    }

    /// Write to any destination. DTD generation is not available.
    pub fn from_writer(out: impl Write + Send + 'static) -> Result<Self> {
        Self::from_writer_with_clock(out, Box::new(SystemClock))
    }

    pub fn from_writer_with_clock(
        out: impl Write + Send + 'static,
        clock: Box<dyn Clock>,
    ) -> Result<Self> {
        Self::start(OutputSink::writer(out), Dtd::default(), false, clock)
    }

    pub fn open(config: WriterConfig) -> Result<Self> {
        Self::open_with_clock(config, Box::new(SystemClock))
    }

    pub fn open_with_clock(config: WriterConfig, clock: Box<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let sink = match &config.output {
            OutputTarget::Stdout => OutputSink::stdout(),
            OutputTarget::File(path) if config.make_dtd => {
                OutputSink::staged(path, &config.resolved_template(path))?
            }
            OutputTarget::File(path) => OutputSink::file(path)?,
        };
        info!(
            output = ?config.output,
            dtd = config.make_dtd,
            "opened DFXML document"
        );
        Self::start(sink, Dtd::new(config.doctype_root), config.make_dtd, clock)
    }

    fn start(
        mut sink: OutputSink,
        dtd: Dtd,
        make_dtd: bool,
        clock: Box<dyn Clock>,
    ) -> Result<Self> {
        let clock = TimeTracker::new(clock);
        sink.write_all(XML_DECLARATION.as_bytes())?;
        Ok(Self {
            state: Mutex::new(DocumentState {
                sink,
                stack: TagStack::new(),
                registry: TagRegistry::new(),
                clock,
                one_line: false,
            }),
            dtd,
            make_dtd,
        })
    }

    // State is only mutated after validation succeeds, so a panic while the
    // lock was held cannot leave it half-updated.
    fn lock(&self) -> MutexGuard<'_, DocumentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a nested element.
    pub fn push(&self, tag: &str, attrs: impl AsRef<str>) -> Result<()> {
        let attrs = attrs.as_ref();
        let mut state = self.lock();
        let name = state.register(tag)?;

        let mut line = String::new();
        state.indent(&mut line);
        line.push('<');
        line.push_str(name);
        if !attrs.is_empty() {
            line.push(' ');
            line.push_str(attrs);
        }
        line.push('>');
        state.end_line(&mut line);

        state.emit(&line)?;
        state.stack.push(name);
        Ok(())
    }

    /// Close the innermost open element. The closing tag always ends its
    /// line, one-line mode included.
    pub fn pop(&self) -> Result<()> {
        let mut state = self.lock();
        let tag = state.stack.pop()?;

        let mut line = String::new();
        state.indent(&mut line);
        line.push_str("</");
        line.push_str(&tag);
        line.push_str(">\n");
        state.emit(&line)
    }

    /// Suspend (or resume) indentation and line breaks.
    ///
    /// Turning one-line mode on writes the current indentation once; turning
    /// it off writes the pending line break.
    pub fn set_one_line(&self, one_line: bool) -> Result<()> {
        let mut state = self.lock();
        let mut text = String::new();
        if one_line {
            state.indent(&mut text);
        } else {
            text.push('\n');
        }
        state.one_line = one_line;
        state.emit(&text)
    }

    /// Write `<tag attrs>value</tag>` with `value` escaped, or `<tag attrs/>`
    /// when `value` is empty.
    pub fn write_element(&self, tag: &str, value: &str, attrs: impl AsRef<str>) -> Result<()> {
        let body = escape_text(value);
        self.lock().write_leaf(tag, attrs.as_ref(), &body)
    }

    /// Like [`write_element`](Self::write_element) but `value` is written
    /// verbatim.
    pub fn write_element_raw(
        &self,
        tag: &str,
        value: &str,
        attrs: impl AsRef<str>,
    ) -> Result<()> {
        self.lock().write_leaf(tag, attrs.as_ref(), value)
    }

    /// Write any displayable value as an escaped element body.
    pub fn write_value(&self, tag: &str, value: impl Display) -> Result<()> {
        let value = value.to_string();
        self.write_element(tag, &value, "")
    }

    /// Write a duration as `seconds.microseconds`.
    pub fn write_duration(&self, tag: &str, value: Duration) -> Result<()> {
        let body = Elapsed::from(value).to_string();
        self.lock().write_leaf(tag, "", &body)
    }

    /// Write an element whose body comes from `format_args!`, verbatim.
    ///
    /// The body is rendered before anything is written; a failing `Display`
    /// implementation leaves the output untouched.
    pub fn write_formatted(
        &self,
        tag: &str,
        attrs: impl AsRef<str>,
        args: fmt::Arguments<'_>,
    ) -> Result<()> {
        let mut body = String::new();
        body.write_fmt(args)?;
        self.lock().write_leaf(tag, attrs.as_ref(), &body)
    }

    /// Write `<!-- text -->` verbatim.
    pub fn comment(&self, text: &str) -> Result<()> {
        let mut state = self.lock();
        let mut line = format!("<!-- {text} -->");
        state.end_line(&mut line);
        state.emit_and_flush(&line)
    }

    /// Write a map as one line of child elements (see
    /// [`render_map`](crate::escape::render_map)).
    pub fn write_map(
        &self,
        map: &BTreeMap<String, String>,
        outer: &str,
        attrs: impl AsRef<str>,
    ) -> Result<()> {
        let outer = validate_tag(outer)?;
        for key in map.keys() {
            validate_tag(key)?;
        }
        let mut state = self.lock();
        state.registry.register(outer);
        for key in map.keys() {
            state.registry.register(key);
        }
        let mut line = String::new();
        state.indent(&mut line);
        line.push_str(&render_map(map, outer, attrs.as_ref()));
        state.end_line(&mut line);
        state.emit_and_flush(&line)
    }

    /// Write `<timestamp name='..' delta='..' total='..'/>`.
    pub fn add_timestamp(&self, name: &str) -> Result<TimestampDeltas> {
        let mut state = self.lock();
        let deltas = state.clock.mark();
        let attrs = Attributes::new()
            .with("name", name)
            .with("delta", deltas.delta)
            .with("total", deltas.total);
        state.write_leaf(TIMESTAMP_TAG, attrs.as_str(), "")?;
        Ok(deltas)
    }

    /// Write text exactly as given.
    pub fn write_raw(&self, text: &str) -> Result<()> {
        self.lock().emit(text)
    }

    pub fn write_raw_fmt(&self, args: fmt::Arguments<'_>) -> Result<()> {
        let mut text = String::new();
        text.write_fmt(args)?;
        self.write_raw(&text)
    }

    /// Time since the document was opened.
    pub fn elapsed(&self) -> Elapsed {
        self.lock().clock.since_start()
    }

    pub fn depth(&self) -> usize {
        self.lock().stack.depth()
    }

    pub fn makes_dtd(&self) -> bool {
        self.make_dtd
    }

    /// Element names emitted so far, sorted.
    pub fn registered_tags(&self) -> Vec<String> {
        self.lock().registry.iter().map(str::to_owned).collect()
    }

    /// Flush the document and, when DTD generation was requested, rewrite the
    /// target with the DTD injected after the declaration.
    ///
    /// Dropping the writer without closing it logs a warning; a staged body
    /// is then left in its staging file.
    pub fn close(mut self) -> Result<()> {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        state.warn_unclosed("closing document with unclosed elements");
        debug!(
            elements = state.registry.len(),
            dtd = self.make_dtd,
            "closing DFXML document"
        );
        state.sink.finish(&self.dtd, &state.registry)
    }
}

impl Drop for DfxmlWriter {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if state.sink.is_finished() {
            return;
        }
        warn!(
            staged = state.sink.is_staged(),
            "DFXML document dropped without close"
        );
        state.warn_unclosed("dropped document has unclosed elements");
    }
}

impl fmt::Debug for DfxmlWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("DfxmlWriter")
            .field("sink", &state.sink)
            .field("depth", &state.stack.depth())
            .field("one_line", &state.one_line)
            .field("make_dtd", &self.make_dtd)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, Mark};
    use crate::error::{DfxmlError, ErrorKind};
    use crate::sink::SharedBuffer;

    fn buffered() -> (DfxmlWriter, SharedBuffer) {
        let buffer = SharedBuffer::new();
        let writer = DfxmlWriter::from_writer(buffer.clone()).expect("writer");
        (writer, buffer)
    }

    fn body(buffer: &SharedBuffer) -> String {
        buffer
            .contents()
            .strip_prefix(XML_DECLARATION)
            .expect("declaration first")
            .to_owned()
    }

    #[test]
    fn nested_elements_are_indented() {
        let (writer, buffer) = buffered();
        writer.push("dfxml", "version='1.0'").unwrap();
        writer.push("volume", "offset='0'").unwrap();
        writer.write_element("ftype", "ntfs", "").unwrap();
        writer.pop().unwrap();
        writer.pop().unwrap();
        writer.close().unwrap();

        assert_eq!(
            body(&buffer),
            "<dfxml version='1.0'>\n\
             \x20\x20<volume offset='0'>\n\
             \x20\x20\x20\x20<ftype>ntfs</ftype>\n\
             \x20\x20</volume>\n\
             </dfxml>\n"
        );
    }

    #[test]
    fn empty_value_self_closes() {
        let (writer, buffer) = buffered();
        writer.write_element("x", "", "").unwrap();
        writer.write_element("y", "", "a='1'").unwrap();
        writer.write_element("x", "5", "").unwrap();
        assert_eq!(body(&buffer), "<x/>\n<y a='1'/>\n<x>5</x>\n");
    }

    #[test]
    fn values_are_escaped_unless_raw() {
        let (writer, buffer) = buffered();
        writer.write_element("filename", "a<b>&\"c\"\n", "").unwrap();
        writer.write_element_raw("xml", "<inner/>", "").unwrap();
        assert_eq!(
            body(&buffer),
            "<filename>a&lt;b&gt;&amp;&quot;c&quot;%0A</filename>\n<xml><inner/></xml>\n"
        );
    }

    #[test]
    fn tag_with_space_fails_before_writing() {
        let (writer, buffer) = buffered();
        let err = writer.push("a b", "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        let err = writer.write_element("c d", "1", "").unwrap_err();
        assert!(matches!(err, DfxmlError::InvalidTagName { .. }));
        assert_eq!(body(&buffer), "");
        assert_eq!(writer.depth(), 0);
        assert!(writer.registered_tags().is_empty());
    }

    #[test]
    fn pop_without_push_is_protocol_misuse() {
        let (writer, buffer) = buffered();
        let err = writer.pop().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolMisuse);
        assert_eq!(body(&buffer), "");
    }

    #[test]
    fn formatted_body_is_verbatim() {
        let (writer, buffer) = buffered();
        writer
            .write_formatted("compiler", "", format_args!("{}.{}.{} ({})", 1, 80, 0, "stable"))
            .unwrap();
        writer.write_formatted("uid", "", format_args!("{}", 0)).unwrap();
        assert_eq!(
            body(&buffer),
            "<compiler>1.80.0 (stable)</compiler>\n<uid>0</uid>\n"
        );
    }

    #[test]
    fn failing_display_writes_nothing() {
        struct Broken;
        impl Display for Broken {
            fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
                Err(fmt::Error)
            }
        }

        let (writer, buffer) = buffered();
        let err = writer
            .write_formatted("broken", "", format_args!("{}", Broken))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Formatting);
        assert_eq!(body(&buffer), "");
    }

    #[test]
    fn comments_are_verbatim() {
        let (writer, buffer) = buffered();
        writer.push("dfxml", "").unwrap();
        writer.comment("scan <started>").unwrap();
        assert_eq!(body(&buffer), "<dfxml>\n<!-- scan <started> -->\n");
    }

    #[test]
    fn one_line_mode_suppresses_layout() {
        let (writer, buffer) = buffered();
        writer.push("dfxml", "").unwrap();
        writer.set_one_line(true).unwrap();
        writer.push("byte_run", "offset='0'").unwrap();
        writer.write_element("len", "512", "").unwrap();
        writer.pop().unwrap();
        writer.set_one_line(false).unwrap();
        writer.write_element("after", "1", "").unwrap();
        assert_eq!(
            body(&buffer),
            "<dfxml>\n  <byte_run offset='0'><len>512</len></byte_run>\n\n  <after>1</after>\n"
        );
    }

    #[test]
    fn timestamps_report_delta_and_total() {
        let clock = ManualClock::new(Mark::new(1_000, 0));
        let buffer = SharedBuffer::new();
        let writer =
            DfxmlWriter::from_writer_with_clock(buffer.clone(), Box::new(clock.clone())).unwrap();

        clock.advance(Duration::from_millis(1500));
        writer.add_timestamp("phase1").unwrap();
        clock.advance(Duration::from_micros(2_000_001));
        let second = writer.add_timestamp("phase2").unwrap();
        assert_eq!(second.total.to_string(), "3.500001");

        assert_eq!(
            body(&buffer),
            "<timestamp name='phase1' delta='1.500000' total='1.500000'/>\n\
             <timestamp name='phase2' delta='2.000001' total='3.500001'/>\n"
        );
        assert_eq!(writer.registered_tags(), vec![String::from("timestamp")]);
    }

    #[test]
    fn durations_and_values() {
        let (writer, buffer) = buffered();
        writer.write_duration("utime", Duration::from_micros(1_000_042)).unwrap();
        writer.write_value("maxrss", 20480_i64).unwrap();
        assert_eq!(body(&buffer), "<utime>1.000042</utime>\n<maxrss>20480</maxrss>\n");
    }

    #[test]
    fn maps_register_every_child_tag() {
        let (writer, buffer) = buffered();
        let mut map = BTreeMap::new();
        map.insert(String::from("md5"), String::from("abc"));
        map.insert(String::from("sha1"), String::from("def"));
        writer.write_map(&map, "hashes", "").unwrap();
        assert_eq!(body(&buffer), "<hashes><md5>abc</md5><sha1>def</sha1></hashes>\n");
        assert_eq!(writer.registered_tags(), ["hashes", "md5", "sha1"]);
    }

    #[test]
    fn map_with_bad_key_registers_nothing() {
        let (writer, buffer) = buffered();
        let mut map = BTreeMap::new();
        map.insert(String::from("md5"), String::from("abc"));
        map.insert(String::from("bad key"), String::from("x"));
        let err = writer.write_map(&map, "hashes", "").unwrap_err();
        assert!(matches!(err, DfxmlError::InvalidTagName { ref tag } if tag == "bad key"));
        assert_eq!(body(&buffer), "");
        assert!(writer.registered_tags().is_empty());
    }

    #[test]
    fn pop_ends_the_line_in_one_line_mode() {
        let (writer, buffer) = buffered();
        writer.set_one_line(true).unwrap();
        writer.push("byte_run", "").unwrap();
        writer.pop().unwrap();
        writer.set_one_line(false).unwrap();
        assert_eq!(body(&buffer), "<byte_run></byte_run>\n\n");
    }

    #[test]
    fn dropped_writer_keeps_staged_body() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("r.xml");
        let template = dir.path().join("stage_XXXXXX");
        let config = WriterConfig::file(&target)
            .with_dtd(true)
            .with_tempfile_template(template.to_string_lossy());

        let writer = DfxmlWriter::open(config).unwrap();
        writer.push("dfxml", "").unwrap();
        writer.write_element("important", "evidence", "").unwrap();
        writer.pop().unwrap();
        drop(writer);

        let kept: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| path != &target)
            .collect();
        assert_eq!(kept.len(), 1);
        let staged = std::fs::read_to_string(&kept[0]).unwrap();
        assert!(staged.starts_with(XML_DECLARATION));
        assert!(staged.contains("  <important>evidence</important>\n"));
    }

    #[test]
    fn raw_writes_pass_through() {
        let (writer, buffer) = buffered();
        writer.write_raw("<!-- raw -->").unwrap();
        writer.write_raw_fmt(format_args!("{}-{}", 1, 2)).unwrap();
        assert_eq!(body(&buffer), "<!-- raw -->1-2");
    }

    #[test]
    fn writer_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DfxmlWriter>();
    }
}
