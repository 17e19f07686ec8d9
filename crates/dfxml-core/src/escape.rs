//! # Text Escaping
//!
//! Turns arbitrary text into something that can sit inside element bodies
//! and single-quoted attribute values.
//!
//! | Input | Output |
//! |-------|--------|
//! | `&` `<` `>` `'` `"` | `&amp;` `&lt;` `&gt;` `&apos;` `&quot;` |
//! | NUL CR LF TAB | `%00` `%0D` `%0A` `%09` |
//! | anything else | unchanged (non-ASCII included) |
//!
//! Percent signs are not themselves encoded, so [`unescape_text`] is only an
//! exact inverse for text without `%`.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

fn replacement(ch: char) -> Option<&'static str> {
    match ch {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '\'' => Some("&apos;"),
        '"' => Some("&quot;"),
        '\0' => Some("%00"),
        '\r' => Some("%0D"),
        '\n' => Some("%0A"),
        '\t' => Some("%09"),
        _ => None,
    }
}

/// Escape text for use as element content or attribute text.
///
/// Borrows the input when nothing needs replacing.
pub fn escape_text(input: &str) -> Cow<'_, str> {
    let Some(first) = input.find(|ch| replacement(ch).is_some()) else {
        return Cow::Borrowed(input);
    };

    let mut escaped = String::with_capacity(input.len() + 16);
    escaped.push_str(&input[..first]);
    for ch in input[first..].chars() {
        match replacement(ch) {
            Some(entity) => escaped.push_str(entity),
            None => escaped.push(ch),
        }
    }
    Cow::Owned(escaped)
}

/// Reverse the substitutions made by [`escape_text`].
///
/// Only the nine fixed mappings are recognised; anything else, including
/// other entities, is left as-is.
pub fn unescape_text(input: &str) -> Cow<'_, str> {
    const MAPPINGS: [(&str, char); 9] = [
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&apos;", '\''),
        ("&quot;", '"'),
        ("%00", '\0'),
        ("%0D", '\r'),
        ("%0A", '\n'),
        ("%09", '\t'),
    ];

    if !input.contains(['&', '%']) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find(['&', '%']) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match MAPPINGS.iter().find(|(code, _)| rest.starts_with(code)) {
            Some((code, ch)) => {
                out.push(*ch);
                rest = &rest[code.len()..];
            }
            None => {
                // '&' and '%' are both one byte
                out.push_str(&rest[..1]);
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Derive an element name from arbitrary text.
///
/// Keeps printable ASCII outside `< > \r \n & ' "`, lower-cases letters and
/// turns whitespace into `_`. Never applied implicitly by the writer.
pub fn sanitize_tag_name(input: &str) -> String {
    input
        .chars()
        .filter(|ch| (ch.is_ascii_graphic() || *ch == ' ') && !"<>\r\n&'\"".contains(*ch))
        .map(|ch| {
            if ch.is_ascii_whitespace() {
                '_'
            } else {
                ch.to_ascii_lowercase()
            }
        })
        .collect()
}

/// Attribute text for an element's opening tag.
///
/// Pairs added with [`Attributes::with`] are rendered as `key='value'` with
/// the value escaped. Pre-rendered text (`"version='1.0'"`) converts via
/// `From<&str>` and is written verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(String);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `key='value'` pair, escaping the value.
    pub fn with(mut self, key: &str, value: impl Display) -> Self {
        if !self.0.is_empty() {
            self.0.push(' ');
        }
        let value = value.to_string();
        self.0.push_str(key);
        self.0.push_str("='");
        self.0.push_str(&escape_text(&value));
        self.0.push('\'');
        self
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Attributes {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

impl From<String> for Attributes {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl AsRef<str> for Attributes {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Attributes {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Render a map as one line: `<outer attrs><k>v</k>...</outer>`.
///
/// Values are escaped, keys are written as given.
pub fn render_map(map: &BTreeMap<String, String>, outer: &str, attrs: &str) -> String {
    let mut out = String::new();
    out.push('<');
    out.push_str(outer);
    if !attrs.is_empty() {
        out.push(' ');
        out.push_str(attrs);
    }
    out.push('>');
    for (key, value) in map {
        out.push('<');
        out.push_str(key);
        out.push('>');
        out.push_str(&escape_text(value));
        out.push_str("</");
        out.push_str(key);
        out.push('>');
    }
    out.push_str("</");
    out.push_str(outer);
    out.push('>');
    out
}
