//! # DTD Generation
//!
//! Builds the `<!DOCTYPE ...>` block injected after the XML declaration when
//! a document is closed with DTD generation enabled.
//!
//! Every element name in the [`TagRegistry`] is declared with `ANY` content,
//! followed by fixed attribute declarations for forensic volume and byte-run
//! constructs:
//!
//! ```text
//! <!DOCTYPE fiwalk
//! [
//! <!ELEMENT dfxml ANY >
//! <!ELEMENT volume ANY >
//! <!ATTLIST volume startsector CDATA #IMPLIED>
//! <!ATTLIST run start CDATA #IMPLIED>
//! <!ATTLIST run len CDATA #IMPLIED>
//! ]>
//! ```

use std::io::{self, Write};

use crate::tags::TagRegistry;

/// Default name given to the DOCTYPE declaration.
pub const DEFAULT_DOCTYPE_ROOT: &str = "fiwalk";

/// One `<!ATTLIST element attribute CDATA #IMPLIED>` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDecl {
    pub element: String,
    pub attribute: String,
}

impl AttributeDecl {
    pub fn implied(element: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            attribute: attribute.into(),
        }
    }
}

/// Attribute declarations always present in the generated DTD.
pub fn forensic_attributes() -> Vec<AttributeDecl> {
    vec![
        AttributeDecl::implied("volume", "startsector"),
        AttributeDecl::implied("run", "start"),
        AttributeDecl::implied("run", "len"),
    ]
}

/// Shape of the DTD block: its DOCTYPE name and fixed attribute lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dtd {
    root: String,
    attributes: Vec<AttributeDecl>,
}

impl Default for Dtd {
    fn default() -> Self {
        Self::new(DEFAULT_DOCTYPE_ROOT)
    }
}

impl Dtd {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            attributes: forensic_attributes(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn write_to<W: Write>(&self, out: &mut W, registry: &TagRegistry) -> io::Result<()> {
        writeln!(out, "<!DOCTYPE {}", self.root)?;
        writeln!(out, "[")?;
        for name in registry.iter() {
            writeln!(out, "<!ELEMENT {name} ANY >")?;
        }
        for decl in &self.attributes {
            writeln!(
                out,
                "<!ATTLIST {} {} CDATA #IMPLIED>",
                decl.element, decl.attribute
            )?;
        }
        writeln!(out, "]>")
    }

    pub fn render(&self, registry: &TagRegistry) -> String {
        let mut buf = Vec::new();
        // writing into a Vec cannot fail
        let _ = self.write_to(&mut buf, registry);
        String::from_utf8_lossy(&buf).into_owned()
    }
}
