//! Open-element stack and the vocabulary of element names seen so far.

use std::collections::BTreeSet;

use crate::error::{DfxmlError, Result};

/// Check that `tag` is usable as an element name.
///
/// A leading `/` (closing tag) is ignored. Returns the bare name.
pub fn validate_tag(tag: &str) -> Result<&str> {
    let name = tag.strip_prefix('/').unwrap_or(tag);
    if name.contains(' ') {
        return Err(DfxmlError::InvalidTagName {
            tag: name.to_owned(),
        });
    }
    Ok(name)
}

/// Currently open elements, innermost last.
#[derive(Debug, Default)]
pub struct TagStack {
    open: Vec<String>,
}

impl TagStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tag: impl Into<String>) {
        self.open.push(tag.into());
    }

    pub fn pop(&mut self) -> Result<String> {
        self.open.pop().ok_or(DfxmlError::EmptyTagStack)
    }

    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn top(&self) -> Option<&str> {
        self.open.last().map(String::as_str)
    }
}

/// Every distinct element name emitted, kept sorted for DTD generation.
#[derive(Debug, Default, Clone)]
pub struct TagRegistry {
    names: BTreeSet<String>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tag: &str) {
        if !self.names.contains(tag) {
            self.names.insert(tag.to_owned());
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.names.contains(tag)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closing_slash_is_stripped() {
        assert_eq!(validate_tag("/volume").unwrap(), "volume");
        assert_eq!(validate_tag("volume").unwrap(), "volume");
    }

    #[test]
    fn spaces_are_rejected() {
        let err = validate_tag("byte run").unwrap_err();
        assert!(matches!(err, DfxmlError::InvalidTagName { ref tag } if tag == "byte run"));
        assert!(validate_tag("/a b").is_err());
    }

    #[test]
    fn empty_stack_pop_is_misuse() {
        let mut stack = TagStack::new();
        assert!(matches!(stack.pop(), Err(DfxmlError::EmptyTagStack)));
    }

    #[test]
    fn stack_pops_in_reverse_order() {
        let mut stack = TagStack::new();
        stack.push("dfxml");
        stack.push("volume");
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.top(), Some("volume"));
        assert_eq!(stack.pop().unwrap(), "volume");
        assert_eq!(stack.pop().unwrap(), "dfxml");
        assert!(stack.is_empty());
    }

    #[test]
    fn registry_deduplicates_and_sorts() {
        let mut registry = TagRegistry::new();
        for tag in ["volume", "fileobject", "volume", "dfxml"] {
            registry.register(tag);
        }
        assert_eq!(registry.len(), 3);
        assert!(registry.contains("fileobject"));
        let names: Vec<_> = registry.iter().collect();
        assert_eq!(names, ["dfxml", "fileobject", "volume"]);
    }
}
