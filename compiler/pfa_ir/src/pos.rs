//! Document-path source positions.
//!
//! The generic document tree carries no byte offsets, so every node is
//! located by the path that leads to it from the document root, for example
//! `action[1]["+"][0]`.

use std::fmt;
use std::sync::Arc;

/// Location of a node inside a scoring document.
///
/// Cheap to clone (one `Arc` bump). The empty path is the document root.
#[derive(Clone, Eq, PartialEq, Hash, Default)]
pub struct Pos(Arc<str>);

impl Pos {
    /// The document root.
    pub fn root() -> Self {
        Pos(Arc::from(""))
    }

    /// Position of the member `key` of the object at `self`.
    #[must_use]
    pub fn key(&self, key: &str) -> Pos {
        let mut path = String::with_capacity(self.0.len() + key.len() + 4);
        path.push_str(&self.0);
        if is_plain_key(key) {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(key);
        } else {
            path.push_str("[\"");
            path.push_str(key);
            path.push_str("\"]");
        }
        Pos(Arc::from(path))
    }

    /// Position of element `index` of the array at `self`.
    #[must_use]
    pub fn index(&self, index: usize) -> Pos {
        Pos(Arc::from(format!("{}[{index}]", self.0)))
    }

    /// The raw path text (empty for the root).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this is the document root.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

/// Keys that can be written in dotted form without quoting.
fn is_plain_key(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "document root")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Debug for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pos({})", self)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_root() {
        let root = Pos::root();
        assert!(root.is_root());
        assert_eq!(root.to_string(), "document root");
    }

    #[test]
    fn test_nested_path() {
        let pos = Pos::root().key("action").index(1).key("+").index(0);
        assert_eq!(pos.as_str(), "action[1][\"+\"][0]");
    }

    #[test]
    fn test_plain_keys_are_dotted() {
        let pos = Pos::root().key("fcns").key("square").key("do");
        assert_eq!(pos.as_str(), "fcns.square.do");
    }

    #[test]
    fn test_dotted_names_are_quoted() {
        let pos = Pos::root().key("action").key("u.square");
        assert_eq!(pos.as_str(), "action[\"u.square\"]");
    }
}
