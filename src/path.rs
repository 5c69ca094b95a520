use serde::{Deserialize, Serialize};

/// Payload encoding tag. Determines only how a message is turned into
/// bytes; directory membership is purely structural and does not depend
/// on this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    /// Canonical, self-describing text encoding.
    Json,
    /// Compact binary encoding.
    Binary,
}

/// A structural key: a sequence of name components plus a payload-encoding
/// tag. Two Paths are equal iff both their components and their tag match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path {
    components: Vec<String>,
    encoding: Encoding,
}

impl Path {
    pub fn new<I, S>(components: I, encoding: Encoding) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Path {
            components: components.into_iter().map(Into::into).collect(),
            encoding,
        }
    }

    pub fn root(encoding: Encoding) -> Self {
        Path {
            components: Vec::new(),
            encoding,
        }
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// The sequence with its last component removed, empty when at root.
    /// The parent always carries the same encoding tag as `self` since the
    /// tag has no bearing on directory structure.
    pub fn parent(&self) -> Path {
        if self.components.is_empty() {
            return self.clone();
        }
        Path {
            components: self.components[..self.components.len() - 1].to_vec(),
            encoding: self.encoding,
        }
    }

    /// The last component, if any.
    pub fn name(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    /// Canonical directory path string for this sequence, used as the
    /// directory cache's key. Independent of the encoding tag.
    pub fn directory_key(&self) -> String {
        if self.components.is_empty() {
            return "/".to_string();
        }
        let mut key = String::new();
        for c in &self.components {
            key.push('/');
            key.push_str(c);
        }
        key
    }

    /// True if `self` is a direct child of `parent`.
    pub fn is_child_of(&self, parent: &Path) -> bool {
        self.components.len() == parent.components.len() + 1
            && self.components[..parent.components.len()] == parent.components[..]
    }

    /// Whether the final component ends with the heartbeat sentinel, used
    /// by the expiry-exemption predicate.
    pub fn ends_with_sentinel(&self, sentinel: &str) -> bool {
        self.name().is_some_and(|n| n.ends_with(sentinel))
    }

    /// Walk ancestors starting at `self.parent()` up to (and including) the
    /// root, in order.
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors {
            current: Some(self.clone()),
        }
    }
}

pub struct Ancestors<'a> {
    current: Option<Path>,
}

// Lifetime is unused structurally (Path is cloned eagerly) but kept so the
// iterator's type signals it borrows conceptually from the originating Path.
impl<'a> Iterator for Ancestors<'a> {
    type Item = Path;

    fn next(&mut self) -> Option<Path> {
        let current = self.current.take()?;
        if current.is_root() {
            return None;
        }
        let parent = current.parent();
        self.current = Some(parent.clone());
        Some(parent)
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.directory_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_of_root_is_root() {
        let p = Path::root(Encoding::Json);
        assert!(p.parent().is_root());
    }

    #[test]
    fn parent_strips_last_component() {
        let p = Path::new(["a", "b.json.db"], Encoding::Json);
        let parent = p.parent();
        assert_eq!(parent.components(), &["a".to_string()]);
    }

    #[test]
    fn directory_key_is_canonical() {
        let p = Path::new(["a", "b"], Encoding::Binary);
        assert_eq!(p.directory_key(), "/a/b");
        assert_eq!(Path::root(Encoding::Json).directory_key(), "/");
    }

    #[test]
    fn is_child_of_checks_direct_descendants_only() {
        let parent = Path::new(["a"], Encoding::Json);
        let child = Path::new(["a", "b"], Encoding::Json);
        let grandchild = Path::new(["a", "b", "c"], Encoding::Json);
        assert!(child.is_child_of(&parent));
        assert!(!grandchild.is_child_of(&parent));
    }

    #[test]
    fn ancestors_walk_to_root() {
        let p = Path::new(["a", "b", "c"], Encoding::Json);
        let chain: Vec<_> = p.ancestors().map(|a| a.directory_key()).collect();
        assert_eq!(chain, vec!["/a/b".to_string(), "/a".to_string(), "/".to_string()]);
    }

    #[test]
    fn ends_with_sentinel() {
        let p = Path::new(["host", "ping.db"], Encoding::Binary);
        assert!(p.ends_with_sentinel("ping.db"));
        let p2 = Path::new(["host", "other.db"], Encoding::Binary);
        assert!(!p2.ends_with_sentinel("ping.db"));
    }
}
