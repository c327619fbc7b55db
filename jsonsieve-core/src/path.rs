//! Field paths into JSON documents.
//!
//! Object keys and array indexes share one ordered segment list, so the
//! surface path `x.y[0]` becomes `Key("x"), Key("y"), Index(0)`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// One step in a field path: an object key or an array index.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    /// Object member access by key
    Key(Arc<str>),
    /// Array element access by position
    Index(usize),
}

/// An ordered sequence of path segments addressing one value in a document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Single-key convenience constructor.
    pub fn key(name: impl Into<Arc<str>>) -> Self {
        Self {
            segments: vec![PathSegment::Key(name.into())],
        }
    }

    /// Append an object key segment.
    pub fn push_key(&mut self, name: impl Into<Arc<str>>) {
        self.segments.push(PathSegment::Key(name.into()));
    }

    /// Append an array index segment.
    pub fn push_index(&mut self, index: usize) {
        self.segments.push(PathSegment::Index(index));
    }

    /// Resolve this path against a document.
    ///
    /// Returns `None` as soon as any step is missing or the intermediate
    /// value has the wrong shape (index into a non-array, key into a
    /// non-object). A present `null` still resolves.
    pub fn lookup<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        let mut current = doc;
        for segment in &self.segments {
            current = match segment {
                PathSegment::Key(key) => current.as_object()?.get(key.as_ref())?,
                PathSegment::Index(idx) => current.as_array()?.get(*idx)?,
            };
        }
        Some(current)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            match segment {
                PathSegment::Key(key) => {
                    if !first {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", key)?;
                }
                PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
            }
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_nested() {
        let doc = json!({"x": {"y": [7, 8]}});
        let mut path = FieldPath::key("x");
        path.push_key("y");
        path.push_index(0);
        assert_eq!(path.lookup(&doc), Some(&json!(7)));

        let mut second = FieldPath::key("x");
        second.push_key("y");
        second.push_index(1);
        assert_eq!(second.lookup(&doc), Some(&json!(8)));
    }

    #[test]
    fn test_lookup_missing() {
        let doc = json!({"x": {"y": []}});
        let mut path = FieldPath::key("x");
        path.push_key("y");
        path.push_index(0);
        assert_eq!(path.lookup(&doc), None);

        assert_eq!(FieldPath::key("nope").lookup(&doc), None);
    }

    #[test]
    fn test_lookup_null_is_present() {
        let doc = json!({"a": null});
        assert_eq!(FieldPath::key("a").lookup(&doc), Some(&Value::Null));
    }

    #[test]
    fn test_lookup_wrong_shape() {
        let doc = json!({"a": 5});
        let mut path = FieldPath::key("a");
        path.push_key("b");
        assert_eq!(path.lookup(&doc), None);

        let mut indexed = FieldPath::key("a");
        indexed.push_index(0);
        assert_eq!(indexed.lookup(&doc), None);
    }

    #[test]
    fn test_display() {
        let mut path = FieldPath::key("x");
        path.push_key("y");
        path.push_index(2);
        path.push_key("z");
        assert_eq!(path.to_string(), "x.y[2].z");
    }
}
