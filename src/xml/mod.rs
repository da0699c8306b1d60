//! Namespace-aware XML tree used to patch package parts.

mod namespace;
mod tree;

pub use namespace::{ExpandedName, NamespaceMap, DEFAULT_PREFIX};
pub use tree::{Element, Node, XmlTree};
