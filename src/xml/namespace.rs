//! Namespace prefix resolution for element lookups.
//!
//! Lookups always go through an explicit prefix. Worksheet parts declare the
//! SpreadsheetML namespace as the default namespace, so [`NamespaceMap::resolve`]
//! registers it under [`DEFAULT_PREFIX`] before any lookup is made.

use crate::error::Result;
use std::collections::BTreeMap;

use super::tree::{attribute_value, Element};

/// Prefix under which a document's default namespace is registered.
pub const DEFAULT_PREFIX: &str = "d";

/// A namespace URI plus local name, the unit of element matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandedName<'a> {
    /// Namespace URI
    pub namespace: &'a str,
    /// Local element name
    pub local: &'a str,
}

/// Prefix to URI bindings declared on a document's root element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceMap {
    default: Option<String>,
    prefixes: BTreeMap<String, String>,
}

impl NamespaceMap {
    /// Collect the declarations on `root` as written.
    pub fn declared(root: &Element) -> Result<Self> {
        let mut map = Self::default();
        for attr in root.start().attributes() {
            let attr = attr?;
            let key = attr.key.as_ref();
            if key == b"xmlns" {
                let uri = attribute_value(&attr)?;
                // xmlns="" undeclares the default namespace
                map.default = (!uri.is_empty()).then_some(uri);
            } else if let Some(prefix) = key.strip_prefix(b"xmlns:") {
                map.prefixes.insert(
                    String::from_utf8_lossy(prefix).into_owned(),
                    attribute_value(&attr)?,
                );
            }
        }
        Ok(map)
    }

    /// Collect the declarations on `root` and move a default namespace to
    /// [`DEFAULT_PREFIX`].
    ///
    /// A document without a default namespace yields the same map as
    /// [`NamespaceMap::declared`].
    pub fn resolve(root: &Element) -> Result<Self> {
        let mut map = Self::declared(root)?;
        if let Some(uri) = map.default.take() {
            if let Some(previous) = map.prefixes.insert(DEFAULT_PREFIX.to_string(), uri) {
                log::debug!(
                    "default namespace replaces declared prefix '{}' ({})",
                    DEFAULT_PREFIX,
                    previous
                );
            }
        }
        Ok(map)
    }

    /// URI bound to the unprefixed slot, if any.
    pub fn default_namespace(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// URI bound to `prefix`.
    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    /// Whether no bindings are known.
    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.prefixes.is_empty()
    }

    /// Expand a `prefix:local` name. Unknown prefixes yield `None`.
    pub fn expand<'a>(&'a self, qname: &'a str) -> Option<ExpandedName<'a>> {
        match qname.split_once(':') {
            Some((prefix, local)) => Some(ExpandedName {
                namespace: self.get(prefix)?,
                local,
            }),
            None => Some(ExpandedName {
                namespace: self.default_namespace()?,
                local: qname,
            }),
        }
    }
}
