//! Chart numeric cache removal.
//!
//! A chart series references its data by formula (`c:numRef/c:f`) and keeps a
//! snapshot of the values in `c:numCache`. After a cell edit the snapshot may
//! be stale, so every numeric cache is dropped and readers re-resolve the
//! references.

use crate::error::Result;
use crate::xml::{NamespaceMap, XmlTree};

/// Qualified name of the numeric cache element.
const NUM_CACHE: &str = "c:numCache";

/// Remove every `c:numCache` element from a chart part.
///
/// Chart parts bind DrawingML chart elements to an explicit `c` prefix on the
/// root element, so no default-namespace remapping is applied. A chart
/// without that binding, or without caches, is left as is.
///
/// Returns the number of removed elements.
pub fn purge_chart(tree: &mut XmlTree) -> Result<usize> {
    let ns = NamespaceMap::declared(tree.root())?;
    let Some(num_cache) = ns.expand(NUM_CACHE) else {
        log::debug!("chart root declares no 'c' prefix, nothing to purge");
        return Ok(0);
    };
    Ok(tree.root_mut().remove_descendants(num_cache))
}
