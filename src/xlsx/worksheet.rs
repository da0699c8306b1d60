//! Cell edits and formula cache invalidation for worksheet parts.

use crate::address::CellChange;
use crate::error::{Error, Result};
use crate::xml::{Element, ExpandedName, NamespaceMap, XmlTree};
use serde::Serialize;

/// An element touched while patching a worksheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellTouch {
    /// Cell reference from the `r` attribute
    pub cell: String,
    /// Element path of the value node (e.g. `sheetData/row[12]/c[3]/v`)
    pub location: String,
}

/// What [`patch_worksheet`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorksheetOutcome {
    /// Value nodes that received new content
    pub edited: Vec<CellTouch>,
    /// Formula cells whose cached value was removed
    pub caches_removed: Vec<CellTouch>,
}

/// SpreadsheetML element names under the document's namespace map.
struct SheetNames<'a> {
    sheet_data: ExpandedName<'a>,
    row: ExpandedName<'a>,
    cell: ExpandedName<'a>,
    value: ExpandedName<'a>,
    formula: ExpandedName<'a>,
}

impl<'a> SheetNames<'a> {
    fn new(ns: &'a NamespaceMap) -> Option<Self> {
        Some(Self {
            sheet_data: ns.expand("d:sheetData")?,
            row: ns.expand("d:row")?,
            cell: ns.expand("d:c")?,
            value: ns.expand("d:v")?,
            formula: ns.expand("d:f")?,
        })
    }
}

/// Zero-based position of a cell among `row` and `c` siblings.
#[derive(Debug, Clone, Copy)]
struct CellPos {
    row: usize,
    cell: usize,
}

impl CellPos {
    fn location(&self) -> String {
        format!("sheetData/row[{}]/c[{}]/v", self.row + 1, self.cell + 1)
    }
}

fn find_cell<'e>(
    sheet_data: &'e Element,
    names: &SheetNames<'_>,
    address: &str,
) -> Result<Option<(CellPos, &'e Element)>> {
    let rows = sheet_data.elements().filter(|e| e.is(names.row));
    for (row_idx, row) in rows.enumerate() {
        let cells = row.elements().filter(|e| e.is(names.cell));
        for (cell_idx, cell) in cells.enumerate() {
            if cell.attribute("r")?.as_deref() == Some(address) {
                let pos = CellPos {
                    row: row_idx,
                    cell: cell_idx,
                };
                return Ok(Some((pos, cell)));
            }
        }
    }
    Ok(None)
}

fn cell_at_mut<'e>(
    sheet_data: &'e mut Element,
    names: &SheetNames<'_>,
    pos: CellPos,
) -> Option<&'e mut Element> {
    sheet_data
        .elements_mut()
        .filter(|e| e.is(names.row))
        .nth(pos.row)?
        .elements_mut()
        .filter(|e| e.is(names.cell))
        .nth(pos.cell)
}

/// Apply `changes` to a worksheet and strip every cached formula result.
///
/// Cells are looked up as `sheetData/row/c[@r=address]/v` under the first
/// `sheetData` of the document, through the default namespace remapped to
/// the `d` prefix. Every change is located before anything is modified, so a
/// missing cell leaves the tree untouched.
///
/// Cache stripping runs after the edits and regardless of whether any change
/// was requested: the first `v` child of every `c` that has an `f` child is
/// removed.
///
/// # Errors
///
/// - [`Error::CellNotFound`] when no `c` element carries the address.
/// - [`Error::MalformedCell`] when the matched cell has no `v` child.
pub fn patch_worksheet(
    part: &str,
    tree: &mut XmlTree,
    changes: &[CellChange],
) -> Result<WorksheetOutcome> {
    let ns = NamespaceMap::resolve(tree.root())?;
    let mut outcome = WorksheetOutcome::default();

    let not_found = |change: &CellChange| Error::CellNotFound {
        part: part.to_string(),
        cell: change.address.to_string(),
    };

    let Some(names) = SheetNames::new(&ns) else {
        if let Some(change) = changes.first() {
            return Err(not_found(change));
        }
        log::debug!("{}: no default namespace, nothing to patch", part);
        return Ok(outcome);
    };

    let Some(sheet_data) = tree.root_mut().child_mut(names.sheet_data) else {
        if let Some(change) = changes.first() {
            return Err(not_found(change));
        }
        return Ok(outcome);
    };

    let mut targets = Vec::with_capacity(changes.len());
    for change in changes {
        let address = change.address.to_string();
        let (pos, cell) =
            find_cell(sheet_data, &names, &address)?.ok_or_else(|| not_found(change))?;
        if cell.child(names.value).is_none() {
            return Err(Error::MalformedCell {
                part: part.to_string(),
                cell: address,
            });
        }
        targets.push((pos, address, change.content.as_str()));
    }

    for (pos, address, content) in targets {
        let value = cell_at_mut(sheet_data, &names, pos).and_then(|c| c.child_mut(names.value));
        if let Some(value) = value {
            value.set_text(content);
            log::debug!(
                "{}: modifying contents of cell {} at {}",
                part,
                address,
                pos.location()
            );
            outcome.edited.push(CellTouch {
                cell: address,
                location: pos.location(),
            });
        }
    }

    let rows = sheet_data.elements_mut().filter(|e| e.is(names.row));
    for (row_idx, row) in rows.enumerate() {
        let cells = row.elements_mut().filter(|e| e.is(names.cell));
        for (cell_idx, cell) in cells.enumerate() {
            if cell.child(names.formula).is_none() {
                continue;
            }
            if cell.remove_child(names.value).is_some() {
                let pos = CellPos {
                    row: row_idx,
                    cell: cell_idx,
                };
                let address = cell.attribute("r")?.unwrap_or_default();
                log::trace!(
                    "{}: removing value for formula cell {} at {}",
                    part,
                    address,
                    pos.location()
                );
                outcome.caches_removed.push(CellTouch {
                    cell: address,
                    location: pos.location(),
                });
            }
        }
    }

    Ok(outcome)
}
