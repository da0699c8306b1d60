//! SpreadsheetML part handling.
//!
//! - [`patch_worksheet`] edits cell values and strips formula caches.
//! - [`resolve_sheet_part`] maps a tab name to its worksheet part.
//!
//! # Example
//!
//! ```
//! use xlsxpatch::xlsx::patch_worksheet;
//! use xlsxpatch::xml::XmlTree;
//! use xlsxpatch::CellChange;
//!
//! let xml = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1"><v>1</v></c></row></sheetData></worksheet>"#;
//! let mut tree = XmlTree::parse(xml)?;
//! let outcome = patch_worksheet("xl/worksheets/sheet1.xml", &mut tree, &[CellChange::parse("A1", "2")?])?;
//! assert_eq!(outcome.edited.len(), 1);
//! # Ok::<(), xlsxpatch::Error>(())
//! ```

mod workbook;
mod worksheet;

pub use workbook::{parse_workbook_rels, parse_workbook_sheets, resolve_sheet_part, SheetInfo};
pub use worksheet::{patch_worksheet, CellTouch, WorksheetOutcome};
