//! # xlsxpatch
//!
//! Surgical single-cell edits for XLSX packages.
//!
//! A patched package is byte-identical to its input except for the edited
//! cell's value, the cached results of every formula cell, and the numeric
//! data caches of every chart. Spreadsheet applications recompute the
//! dropped caches when the file is opened.
//!
//! ## Quick Start
//!
//! ```no_run
//! // Set C12 on xl/worksheets/sheet1.xml to 42
//! let report = xlsxpatch::edit_file("in.xlsx", "out.xlsx", "sheet1", "C12", "42")?;
//! println!("{} formula caches removed", report.formula_caches_removed());
//! # Ok::<(), xlsxpatch::Error>(())
//! ```
//!
//! ## Options
//!
//! ```no_run
//! use xlsxpatch::{edit_file_with_options, EditOptions, EditRequest, SheetLookup};
//!
//! // Address the sheet by the tab name shown in Excel
//! let request = EditRequest::single("Revenue", "B7", "1250")?;
//! let options = EditOptions::new().with_sheet_lookup(SheetLookup::TabName);
//!
//! edit_file_with_options("in.xlsx", "out.xlsx", &request, &options, None)?;
//! # Ok::<(), xlsxpatch::Error>(())
//! ```
//!
//! ## Logging
//!
//! Every member action is logged through the [`log`] facade at `debug`
//! level. The library never installs a logger.

pub mod address;
pub mod charts;
pub mod classify;
pub mod container;
pub mod error;
pub mod options;
pub mod package;
pub mod report;
pub mod xlsx;
pub mod xml;

// Re-exports
pub use address::{CellAddress, CellChange};
pub use charts::purge_chart;
pub use classify::{classify, PartKind};
pub use container::{Member, MemberSink, PackageReader, ZipSink};
pub use error::{Error, Result};
pub use options::{EditOptions, MissingSheet, SheetLookup};
pub use package::{EditRequest, PackageEditor};
pub use report::{EditObserver, EditReport, JsonFormat, MemberReport};
pub use xlsx::{patch_worksheet, resolve_sheet_part};

use std::io::{BufWriter, Cursor};
use std::path::Path;
use tempfile::NamedTempFile;

/// Edit one cell of a package file and write the result to `output`.
///
/// `sheet` is the worksheet part name (`sheet1` for
/// `xl/worksheets/sheet1.xml`). The input file is never modified.
///
/// # Example
///
/// ```no_run
/// use xlsxpatch::edit_file;
///
/// edit_file("template.xlsx", "filled.xlsx", "sheet1", "C12", "42")?;
/// # Ok::<(), xlsxpatch::Error>(())
/// ```
pub fn edit_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    sheet: &str,
    cell: &str,
    content: &str,
) -> Result<EditReport> {
    let request = EditRequest::single(sheet, cell, content)?;
    edit_file_with_options(input, output, &request, &EditOptions::default(), None)
}

/// Edit a package file with explicit options and an optional observer.
///
/// The output is written to a temporary file next to `output` and moved into
/// place only after the whole package has been written. On failure no file
/// appears at `output`, and an existing file there is left unchanged.
pub fn edit_file_with_options(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    request: &EditRequest,
    options: &EditOptions,
    observer: Option<&mut dyn EditObserver>,
) -> Result<EditReport> {
    let output = output.as_ref();
    let mut reader = PackageReader::open(input)?;
    let request = resolve_request(&mut reader, request, options)?;

    let tmp = NamedTempFile::new_in(output_dir(output))?;
    let mut sink = ZipSink::new(BufWriter::new(tmp));

    let mut editor = PackageEditor::new(&request).with_options(options.clone());
    if let Some(observer) = observer {
        editor = editor.with_observer(observer);
    }
    let report = editor.run(reader.members(), &mut sink)?;

    let tmp = sink
        .finish()?
        .into_inner()
        .map_err(|e| Error::Io(e.into_error()))?;
    tmp.as_file().sync_all()?;
    tmp.persist(output).map_err(|e| Error::Io(e.error))?;

    log::debug!("wrote {}", output.display());
    Ok(report)
}

/// Edit a package held in memory.
///
/// # Example
///
/// ```no_run
/// use xlsxpatch::{edit_bytes, EditOptions, EditRequest};
///
/// let data = std::fs::read("in.xlsx")?;
/// let request = EditRequest::single("sheet1", "A1", "hello")?;
/// let (patched, report) = edit_bytes(&data, &request, &EditOptions::default())?;
/// std::fs::write("out.xlsx", patched)?;
/// # Ok::<(), xlsxpatch::Error>(())
/// ```
pub fn edit_bytes(
    data: &[u8],
    request: &EditRequest,
    options: &EditOptions,
) -> Result<(Vec<u8>, EditReport)> {
    let mut reader = PackageReader::from_bytes(data.to_vec())?;
    let request = resolve_request(&mut reader, request, options)?;

    let mut sink = ZipSink::new(Cursor::new(Vec::new()));
    let report = PackageEditor::new(&request)
        .with_options(options.clone())
        .run(reader.members(), &mut sink)?;

    Ok((sink.finish()?.into_inner(), report))
}

/// Translate a tab name into a worksheet part name when requested.
fn resolve_request(
    reader: &mut PackageReader,
    request: &EditRequest,
    options: &EditOptions,
) -> Result<EditRequest> {
    if options.sheet_lookup == SheetLookup::PartName {
        return Ok(request.clone());
    }

    match resolve_sheet_part(reader, &request.sheet) {
        Ok(part) => Ok(EditRequest {
            sheet: part,
            changes: request.changes.clone(),
        }),
        Err(Error::SheetNotFound(name)) if options.missing_sheet == MissingSheet::Ignore => {
            log::warn!(
                "no sheet tab named '{}'; {} change(s) not applied",
                name,
                request.changes.len()
            );
            // No part stem is empty, so nothing is classified as the target
            Ok(EditRequest::new(String::new()))
        }
        Err(e) => Err(e),
    }
}

/// Directory that receives the temporary output file.
fn output_dir(output: &Path) -> &Path {
    match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}
