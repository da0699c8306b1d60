//! Package-level orchestration.
//!
//! [`PackageEditor`] walks the members of a package in order, hands each one
//! to the handler for its [`PartKind`], and appends the result to a
//! [`MemberSink`]. The output always has the same entry names in the same
//! order as the input.

use crate::address::CellChange;
use crate::charts::purge_chart;
use crate::classify::{classify, worksheet_path, PartKind};
use crate::container::{Member, MemberSink};
use crate::error::{Error, Result};
use crate::options::{EditOptions, MissingSheet};
use crate::report::{EditObserver, EditReport, MemberReport};
use crate::xlsx::patch_worksheet;
use crate::xml::XmlTree;

/// The cell changes to apply to one worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    /// Worksheet part name (`sheet1`) or tab name, see
    /// [`SheetLookup`](crate::options::SheetLookup)
    pub sheet: String,
    /// Changes, applied all-or-nothing
    pub changes: Vec<CellChange>,
}

impl EditRequest {
    /// Create a request without changes.
    ///
    /// Running it still strips every formula and chart cache.
    pub fn new(sheet: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            changes: Vec::new(),
        }
    }

    /// Create a request for a single cell.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidAddress`] if `cell` is not an A1-style reference.
    pub fn single(
        sheet: impl Into<String>,
        cell: &str,
        content: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self::new(sheet).with_change(CellChange::parse(cell, content)?))
    }

    /// Add a change.
    pub fn with_change(mut self, change: CellChange) -> Self {
        self.changes.push(change);
        self
    }
}

/// Applies an [`EditRequest`] to a stream of package members.
///
/// # Example
///
/// ```
/// use xlsxpatch::container::Member;
/// use xlsxpatch::{EditRequest, PackageEditor};
///
/// let sheet = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1"><v>1</v></c></row></sheetData></worksheet>"#;
/// let input = vec![Member::new("xl/worksheets/sheet1.xml", sheet)];
///
/// let request = EditRequest::single("sheet1", "A1", "2")?;
/// let mut output: Vec<Member> = Vec::new();
/// let report = PackageEditor::new(&request).run(input.into_iter().map(Ok), &mut output)?;
///
/// assert_eq!(report.cells_edited(), 1);
/// assert!(String::from_utf8_lossy(&output[0].data).contains("<v>2</v>"));
/// # Ok::<(), xlsxpatch::Error>(())
/// ```
pub struct PackageEditor<'r, 'o> {
    request: &'r EditRequest,
    options: EditOptions,
    observer: Option<&'o mut dyn EditObserver>,
}

impl<'r, 'o> PackageEditor<'r, 'o> {
    /// Create an editor with default options.
    pub fn new(request: &'r EditRequest) -> Self {
        Self {
            request,
            options: EditOptions::default(),
            observer: None,
        }
    }

    /// Set the edit options.
    pub fn with_options(mut self, options: EditOptions) -> Self {
        self.options = options;
        self
    }

    /// Notify `observer` after each member.
    pub fn with_observer(mut self, observer: &'o mut dyn EditObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Process every member and write the results to `sink`.
    ///
    /// The sink is not finalized; that is left to the caller, which must
    /// discard the output when this returns an error.
    ///
    /// # Errors
    ///
    /// The first error raised by reading, patching or writing a member.
    /// [`Error::SheetNotFound`] when changes were requested, no member is the
    /// target worksheet, and the options say [`MissingSheet::Fail`].
    pub fn run<I, S>(&mut self, members: I, sink: &mut S) -> Result<EditReport>
    where
        I: IntoIterator<Item = Result<Member>>,
        S: MemberSink + ?Sized,
    {
        let members = members.into_iter();
        let mut report = EditReport::new(self.request.sheet.as_str());

        if let Some(observer) = self.observer.as_mut() {
            let (lower, upper) = members.size_hint();
            observer.started(upper.filter(|&u| u == lower));
        }

        for member in members {
            let member = member?;
            let (output, member_report) = self.process(member)?;
            sink.write_member(&output)?;

            if let Some(observer) = self.observer.as_mut() {
                observer.member_processed(&member_report);
            }
            report.members.push(member_report);
        }

        if !self.request.changes.is_empty() && !report.target_found() {
            match self.options.missing_sheet {
                MissingSheet::Fail => {
                    return Err(Error::SheetNotFound(self.request.sheet.clone()));
                }
                MissingSheet::Ignore => {
                    log::warn!(
                        "{} not found; {} change(s) not applied",
                        worksheet_path(&self.request.sheet),
                        self.request.changes.len()
                    );
                }
            }
        }

        Ok(report)
    }

    fn process(&self, member: Member) -> Result<(Member, MemberReport)> {
        if member.attributes.is_dir {
            log::debug!("Copying {} verbatim", member.path);
            let report = MemberReport::passthrough(member.path.as_str());
            return Ok((member, report));
        }

        let kind = classify(&member.path, &self.request.sheet);
        match kind {
            PartKind::TargetWorksheet | PartKind::OtherWorksheet => {
                let changes: &[CellChange] = if kind == PartKind::TargetWorksheet {
                    &self.request.changes
                } else {
                    &[]
                };
                log::debug!(
                    "Opening {} to make {} change(s)",
                    member.path,
                    changes.len()
                );

                let part = member.path.as_str();
                let mut tree = XmlTree::from_bytes(&member.data).map_err(|e| e.in_part(part))?;
                let outcome =
                    patch_worksheet(part, &mut tree, changes).map_err(|e| e.in_part(part))?;
                let data = tree.to_bytes().map_err(|e| e.in_part(part))?;

                let report = MemberReport::worksheet(part, kind, outcome);
                Ok((member.with_data(data), report))
            }
            PartKind::Chart => {
                log::debug!("Removing caches from chart {}", member.path);

                let part = member.path.as_str();
                let mut tree = XmlTree::from_bytes(&member.data).map_err(|e| e.in_part(part))?;
                let removed = purge_chart(&mut tree).map_err(|e| e.in_part(part))?;
                let data = tree.to_bytes().map_err(|e| e.in_part(part))?;

                Ok((member.with_data(data), MemberReport::chart(part, removed)))
            }
            PartKind::Passthrough => {
                log::debug!("Copying {} verbatim", member.path);
                let report = MemberReport::passthrough(member.path.as_str());
                Ok((member, report))
            }
        }
    }
}
