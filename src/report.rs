//! Per-member edit reports and progress observation.

use crate::classify::PartKind;
use crate::error::Result;
use crate::xlsx::{CellTouch, WorksheetOutcome};
use serde::Serialize;

/// What happened to one package member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberReport {
    /// Entry name
    pub path: String,
    /// Classification of the entry
    pub kind: PartKind,
    /// Cells whose value was replaced
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cells_edited: Vec<CellTouch>,
    /// Formula cells whose cached value was removed
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub formula_caches_removed: Vec<CellTouch>,
    /// Number of `c:numCache` elements removed
    #[serde(skip_serializing_if = "is_zero")]
    pub chart_caches_removed: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl MemberReport {
    /// A member copied verbatim.
    pub fn passthrough(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: PartKind::Passthrough,
            cells_edited: Vec::new(),
            formula_caches_removed: Vec::new(),
            chart_caches_removed: 0,
        }
    }

    /// A patched worksheet.
    pub fn worksheet(path: impl Into<String>, kind: PartKind, outcome: WorksheetOutcome) -> Self {
        Self {
            path: path.into(),
            kind,
            cells_edited: outcome.edited,
            formula_caches_removed: outcome.caches_removed,
            chart_caches_removed: 0,
        }
    }

    /// A purged chart.
    pub fn chart(path: impl Into<String>, removed: usize) -> Self {
        Self {
            path: path.into(),
            kind: PartKind::Chart,
            cells_edited: Vec::new(),
            formula_caches_removed: Vec::new(),
            chart_caches_removed: removed,
        }
    }
}

/// JSON output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JsonFormat {
    /// Compact single-line JSON
    Compact,
    /// Pretty-printed with 2-space indentation
    #[default]
    Pretty,
}

/// Summary of a whole package edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EditReport {
    /// Worksheet part name that received the edits
    pub sheet: String,
    /// One entry per member, in package order
    pub members: Vec<MemberReport>,
}

impl EditReport {
    /// Create an empty report for `sheet`.
    pub fn new(sheet: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            members: Vec::new(),
        }
    }

    /// Whether a member was classified as the target worksheet.
    pub fn target_found(&self) -> bool {
        self.members
            .iter()
            .any(|m| m.kind == PartKind::TargetWorksheet)
    }

    /// Total number of edited cells.
    pub fn cells_edited(&self) -> usize {
        self.members.iter().map(|m| m.cells_edited.len()).sum()
    }

    /// Total number of removed formula caches.
    pub fn formula_caches_removed(&self) -> usize {
        self.members
            .iter()
            .map(|m| m.formula_caches_removed.len())
            .sum()
    }

    /// Total number of removed chart caches.
    pub fn chart_caches_removed(&self) -> usize {
        self.members.iter().map(|m| m.chart_caches_removed).sum()
    }

    /// Serialize the report.
    pub fn to_json(&self, format: JsonFormat) -> Result<String> {
        Ok(match format {
            JsonFormat::Compact => serde_json::to_string(self)?,
            JsonFormat::Pretty => serde_json::to_string_pretty(self)?,
        })
    }
}

/// Receives progress while a package is edited.
///
/// Closures taking `&MemberReport` implement this trait.
pub trait EditObserver {
    /// Called once before the first member, with the member count if known.
    fn started(&mut self, _total: Option<usize>) {}

    /// Called after each member has been written to the output.
    fn member_processed(&mut self, report: &MemberReport);
}

impl<F: FnMut(&MemberReport)> EditObserver for F {
    fn member_processed(&mut self, report: &MemberReport) {
        self(report)
    }
}
