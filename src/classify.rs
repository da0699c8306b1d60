//! Classification of package members by path.

use serde::Serialize;

/// Directory holding worksheet parts.
const WORKSHEETS_DIR: &str = "xl/worksheets/";

/// Directory holding chart parts.
const CHARTS_DIR: &str = "xl/charts/";

/// How a package member is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartKind {
    /// The worksheet that receives the cell edits
    TargetWorksheet,
    /// Any other worksheet; only formula caches are stripped
    OtherWorksheet,
    /// A chart part; numeric caches are stripped
    Chart,
    /// Copied byte-for-byte
    Passthrough,
}

impl PartKind {
    /// Returns a human-readable name for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            PartKind::TargetWorksheet => "Target worksheet",
            PartKind::OtherWorksheet => "Worksheet",
            PartKind::Chart => "Chart",
            PartKind::Passthrough => "Passthrough",
        }
    }
}

impl std::fmt::Display for PartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The `<stem>` of `<dir><stem>.xml`, if `path` is a direct child XML part.
fn part_stem<'a>(path: &'a str, dir: &str) -> Option<&'a str> {
    let stem = path.strip_prefix(dir)?.strip_suffix(".xml")?;
    (!stem.is_empty() && !stem.contains('/')).then_some(stem)
}

/// The sheet name embedded in a worksheet part path
/// (`xl/worksheets/sheet1.xml` → `sheet1`).
pub fn worksheet_name(path: &str) -> Option<&str> {
    part_stem(path, WORKSHEETS_DIR)
}

/// Worksheet part path for a sheet name (`sheet1` → `xl/worksheets/sheet1.xml`).
pub fn worksheet_path(sheet: &str) -> String {
    format!("{}{}.xml", WORKSHEETS_DIR, sheet)
}

/// Classify a member path against the requested sheet name.
///
/// # Example
///
/// ```
/// use xlsxpatch::{classify, PartKind};
///
/// assert_eq!(classify("xl/worksheets/sheet1.xml", "sheet1"), PartKind::TargetWorksheet);
/// assert_eq!(classify("xl/worksheets/sheet2.xml", "sheet1"), PartKind::OtherWorksheet);
/// assert_eq!(classify("xl/charts/chart1.xml", "sheet1"), PartKind::Chart);
/// assert_eq!(classify("xl/styles.xml", "sheet1"), PartKind::Passthrough);
/// ```
pub fn classify(path: &str, sheet: &str) -> PartKind {
    if let Some(name) = worksheet_name(path) {
        if name == sheet {
            PartKind::TargetWorksheet
        } else {
            PartKind::OtherWorksheet
        }
    } else if part_stem(path, CHARTS_DIR).is_some() {
        PartKind::Chart
    } else {
        PartKind::Passthrough
    }
}
