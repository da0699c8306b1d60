//! Edit options configuration.

/// How the requested sheet identifier is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SheetLookup {
    /// Worksheet part name: `sheet1` selects `xl/worksheets/sheet1.xml`
    #[default]
    PartName,
    /// Tab name as shown in Excel, resolved through `xl/workbook.xml`
    TabName,
}

/// What to do when no worksheet part matches the requested sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingSheet {
    /// Abort with [`Error::SheetNotFound`](crate::Error::SheetNotFound)
    #[default]
    Fail,
    /// Log a warning and still write the output (caches are stripped, the
    /// requested change is dropped)
    Ignore,
}

/// Options for editing a package.
#[derive(Debug, Clone, Default)]
pub struct EditOptions {
    /// Interpretation of the sheet identifier
    pub sheet_lookup: SheetLookup,

    /// Behavior when the target worksheet is absent
    pub missing_sheet: MissingSheet,
}

impl EditOptions {
    /// Create default edit options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how the sheet identifier is interpreted.
    pub fn with_sheet_lookup(mut self, lookup: SheetLookup) -> Self {
        self.sheet_lookup = lookup;
        self
    }

    /// Set the missing-sheet behavior.
    pub fn with_missing_sheet(mut self, missing: MissingSheet) -> Self {
        self.missing_sheet = missing;
        self
    }
}
