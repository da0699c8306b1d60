//! A1-style cell addresses and cell changes.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A cell address in `<column-letters><row-digits>` form (e.g. `C12`).
///
/// Matching against worksheet XML is an exact string comparison with the
/// cell's `r` attribute, so letter case is kept exactly as supplied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellAddress {
    column: String,
    row: u32,
}

impl CellAddress {
    /// Parse a cell address from A1-style notation.
    ///
    /// # Examples
    /// ```
    /// use xlsxpatch::CellAddress;
    ///
    /// let addr = CellAddress::parse("C12").unwrap();
    /// assert_eq!(addr.column(), "C");
    /// assert_eq!(addr.row(), 12);
    /// assert_eq!(addr.to_string(), "C12");
    ///
    /// assert!(CellAddress::parse("$C$12").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::InvalidAddress("empty address".into()));
        }

        let split = s
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(s.len());
        let (column, row_str) = s.split_at(split);

        if column.is_empty() {
            return Err(Error::InvalidAddress(format!(
                "no column letters in '{}'",
                s
            )));
        }
        if row_str.is_empty() {
            return Err(Error::InvalidAddress(format!("no row number in '{}'", s)));
        }
        if !row_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidAddress(format!(
                "invalid row number in '{}'",
                s
            )));
        }
        // A leading zero would not survive re-serialization
        if row_str.starts_with('0') {
            return Err(Error::InvalidAddress(format!(
                "row number must be >= 1 without leading zeros in '{}'",
                s
            )));
        }

        let row: u32 = row_str
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("row number out of range in '{}'", s)))?;

        Ok(Self {
            column: column.to_string(),
            row,
        })
    }

    /// Column letters, exactly as supplied.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// 1-based row number.
    pub fn row(&self) -> u32 {
        self.row
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column, self.row)
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A replacement of one cell's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellChange {
    /// Cell to modify
    pub address: CellAddress,
    /// New content, written verbatim into the value element
    pub content: String,
}

impl CellChange {
    /// Create a change for an already parsed address.
    pub fn new(address: CellAddress, content: impl Into<String>) -> Self {
        Self {
            address,
            content: content.into(),
        }
    }

    /// Parse `cell` and pair it with `content`.
    pub fn parse(cell: &str, content: impl Into<String>) -> Result<Self> {
        Ok(Self::new(CellAddress::parse(cell)?, content))
    }
}
