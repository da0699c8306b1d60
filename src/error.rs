//! Error types for the xlsxpatch library.

use std::io;
use thiserror::Error;

/// Result type alias for xlsxpatch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while patching a package.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error reading or writing the ZIP container.
    #[error("ZIP archive error: {0}")]
    ZipArchive(String),

    /// Error parsing XML content that is not yet attributed to a part.
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// A worksheet or chart part is not well-formed XML.
    #[error("Failed to parse {part}: {message}")]
    PartParse { part: String, message: String },

    /// The supplied cell address is not in `<letters><digits>` form.
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// The target worksheet has no cell element at the requested address.
    #[error("No such cell element with property r='{cell}' found in {part}")]
    CellNotFound { part: String, cell: String },

    /// The addressed cell exists but has no value element to replace.
    #[error("Cell r='{cell}' in {part} has no value element")]
    MalformedCell { part: String, cell: String },

    /// No worksheet part matched the requested sheet.
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// A required package component is missing.
    #[error("Missing component: {0}")]
    MissingComponent(String),

    /// Error serializing a report.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Attribute a context-free XML error to the part it came from.
    pub fn in_part(self, part: &str) -> Self {
        match self {
            Error::XmlParse(message) => Error::PartParse {
                part: part.to_string(),
                message,
            },
            other => other,
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::ZipArchive(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::XmlParse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlParse(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
