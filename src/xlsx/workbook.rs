//! Sheet tab name lookup through `xl/workbook.xml`.
//!
//! Worksheet parts are named after their position (`sheet1.xml`), not after
//! the tab name shown in Excel. The workbook part maps tab names to
//! relationship ids, and the workbook relationships map those ids to parts.

use crate::classify::worksheet_name;
use crate::container::PackageReader;
use crate::error::{Error, Result};
use quick_xml::events::Event;
use std::collections::HashMap;
use std::path::{Component, Path};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";

/// Sheet info from workbook.xml.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetInfo {
    /// Tab name
    pub name: String,
    /// Relationship id pointing at the sheet part
    pub rel_id: String,
}

/// Parse workbook.xml for sheet info.
pub fn parse_workbook_sheets(xml: &str) -> Result<Vec<SheetInfo>> {
    let mut sheets = Vec::new();
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) => {
                if e.local_name().as_ref() != b"sheet" {
                    continue;
                }
                let mut name = String::new();
                let mut rel_id = String::new();

                for attr in e.attributes().flatten() {
                    let key = attr.key.as_ref();
                    if key == b"name" {
                        name = attr
                            .unescape_value()
                            .map_err(|e| Error::XmlParse(e.to_string()))?
                            .into_owned();
                    } else if key.ends_with(b":id") {
                        rel_id = String::from_utf8_lossy(&attr.value).to_string();
                    }
                }

                if !name.is_empty() {
                    sheets.push(SheetInfo { name, rel_id });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::XmlParse(e.to_string())),
            _ => {}
        }
    }

    Ok(sheets)
}

/// Parse workbook relationships into an id → target map.
pub fn parse_workbook_rels(xml: &str) -> Result<HashMap<String, String>> {
    let mut rels = HashMap::new();
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) => {
                if e.local_name().as_ref() != b"Relationship" {
                    continue;
                }
                let mut id = String::new();
                let mut target = String::new();

                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = String::from_utf8_lossy(&attr.value).to_string(),
                        b"Target" => {
                            target = String::from_utf8_lossy(&attr.value).to_string()
                        }
                        _ => {}
                    }
                }

                if !id.is_empty() && !target.is_empty() {
                    rels.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::XmlParse(e.to_string())),
            _ => {}
        }
    }

    Ok(rels)
}

/// Resolve a relationship target relative to the workbook part.
fn resolve_target(base: &str, target: &str) -> String {
    if let Some(stripped) = target.strip_prefix('/') {
        return stripped.to_string();
    }

    let base_dir = Path::new(base).parent().unwrap_or(Path::new(""));
    let mut result = base_dir.to_path_buf();
    for component in Path::new(target).components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::Normal(c) => result.push(c),
            _ => {}
        }
    }

    result.to_string_lossy().replace('\\', "/")
}

/// Find the worksheet part name (`sheet3`) for a tab name (`Revenue`).
///
/// # Errors
///
/// [`Error::MissingComponent`] if the workbook part or its relationships are
/// absent, [`Error::SheetNotFound`] if no tab has that name or the tab is not
/// backed by a part under `xl/worksheets/` (e.g. a chartsheet).
pub fn resolve_sheet_part(reader: &mut PackageReader, tab_name: &str) -> Result<String> {
    let workbook = reader.read_xml(WORKBOOK_PART)?;
    let sheets = parse_workbook_sheets(&workbook).map_err(|e| e.in_part(WORKBOOK_PART))?;

    let sheet = sheets
        .iter()
        .find(|s| s.name == tab_name)
        .ok_or_else(|| Error::SheetNotFound(tab_name.to_string()))?;

    let rels_xml = reader.read_xml(WORKBOOK_RELS_PART)?;
    let rels = parse_workbook_rels(&rels_xml).map_err(|e| e.in_part(WORKBOOK_RELS_PART))?;
    let target = rels
        .get(&sheet.rel_id)
        .ok_or_else(|| Error::SheetNotFound(tab_name.to_string()))?;

    let part = resolve_target(WORKBOOK_PART, target);
    let stem = worksheet_name(&part).ok_or_else(|| Error::SheetNotFound(tab_name.to_string()))?;
    log::debug!("tab '{}' resolved to {}", tab_name, part);
    Ok(stem.to_string())
}
