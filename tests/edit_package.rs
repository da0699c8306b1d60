//! End-to-end tests for package edits.
//!
//! Packages are built in memory with `zip::ZipWriter`; file-level tests write
//! into a `tempfile` directory.

use std::io::{Cursor, Read, Write};
use xlsxpatch::{
    edit_bytes, edit_file, edit_file_with_options, EditOptions, EditRequest, Error,
    MemberReport, MissingSheet, PartKind, SheetLookup,
};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Budget" sheetId="1" r:id="rId1"/><sheet name="Notes" sheetId="2" r:id="rId2"/></sheets></workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/></Relationships>"#;

const SHEET1: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <dimension ref="C1:C13"/>
  <sheetData>
    <row r="12" spans="3:3"><c r="C12" s="1"><v>10</v></c></row>
    <row r="13" spans="3:3"><c r="C13" s="1"><f>SUM(C1:C11)</f><v>55</v></c></row>
  </sheetData>
  <!-- keep me -->
  <pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/>
</worksheet>"#;

const SHEET2: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1"><c r="A1"><f>Sheet1!C12*2</f><v>20</v></c><c r="B1" t="s"><v>0</v></c></row>
  </sheetData>
</worksheet>"#;

const CHART: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<c:chartSpace xmlns:c="http://schemas.openxmlformats.org/drawingml/2006/chart" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><c:chart><c:plotArea><c:barChart><c:ser><c:val><c:numRef><c:f>Budget!$C$12:$C$13</c:f><c:numCache><c:formatCode>General</c:formatCode><c:ptCount val="2"/><c:pt idx="0"><c:v>10</c:v></c:pt><c:pt idx="1"><c:v>55</c:v></c:pt></c:numCache></c:numRef></c:val></c:ser></c:barChart></c:plotArea></c:chart></c:chartSpace>"#;

const SHARED_STRINGS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="1" uniqueCount="1"><si><t>Total</t></si></sst>"#;

/// Entries of the test package, in archive order.
fn entries() -> Vec<(&'static str, Vec<u8>, CompressionMethod)> {
    vec![
        ("[Content_Types].xml", CONTENT_TYPES.into(), CompressionMethod::Deflated),
        ("xl/workbook.xml", WORKBOOK.into(), CompressionMethod::Deflated),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.into(), CompressionMethod::Deflated),
        ("xl/worksheets/sheet1.xml", SHEET1.into(), CompressionMethod::Deflated),
        ("xl/worksheets/sheet2.xml", SHEET2.into(), CompressionMethod::Deflated),
        ("xl/charts/chart1.xml", CHART.into(), CompressionMethod::Deflated),
        ("xl/sharedStrings.xml", SHARED_STRINGS.into(), CompressionMethod::Stored),
        ("xl/media/image1.png", vec![0x89, b'P', b'N', b'G', 0, 1, 2, 3], CompressionMethod::Stored),
    ]
}

fn build_package() -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data, method) in entries() {
        let options = SimpleFileOptions::default().compression_method(method);
        zip.start_file(name, options).unwrap();
        zip.write_all(&data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn read_package(data: &[u8]) -> Vec<(String, Vec<u8>, CompressionMethod)> {
    let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes).unwrap();
            (file.name().to_string(), bytes, file.compression())
        })
        .collect()
}

fn part<'a>(package: &'a [(String, Vec<u8>, CompressionMethod)], name: &str) -> &'a str {
    let (_, data, _) = package.iter().find(|(n, _, _)| n == name).unwrap();
    std::str::from_utf8(data).unwrap()
}

fn edit(cell: &str, content: &str) -> (Vec<(String, Vec<u8>, CompressionMethod)>, xlsxpatch::EditReport) {
    let request = EditRequest::single("sheet1", cell, content).unwrap();
    let (out, report) = edit_bytes(&build_package(), &request, &EditOptions::default()).unwrap();
    (read_package(&out), report)
}

#[test]
fn test_member_order_is_preserved() {
    let (out, _) = edit("C12", "42");
    let names: Vec<_> = out.iter().map(|(n, _, _)| n.as_str()).collect();
    let expected: Vec<_> = entries().iter().map(|(n, _, _)| *n).collect();
    assert_eq!(names, expected);
}

#[test]
fn test_passthrough_members_are_identical() {
    let (out, _) = edit("C12", "42");
    for ((name, data, _), (in_name, in_data, _)) in out.iter().zip(entries()) {
        assert_eq!(name, in_name);
        if !name.starts_with("xl/worksheets/") && !name.starts_with("xl/charts/") {
            assert_eq!(data, &in_data, "{} changed", name);
        }
    }
}

#[test]
fn test_compression_methods_are_preserved() {
    let (out, _) = edit("C12", "42");
    for ((name, _, method), (_, _, in_method)) in out.iter().zip(entries()) {
        assert_eq!(*method, in_method, "{} changed compression", name);
    }
}

#[test]
fn test_single_edit_and_formula_cache() {
    let (out, report) = edit("C12", "42");

    let expected = SHEET1
        .replace(
            r#"<c r="C12" s="1"><v>10</v></c>"#,
            r#"<c r="C12" s="1"><v>42</v></c>"#,
        )
        .replace(
            r#"<c r="C13" s="1"><f>SUM(C1:C11)</f><v>55</v></c>"#,
            r#"<c r="C13" s="1"><f>SUM(C1:C11)</f></c>"#,
        );
    assert_eq!(part(&out, "xl/worksheets/sheet1.xml"), expected);

    assert_eq!(report.sheet, "sheet1");
    assert_eq!(report.cells_edited(), 1);
    let target = &report.members[3];
    assert_eq!(target.kind, PartKind::TargetWorksheet);
    assert_eq!(target.cells_edited[0].cell, "C12");
    assert_eq!(target.cells_edited[0].location, "sheetData/row[1]/c[1]/v");
    assert_eq!(target.formula_caches_removed[0].cell, "C13");
}

#[test]
fn test_other_worksheets_lose_formula_caches() {
    let (out, report) = edit("C12", "42");

    let sheet2 = part(&out, "xl/worksheets/sheet2.xml");
    assert!(sheet2.contains(r#"<c r="A1"><f>Sheet1!C12*2</f></c>"#));
    assert!(sheet2.contains(r#"<c r="B1" t="s"><v>0</v></c>"#));

    assert_eq!(report.members[4].kind, PartKind::OtherWorksheet);
    assert!(report.members[4].cells_edited.is_empty());
    assert_eq!(report.formula_caches_removed(), 2);
}

#[test]
fn test_chart_caches_are_purged() {
    let (out, report) = edit("C12", "42");

    let chart = part(&out, "xl/charts/chart1.xml");
    assert!(!chart.contains("numCache"));
    assert!(chart.contains("<c:numRef><c:f>Budget!$C$12:$C$13</c:f></c:numRef>"));
    assert_eq!(report.chart_caches_removed(), 1);
}

#[test]
fn test_content_is_escaped() {
    let (out, _) = edit("C12", "a<b & c");
    assert!(part(&out, "xl/worksheets/sheet1.xml").contains("<v>a&lt;b &amp; c</v>"));
}

#[test]
fn test_repeated_edit_is_stable() {
    let request = EditRequest::single("sheet1", "C12", "42").unwrap();
    let options = EditOptions::default();
    let (once, _) = edit_bytes(&build_package(), &request, &options).unwrap();
    let (twice, report) = edit_bytes(&once, &request, &options).unwrap();

    assert_eq!(report.formula_caches_removed(), 0);
    assert_eq!(report.chart_caches_removed(), 0);
    for ((_, a, _), (_, b, _)) in read_package(&once).iter().zip(read_package(&twice).iter()) {
        assert_eq!(a, b);
    }
}

#[test]
fn test_invalid_address() {
    assert!(matches!(
        EditRequest::single("sheet1", "C0", "42"),
        Err(Error::InvalidAddress(_))
    ));
    assert!(matches!(
        EditRequest::single("sheet1", "12", "42"),
        Err(Error::InvalidAddress(_))
    ));
}

#[test]
fn test_missing_sheet_fails_by_default() {
    let request = EditRequest::single("sheet7", "C12", "42").unwrap();
    let err = edit_bytes(&build_package(), &request, &EditOptions::default()).unwrap_err();
    assert!(matches!(err, Error::SheetNotFound(ref s) if s == "sheet7"));
}

#[test]
fn test_missing_sheet_can_be_ignored() {
    let request = EditRequest::single("sheet7", "C12", "42").unwrap();
    let options = EditOptions::new().with_missing_sheet(MissingSheet::Ignore);
    let (out, report) = edit_bytes(&build_package(), &request, &options).unwrap();

    assert!(!report.target_found());
    let out = read_package(&out);
    let sheet1 = part(&out, "xl/worksheets/sheet1.xml");
    assert!(sheet1.contains("<v>10</v>"));
    assert!(!sheet1.contains("<v>55</v>"));
}

#[test]
fn test_missing_tab_never_matches_a_part_stem() {
    // No tab is called "sheet1", but xl/worksheets/sheet1.xml exists
    let request = EditRequest::single("sheet1", "C12", "42").unwrap();
    let options = EditOptions::new()
        .with_sheet_lookup(SheetLookup::TabName)
        .with_missing_sheet(MissingSheet::Ignore);
    let (out, report) = edit_bytes(&build_package(), &request, &options).unwrap();

    assert!(!report.target_found());
    assert_eq!(report.cells_edited(), 0);
    assert!(report
        .members
        .iter()
        .all(|m| m.kind != PartKind::TargetWorksheet));

    let package = read_package(&out);
    let sheet1 = part(&package, "xl/worksheets/sheet1.xml");
    assert!(sheet1.contains("<v>10</v>"));
    assert!(!sheet1.contains("<v>42</v>"));
}

#[test]
fn test_tab_name_lookup() {
    let request = EditRequest::single("Budget", "C12", "42").unwrap();
    let options = EditOptions::new().with_sheet_lookup(SheetLookup::TabName);
    let (out, report) = edit_bytes(&build_package(), &request, &options).unwrap();

    assert_eq!(report.sheet, "sheet1");
    assert!(part(&read_package(&out), "xl/worksheets/sheet1.xml").contains("<v>42</v>"));

    let request = EditRequest::single("Nope", "C12", "42").unwrap();
    let err = edit_bytes(&build_package(), &request, &options).unwrap_err();
    assert!(matches!(err, Error::SheetNotFound(_)));
}

#[test]
fn test_edit_file_writes_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.xlsx");
    let output = dir.path().join("out.xlsx");
    let package = build_package();
    std::fs::write(&input, &package).unwrap();

    let report = edit_file(&input, &output, "sheet1", "C12", "42").unwrap();
    assert_eq!(report.cells_edited(), 1);

    let out = read_package(&std::fs::read(&output).unwrap());
    assert!(part(&out, "xl/worksheets/sheet1.xml").contains("<v>42</v>"));
    // Input is untouched
    assert_eq!(std::fs::read(&input).unwrap(), package);
}

#[test]
fn test_cell_not_found_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.xlsx");
    let output = dir.path().join("out.xlsx");
    std::fs::write(&input, build_package()).unwrap();

    let err = edit_file(&input, &output, "sheet1", "D99", "42").unwrap_err();
    assert!(matches!(
        err,
        Error::CellNotFound { ref part, ref cell }
            if part == "xl/worksheets/sheet1.xml" && cell == "D99"
    ));
    assert_eq!(
        err.to_string(),
        "No such cell element with property r='D99' found in xl/worksheets/sheet1.xml"
    );

    assert!(!output.exists());
    // Only the input remains; the temporary file was removed
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_failure_keeps_existing_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.xlsx");
    let output = dir.path().join("out.xlsx");
    std::fs::write(&input, build_package()).unwrap();
    std::fs::write(&output, b"previous").unwrap();

    assert!(edit_file(&input, &output, "sheet1", "D99", "42").is_err());
    assert_eq!(std::fs::read(&output).unwrap(), b"previous");
}

#[test]
fn test_observer_receives_each_member() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.xlsx");
    let output = dir.path().join("out.xlsx");
    std::fs::write(&input, build_package()).unwrap();

    let mut paths = Vec::new();
    let mut observer = |r: &MemberReport| paths.push(r.path.clone());
    let request = EditRequest::single("sheet1", "C12", "42").unwrap();
    edit_file_with_options(
        &input,
        &output,
        &request,
        &EditOptions::default(),
        Some(&mut observer),
    )
    .unwrap();

    let expected: Vec<_> = entries().iter().map(|(n, _, _)| n.to_string()).collect();
    assert_eq!(paths, expected);
}

#[test]
fn test_malformed_worksheet_is_reported() {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    zip.start_file("xl/worksheets/sheet1.xml", options).unwrap();
    zip.write_all(b"<worksheet xmlns=\"urn:x\"><sheetData></worksheet>")
        .unwrap();
    let data = zip.finish().unwrap().into_inner();

    let request = EditRequest::single("sheet1", "A1", "1").unwrap();
    let err = edit_bytes(&data, &request, &EditOptions::default()).unwrap_err();
    assert!(matches!(err, Error::PartParse { ref part, .. } if part == "xl/worksheets/sheet1.xml"));
}
