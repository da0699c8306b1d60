//! xlsxpatch CLI - surgical single-cell XLSX edits
//!
//! Sets one cell of one worksheet and writes a new package with every stale
//! formula and chart cache removed.

use clap::Parser;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use xlsxpatch::{
    EditObserver, EditOptions, EditReport, EditRequest, JsonFormat, MemberReport, MissingSheet,
    PartKind, SheetLookup,
};

/// Edit a single cell of an XLSX file
#[derive(Parser)]
#[command(
    name = "xlsxpatch",
    author = "iyulab",
    version,
    about = "Edit a single cell of an XLSX file",
    long_about = "xlsxpatch - surgical single-cell edits for XLSX packages.\n\n\
                  Every other part of the package is copied unchanged, except that \
                  cached formula results and chart data caches are removed so that \
                  spreadsheet applications recompute them."
)]
struct Cli {
    /// Input file path
    input: PathBuf,

    /// Worksheet part name (sheet1 for xl/worksheets/sheet1.xml)
    sheet: String,

    /// Cell address in A1 style (e.g. C12)
    cell: String,

    /// New cell content, written verbatim
    content: String,

    /// Output file path (must differ from the input)
    output: PathBuf,

    /// Treat SHEET as the tab name shown in Excel
    #[arg(long)]
    by_name: bool,

    /// Write the output even if no worksheet matches SHEET
    #[arg(long)]
    allow_missing_sheet: bool,

    /// Do not narrate each package member
    #[arg(short, long)]
    quiet: bool,

    /// Print the edit report as JSON on stdout
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn options(&self) -> EditOptions {
        let mut options = EditOptions::new();
        if self.by_name {
            options = options.with_sheet_lookup(SheetLookup::TabName);
        }
        if self.allow_missing_sheet {
            options = options.with_missing_sheet(MissingSheet::Ignore);
        }
        options
    }
}

/// Prints one line per package member above a progress bar.
struct Narrator {
    pb: ProgressBar,
    verbose: bool,
}

impl Narrator {
    fn new(verbose: bool) -> Self {
        let pb = if verbose {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{bar:30.blue} {pos}/{len} {msg}")
                .unwrap(),
        );
        Self { pb, verbose }
    }
}

impl EditObserver for Narrator {
    fn started(&mut self, total: Option<usize>) {
        if let Some(total) = total {
            self.pb.set_length(total as u64);
        }
    }

    fn member_processed(&mut self, report: &MemberReport) {
        self.pb.inc(1);
        self.pb.set_message(report.path.clone());
        if !self.verbose {
            return;
        }

        match report.kind {
            PartKind::TargetWorksheet | PartKind::OtherWorksheet => {
                self.pb.println(format!(
                    "Opening {} to make {} change(s)",
                    report.path.cyan(),
                    report.cells_edited.len()
                ));
                for touch in &report.cells_edited {
                    self.pb.println(format!(
                        "  Modifying contents of cell {} at {}",
                        touch.cell.green(),
                        touch.location
                    ));
                }
                for touch in &report.formula_caches_removed {
                    self.pb.println(format!(
                        "  Removing value for formula cell {} at {}",
                        touch.cell.yellow(),
                        touch.location
                    ));
                }
            }
            PartKind::Chart => {
                self.pb.println(format!(
                    "Removing caches from chart {} ({} removed)",
                    report.path.cyan(),
                    report.chart_caches_removed
                ));
            }
            PartKind::Passthrough => {
                self.pb
                    .println(format!("Copying {} verbatim", report.path.dimmed()));
            }
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if same_file(&cli.input, &cli.output) {
        return Err("output path must differ from the input path".into());
    }

    let request = EditRequest::single(cli.sheet.as_str(), &cli.cell, cli.content.as_str())?;
    let options = cli.options();

    let mut narrator = Narrator::new(!cli.quiet && !cli.json);
    let report = narrate_edit(&cli, &request, &options, &mut narrator)?;

    if cli.json {
        println!("{}", report.to_json(JsonFormat::Pretty)?);
    } else if !cli.quiet {
        if report.target_found() {
            println!(
                "{} Set {}!{} in {}",
                "✓".green().bold(),
                report.sheet,
                cli.cell,
                cli.output.display()
            );
        } else {
            println!(
                "{} No worksheet named {}; wrote {} without edits",
                "!".yellow().bold(),
                cli.sheet,
                cli.output.display()
            );
        }
    }

    Ok(())
}

/// Run the edit and clear the progress bar whether or not it succeeds.
fn narrate_edit(
    cli: &Cli,
    request: &EditRequest,
    options: &EditOptions,
    narrator: &mut Narrator,
) -> xlsxpatch::Result<EditReport> {
    let result = xlsxpatch::edit_file_with_options(
        &cli.input,
        &cli.output,
        request,
        options,
        Some(narrator as &mut dyn EditObserver),
    );
    narrator.pb.finish_and_clear();
    result
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_map_to_options() {
        let cli = Cli::parse_from([
            "xlsxpatch",
            "in.xlsx",
            "Revenue",
            "B7",
            "1250",
            "out.xlsx",
            "--by-name",
            "--allow-missing-sheet",
        ]);
        let options = cli.options();
        assert_eq!(options.sheet_lookup, SheetLookup::TabName);
        assert_eq!(options.missing_sheet, MissingSheet::Ignore);

        let cli = Cli::parse_from(["xlsxpatch", "in.xlsx", "sheet1", "C12", "42", "out.xlsx"]);
        let options = cli.options();
        assert_eq!(options.sheet_lookup, SheetLookup::PartName);
        assert_eq!(options.missing_sheet, MissingSheet::Fail);
    }

    #[test]
    fn test_progress_bar_cleared_on_error() {
        let dir = std::env::temp_dir().join("xlsxpatch-cli-missing");
        let input = dir.join("in.xlsx").display().to_string();
        let output = dir.join("out.xlsx").display().to_string();
        let cli = Cli::parse_from(["xlsxpatch", &input, "sheet1", "C12", "42", &output]);
        let request = EditRequest::single("sheet1", "C12", "42").unwrap();
        let mut narrator = Narrator::new(false);

        let result = narrate_edit(&cli, &request, &cli.options(), &mut narrator);
        assert!(result.is_err());
        assert!(narrator.pb.is_finished());
    }
}
