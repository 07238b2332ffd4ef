use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use sheetcodec::config::CodecConfig;
use sheetcodec::style::StyleCollector;
use sheetcodec::{Workbook, read_workbook_with, write_workbook_with};
use std::path::{Path, PathBuf};

mod logger;

#[derive(Parser)]
#[command(name = "sheetcli")]
#[command(about = "Inspect and rewrite OOXML spreadsheet packages", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log more; repeat for debug output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the resolved cells of a package
    Inspect {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Only this sheet
        #[arg(short, long)]
        sheet: Option<String>,

        /// Stop after this many cells per sheet
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show the deduplicated style records a package would be written with
    Styles {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Read a package and write it back out
    Roundtrip {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(short, long, value_name = "OUTPUT")]
        output: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> Result<CodecConfig> {
    if let Some(path) = path {
        return CodecConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }
    let default_path = PathBuf::from("sheetcodec.toml");
    if default_path.exists() {
        CodecConfig::from_file(&default_path)
            .with_context(|| format!("Failed to load config from {}", default_path.display()))
    } else {
        Ok(CodecConfig::default())
    }
}

fn open(file: &Path, config: &CodecConfig) -> Result<Workbook> {
    read_workbook_with(file, &config.import)
        .with_context(|| format!("Failed to read {}", file.display()))
}

fn inspect(workbook: &Workbook, only: Option<&str>, limit: Option<usize>) -> Result<()> {
    if let Some(name) = only
        && workbook.sheet(name).is_none()
    {
        anyhow::bail!("No sheet named '{}'", name);
    }
    for sheet in workbook.sheets() {
        if only.is_some_and(|name| name != sheet.name()) {
            continue;
        }
        let dimension = sheet
            .dimension()
            .map_or_else(|| "empty".to_string(), |d| d.to_string());
        println!(
            "{} {} ({}, {})",
            "Sheet:".bold(),
            sheet.name().cyan().bold(),
            sheet.state.as_str(),
            dimension
        );
        for (at, cell) in sheet.cells().take(limit.unwrap_or(usize::MAX)) {
            let styled = if cell.style.is_some() { "*" } else { "" };
            println!(
                "  {:<8} {:<8} {}{}",
                at.to_string().yellow(),
                cell.value.cell_type(),
                cell.value,
                styled.dimmed()
            );
        }
        println!();
    }
    Ok(())
}

fn styles(workbook: &Workbook) {
    let mut collector = StyleCollector::new();
    let mut references = 0usize;
    for sheet in workbook.sheets() {
        for (_, cell) in sheet.cells() {
            if let Some(style) = &cell.style {
                collector.add(style);
                references += 1;
            }
        }
    }
    let managed = collector.finish();
    println!("{}", "Style pools".bold().underline());
    println!("  styled cells:   {references}");
    println!("  cellXfs:        {}", managed.styles().len());
    println!("  fonts:          {}", managed.fonts().len());
    println!("  fills:          {}", managed.fills().len());
    println!("  borders:        {}", managed.borders().len());
    println!("  number formats: {}", managed.number_formats().len());
    println!();
    for (idx, style) in managed.styles().iter().enumerate() {
        println!(
            "  {:>3}  font={} fill={} border={} format={:?}",
            idx.to_string().yellow(),
            style.font.index.unwrap_or(0),
            style.fill.index.unwrap_or(0),
            style.border.index.unwrap_or(0),
            style.number_format.code
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose);
    let config = load_config(cli.config.as_deref())?;

    match &cli.command {
        Command::Inspect { file, sheet, limit } => {
            let workbook = open(file, &config)?;
            inspect(&workbook, sheet.as_deref(), *limit)?;
        }
        Command::Styles { file } => {
            let workbook = open(file, &config)?;
            styles(&workbook);
        }
        Command::Roundtrip { file, output } => {
            let workbook = open(file, &config)?;
            write_workbook_with(&workbook, output, &config.export)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!(
                "{} {} -> {} ({} sheets)",
                "✓".green().bold(),
                file.display(),
                output.display(),
                workbook.sheets().len()
            );
        }
    }
    Ok(())
}
