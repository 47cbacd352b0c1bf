use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use layoutgen_contracts::SHOW_REPORT_SCHEMA_VERSION;
use layoutgen_core::catalog::{load_catalog, Catalog};
use layoutgen_core::diagnostics::render_diagnostics_md;
use layoutgen_core::driver::{Generator, WriteMode};
use layoutgen_core::offsets::OffsetView;
use layoutgen_core::target::TargetRecord;
use layoutgen_core::LayoutError;
use layoutgen_targets::{TargetConfig, TargetId, TargetSpec};
use serde::Serialize;

mod logging;

use logging::{LogFormat, LogLevel};

#[derive(Parser, Debug)]
#[command(name = "layoutgen")]
#[command(about = "Generates C and assembler views of heap object layouts from one catalog.", long_about = None)]
struct Cli {
    /// Log verbosity on stderr (RUST_LOG overrides).
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate `<kind>.h`, `<kind>-scan.inc` and the index for every kind.
    Gen {
        #[arg(long)]
        catalog: PathBuf,
        /// Output directory.
        #[arg(long)]
        out: PathBuf,
        /// If set, fail if any output differs; do not write.
        #[arg(long, default_value_t = false)]
        check: bool,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Print the resolved offset view of one kind as JSON.
    Show {
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        kind: String,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Print the diagnostic code catalog as Markdown.
    Diagnostics,
}

#[derive(Args, Debug, Default)]
struct TargetArgs {
    /// Target preset; replaces the catalog's target.
    #[arg(long, value_enum)]
    target: Option<TargetId>,
    #[arg(long)]
    word_bytes: Option<u32>,
    #[arg(long)]
    lowtag_bits: Option<u32>,
    #[arg(long)]
    alignment_words: Option<u32>,
}

impl TargetArgs {
    fn spec(&self) -> TargetSpec {
        TargetSpec {
            preset: self.target,
            word_bytes: self.word_bytes,
            lowtag_bits: self.lowtag_bits,
            alignment_words: self.alignment_words,
        }
    }

    /// Command line over catalog over the default preset.
    fn resolve(&self, catalog: &Catalog) -> TargetConfig {
        self.spec().over(catalog.target).resolve()
    }
}

#[derive(Serialize)]
struct ShowReport<'a> {
    schema_version: &'static str,
    target: TargetRecord,
    header_offset: i64,
    layout: &'a OffsetView,
}

fn main() -> ExitCode {
    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn report(err: &anyhow::Error) {
    let layout = err.chain().find_map(|e| e.downcast_ref::<LayoutError>());
    match layout {
        Some(layout) => {
            let code = layout.code();
            eprintln!("error[{}]: {err:#}", code.code_str());
            if let Some(help) = code.default_help() {
                eprintln!("help: {help}");
            }
        }
        None => eprintln!("error: {err:#}"),
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level, cli.log_format);
    match cli.command {
        Command::Gen {
            catalog,
            out,
            check,
            target,
        } => run_gen(&catalog, &out, check, &target),
        Command::Show {
            catalog,
            kind,
            target,
        } => run_show(&catalog, &kind, &target),
        Command::Diagnostics => {
            print!("{}", render_diagnostics_md());
            Ok(())
        }
    }
}

fn run_gen(catalog_path: &Path, out: &Path, check: bool, args: &TargetArgs) -> Result<()> {
    let catalog = load_catalog(catalog_path)?;
    let target = args.resolve(&catalog);
    let set = Generator::new(target)?
        .generate(&catalog.kinds)
        .with_context(|| format!("generate layouts from {}", catalog_path.display()))?;

    let mode = if check { WriteMode::Check } else { WriteMode::Write };
    let summary = set.write_to(out, mode)?;
    if check {
        println!(
            "ok: {} files up to date in {}",
            summary.unchanged,
            out.display()
        );
    } else {
        println!(
            "wrote {} files ({} unchanged, {} removed) to {}",
            summary.written.len(),
            summary.unchanged,
            summary.removed.len(),
            out.display()
        );
    }
    Ok(())
}

fn run_show(catalog_path: &Path, kind: &str, args: &TargetArgs) -> Result<()> {
    let catalog = load_catalog(catalog_path)?;
    let Some(desc) = catalog.kinds.iter().find(|d| d.name() == kind) else {
        let known: Vec<&str> = catalog.kinds.iter().map(|d| d.name()).collect();
        anyhow::bail!(
            "unknown kind {kind:?} in {} (known: {})",
            catalog_path.display(),
            known.join(", ")
        );
    };
    let target = args.resolve(&catalog);
    let generated = Generator::new(target)?.generate_kind(desc)?;

    let report = ShowReport {
        schema_version: SHOW_REPORT_SCHEMA_VERSION,
        target: TargetRecord::from(&target),
        header_offset: generated.view.header_offset(),
        layout: &generated.view,
    };
    let json = serde_json::to_string_pretty(&report).context("serialize show report")?;
    println!("{json}");
    Ok(())
}
