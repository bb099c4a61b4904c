// SPDX-License-Identifier: PMPL-1.0-or-later
//! a11yaudit CLI - WCAG accessibility audit for design documents

use a11yaudit::config::AuditConfig;
use a11yaudit::document::MemoryDocument;
use a11yaudit::report::{generate_report, OutputFormat};
use a11yaudit::{FindingSet, ScanOptions, Scanner};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// WCAG accessibility audit for design-document node trees
#[derive(Parser)]
#[command(name = "a11yaudit")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a document and print a report
    Check {
        /// Document JSON file
        document: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: FormatArg,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        scan: ScanArgs,
    },

    /// Apply the first suggested fix of every finding and save the document
    Fix {
        /// Document JSON file
        document: PathBuf,

        /// Where to write the patched document
        #[arg(long)]
        output: PathBuf,

        #[command(flatten)]
        scan: ScanArgs,
    },
}

#[derive(clap::Args)]
struct ScanArgs {
    /// Skip the color blindness analyzer
    #[arg(long)]
    no_color_blindness: bool,

    /// Run analyzers one at a time instead of batched
    #[arg(long)]
    sequential: bool,

    /// TOML configuration with thresholds and patterns
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,
}

impl ScanArgs {
    fn options(&self, scanner: &Scanner) -> ScanOptions {
        let mut options = scanner.default_options();
        if self.no_color_blindness {
            options = options.include_color_blindness(false);
        }
        if self.sequential {
            options.sequential()
        } else {
            options
        }
    }

    fn scanner(&self) -> anyhow::Result<Scanner> {
        let config = match self.config {
            Some(ref path) => AuditConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => AuditConfig::default(),
        };
        Ok(Scanner::new(config)?)
    }
}

/// Output format CLI argument
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    /// Human-readable text
    Text,
    /// Structured JSON
    Json,
    /// Markdown document
    Markdown,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Markdown => OutputFormat::Markdown,
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("a11yaudit=debug")
        } else {
            EnvFilter::new("a11yaudit=warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn scan(document: &Path, args: &ScanArgs) -> anyhow::Result<(MemoryDocument, FindingSet)> {
    let doc = MemoryDocument::load(document)
        .with_context(|| format!("loading document {}", document.display()))?;
    let scanner = args.scanner()?;
    let outcome = scanner.scan_document(&doc, args.options(&scanner)).await?;
    if outcome.is_cancelled() {
        bail!("scan was cancelled");
    }
    Ok((doc, outcome.into_findings()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { document, format, output, scan: args } => {
            init_logging(args.verbose);
            let (_, findings) = scan(&document, &args).await?;
            let report = generate_report(&findings, format.into());
            write_output(&report, output.as_deref())?;

            if findings.has_critical() {
                std::process::exit(1);
            }
        }

        Commands::Fix { document, output, scan: args } => {
            init_logging(args.verbose);
            let (doc, findings) = scan(&document, &args).await?;
            let mut applied = 0;
            for finding in findings.iter() {
                if let Some(fix) = finding.remediations.first() {
                    info!("Applying \"{}\" to {}", fix.description, finding.location_string());
                    fix.apply().await;
                    applied += 1;
                }
            }
            std::fs::write(&output, doc.to_json()?)
                .with_context(|| format!("writing {}", output.display()))?;
            eprintln!(
                "Applied {} fix(es) for {} finding(s); document written to {}",
                applied,
                findings.len(),
                output.display()
            );
        }
    }

    Ok(())
}

/// Write output to file or stdout
fn write_output(content: &str, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(p) => {
            std::fs::write(p, content)?;
            eprintln!("Report written to {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
