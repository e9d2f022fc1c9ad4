use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use ldaudit::audit::{audit_pages, validate_file, CrawlTotals, DocumentResult, Page, PageAudit};
use ldaudit::config::Settings;
use ldaudit::extract::extract_with_stats;
use ldaudit::fetch::Fetcher;
use ldaudit::sitemap;
use ldaudit::validate::FieldContract;

#[derive(Parser)]
#[command(name = "ldaudit", about = "JSON-LD extraction and structured-data checks")]
struct Cli {
    /// Settings file (default: ./ldaudit.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull JSON-LD blocks out of HTML pages or files
    Extract {
        /// Local HTML file (repeatable)
        #[arg(long = "file")]
        files: Vec<PathBuf>,
        /// Page URLs to fetch
        urls: Vec<String>,
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate JSON-LD documents against the field contract
    Validate {
        /// JSON documents with @context + @graph
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Contract JSON file (default: built-in BlogPosting table)
        #[arg(long)]
        contract: Option<PathBuf>,
        #[arg(long)]
        json: bool,
        /// Offending nodes listed per category
        #[arg(long)]
        sample: Option<usize>,
    },
    /// Extract from HTML, then validate every @graph block found
    Check {
        #[arg(long = "file")]
        files: Vec<PathBuf>,
        urls: Vec<String>,
        #[arg(long)]
        contract: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Check every page listed in a sitemap
    Crawl {
        /// URL of a <urlset> sitemap
        sitemap: String,
        /// Max pages to check (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        #[arg(long)]
        contract: Option<PathBuf>,
    },
    /// Print the active contract as JSON
    Contract {
        #[arg(long)]
        contract: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    let result = match cli.command {
        Commands::Extract { files, urls, json } => {
            let pages = load_pages(&settings, &files, urls).await?;
            let mut out = Vec::new();
            for page in pages {
                match page.html {
                    Ok(html) => {
                        let (blocks, stats) = extract_with_stats(&html);
                        if !json {
                            println!(
                                "{}: {} blocks ({} scripts, {} repaired, {} skipped)",
                                page.source,
                                blocks.len(),
                                stats.scripts_found,
                                stats.repaired,
                                stats.skipped
                            );
                            let values: Vec<_> = blocks.iter().map(|b| &b.parsed).collect();
                            println!("{}", serde_json::to_string_pretty(&values)?);
                        }
                        out.push(serde_json::json!({
                            "source": page.source,
                            "stats": stats,
                            "blocks": blocks,
                        }));
                    }
                    Err(e) => {
                        warn!("{}: {}", page.source, e);
                        out.push(serde_json::json!({ "source": page.source, "error": e }));
                    }
                }
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&out)?);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate { files, contract, json, sample } => {
            let contract = load_contract(&settings, contract.as_deref())?;
            let sample = sample.unwrap_or(settings.sample_size);
            info!("Validating {} documents against {}", files.len(), contract.label());

            let pb = progress_bar(files.len(), !json);
            let results: Vec<DocumentResult> = files
                .par_iter()
                .map(|path| {
                    let report = validate_file(path, &contract);
                    pb.inc(1);
                    DocumentResult {
                        source: path.display().to_string(),
                        report,
                    }
                })
                .collect();
            pb.finish_and_clear();

            let passed = results.iter().all(|r| r.report.passed());
            if json {
                print_json_run(&contract, &results, passed)?;
            } else {
                for r in &results {
                    println!("== {}", r.source);
                    print!("{}", r.report.render_summary(sample));
                }
                let ok = results.iter().filter(|r| r.report.passed()).count();
                println!("\n{}/{} documents passed", ok, results.len());
            }
            Ok(exit_code(passed))
        }
        Commands::Check { files, urls, contract, json } => {
            let contract = load_contract(&settings, contract.as_deref())?;
            let pages = load_pages(&settings, &files, urls).await?;
            let audits = audit_pages(pages, &contract);
            let passed = audits.iter().all(PageAudit::passed);
            if json {
                let results: Vec<DocumentResult> =
                    audits.into_iter().flat_map(PageAudit::into_results).collect();
                print_json_run(&contract, &results, passed)?;
            } else {
                for audit in &audits {
                    audit.print(settings.sample_size);
                }
            }
            Ok(exit_code(passed))
        }
        Commands::Crawl { sitemap: sitemap_url, limit, contract } => {
            let contract = load_contract(&settings, contract.as_deref())?;
            let fetcher = Arc::new(Fetcher::new(&settings)?);
            let mut urls = sitemap::fetch_page_urls(&fetcher, &sitemap_url).await?;
            if let Some(n) = limit {
                urls.truncate(n);
            }
            if urls.is_empty() {
                println!("No page URLs in sitemap.");
                return Ok(ExitCode::SUCCESS);
            }

            println!("Checking {} pages against {}...", urls.len(), contract.label());
            let pages = fetcher
                .fetch_all(urls, true)
                .await
                .into_iter()
                .map(Page::from)
                .collect();
            let audits = audit_pages(pages, &contract);
            for audit in audits.iter().filter(|a| !a.passed()) {
                audit.print(settings.sample_size);
            }

            let totals = CrawlTotals::from_audits(&audits);
            totals.print();
            Ok(exit_code(totals.passed()))
        }
        Commands::Contract { contract } => {
            let contract = load_contract(&settings, contract.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&contract.to_definition())?);
            Ok(ExitCode::SUCCESS)
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        info!("Done in {}", format_duration(elapsed));
    }

    result
}

#[derive(Serialize)]
struct RunSummary<'a> {
    generated_at: chrono::DateTime<chrono::Utc>,
    contract: String,
    passed: bool,
    results: &'a [DocumentResult],
}

async fn load_pages(
    settings: &Settings,
    files: &[PathBuf],
    urls: Vec<String>,
) -> Result<Vec<Page>> {
    if files.is_empty() && urls.is_empty() {
        anyhow::bail!("Nothing to read: pass URLs and/or --file PATH");
    }

    let mut pages: Vec<Page> = files.iter().map(|path| Page::from_file(path)).collect();

    if !urls.is_empty() {
        let fetcher = Arc::new(Fetcher::new(settings)?);
        let fetched = fetcher.fetch_all(urls, true).await;
        pages.extend(fetched.into_iter().map(Page::from));
    }
    Ok(pages)
}

fn load_contract(settings: &Settings, flag: Option<&Path>) -> Result<FieldContract> {
    match flag.or(settings.contract_path.as_deref()) {
        Some(path) => FieldContract::from_file(path)
            .with_context(|| format!("Failed to load contract {}", path.display())),
        None => Ok(FieldContract::blog_posting()),
    }
}

fn print_json_run(
    contract: &FieldContract,
    results: &[DocumentResult],
    passed: bool,
) -> Result<()> {
    let summary = RunSummary {
        generated_at: chrono::Utc::now(),
        contract: contract.label(),
        passed,
        results,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible || len < 2 {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

fn exit_code(passed: bool) -> ExitCode {
    if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
