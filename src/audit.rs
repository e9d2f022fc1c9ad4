//! Page-level checks shared by the `check`, `crawl` and `validate` commands:
//! extract every block from a page, validate the ones carrying `@graph`, and
//! roll the results up into run totals.

use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;

use crate::extract::{extract_with_stats, ExtractionStats};
use crate::fetch::FetchOutcome;
use crate::validate::{validate_value, FieldContract, Finding, ValidationReport};

/// HTML read from disk or fetched over HTTP.
pub struct Page {
    pub source: String,
    pub html: Result<String, String>,
    /// Set for fetched pages only.
    pub latency_ms: Option<u64>,
}

impl Page {
    pub fn from_file(path: &Path) -> Self {
        Page {
            source: path.display().to_string(),
            html: std::fs::read_to_string(path).map_err(|e| e.to_string()),
            latency_ms: None,
        }
    }
}

impl From<FetchOutcome> for Page {
    fn from(o: FetchOutcome) -> Self {
        Page {
            source: o.url,
            html: o.body.map_err(|e| e.to_string()),
            latency_ms: Some(o.latency_ms),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentResult {
    pub source: String,
    pub report: ValidationReport,
}

/// Per-page result of extract + validate.
#[derive(Debug)]
pub struct PageAudit {
    pub source: String,
    pub fetch_error: Option<String>,
    pub latency_ms: Option<u64>,
    pub stats: ExtractionStats,
    /// (block index, repaired, report) for blocks carrying @graph
    pub reports: Vec<(usize, bool, ValidationReport)>,
    pub without_graph: usize,
}

impl PageAudit {
    pub fn passed(&self) -> bool {
        self.fetch_error.is_none() && self.reports.iter().all(|(_, _, r)| r.passed())
    }

    pub fn print(&self, sample: usize) {
        println!("== {}", self.source);
        if let Some(e) = &self.fetch_error {
            println!("  fetch failed: {}", e);
            return;
        }
        println!(
            "  {} scripts, {} parsed ({} repaired), {} skipped, {} without @graph",
            self.stats.scripts_found,
            self.stats.parsed,
            self.stats.repaired,
            self.stats.skipped,
            self.without_graph
        );
        if self.reports.is_empty() {
            println!("  no @graph block to validate");
        }
        for (i, repaired, report) in &self.reports {
            println!("-- block {}{}", i, if *repaired { " (repaired)" } else { "" });
            print!("{}", report.render_summary(sample));
        }
    }

    /// One result per validated block; a failed fetch becomes a single fatal
    /// result for the page.
    pub fn into_results(self) -> Vec<DocumentResult> {
        if let Some(e) = self.fetch_error {
            return vec![DocumentResult {
                source: self.source,
                report: ValidationReport::from_findings(vec![Finding::fatal(e)]),
            }];
        }
        let source = self.source;
        self.reports
            .into_iter()
            .map(|(i, _, report)| DocumentResult {
                source: format!("{}#block{}", source, i),
                report,
            })
            .collect()
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct CrawlTotals {
    pub pages: usize,
    pub fetch_errors: usize,
    pub blocks: usize,
    pub validated: usize,
    pub failed: usize,
    pub errors: usize,
    pub mean_latency_ms: u64,
    pub slowest_ms: u64,
}

impl CrawlTotals {
    pub fn from_audits(audits: &[PageAudit]) -> Self {
        let mut t = CrawlTotals {
            pages: audits.len(),
            ..Default::default()
        };
        let mut timed = 0u64;
        let mut total_ms = 0u64;
        for a in audits {
            if a.fetch_error.is_some() {
                t.fetch_errors += 1;
            }
            if let Some(ms) = a.latency_ms {
                timed += 1;
                total_ms += ms;
                t.slowest_ms = t.slowest_ms.max(ms);
            }
            t.blocks += a.stats.parsed;
            t.validated += a.reports.len();
            for (_, _, r) in &a.reports {
                t.errors += r.error_count;
                if !r.passed() {
                    t.failed += 1;
                }
            }
        }
        if timed > 0 {
            t.mean_latency_ms = total_ms / timed;
        }
        t
    }

    pub fn passed(&self) -> bool {
        self.failed == 0 && self.fetch_errors == 0
    }

    pub fn print(&self) {
        println!(
            "\n{} pages ({} fetch errors), {} JSON-LD blocks, {} graphs validated, {} failed, \
             {} errors.",
            self.pages, self.fetch_errors, self.blocks, self.validated, self.failed, self.errors,
        );
        println!(
            "Fetch latency: {}ms mean, {}ms slowest",
            self.mean_latency_ms, self.slowest_ms
        );
        println!("{}", if self.passed() { "PASS" } else { "FAIL" });
    }
}

pub fn audit_pages(pages: Vec<Page>, contract: &FieldContract) -> Vec<PageAudit> {
    pages
        .into_par_iter()
        .map(|page| audit_page(page, contract))
        .collect()
}

pub fn audit_page(page: Page, contract: &FieldContract) -> PageAudit {
    let html = match page.html {
        Ok(html) => html,
        Err(e) => {
            return PageAudit {
                source: page.source,
                fetch_error: Some(e),
                latency_ms: page.latency_ms,
                stats: ExtractionStats::default(),
                reports: Vec::new(),
                without_graph: 0,
            }
        }
    };

    let (blocks, stats) = extract_with_stats(&html);
    let mut reports = Vec::new();
    let mut without_graph = 0;
    for (i, block) in blocks.iter().enumerate() {
        if block.parsed.get("@graph").is_some() {
            reports.push((i, block.repaired, validate_value(&block.parsed, contract)));
        } else {
            without_graph += 1;
        }
    }

    PageAudit {
        source: page.source,
        fetch_error: None,
        latency_ms: page.latency_ms,
        stats,
        reports,
        without_graph,
    }
}

/// Unreadable or unparsable files become a fatal report, not a CLI error.
pub fn validate_file(path: &Path, contract: &FieldContract) -> ValidationReport {
    let fatal = |msg: String| ValidationReport::from_findings(vec![Finding::fatal(msg)]);
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => return fatal(format!("cannot read file: {}", e)),
    };
    match serde_json::from_str(&raw) {
        Ok(doc) => validate_value(&doc, contract),
        Err(e) => fatal(format!("invalid JSON: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use std::io::Write;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
    }

    fn html_page(html: String) -> Page {
        Page {
            source: "page.html".into(),
            html: Ok(html),
            latency_ms: None,
        }
    }

    #[test]
    fn validate_file_missing_path_is_fatal() {
        let report = validate_file(
            Path::new("tests/fixtures/nope.json"),
            &FieldContract::blog_posting(),
        );
        assert!(report.is_fatal());
        assert!(!report.passed());
        assert!(report.findings[0].message.starts_with("cannot read file"));
    }

    #[test]
    fn validate_file_invalid_json_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"@graph": [,}}"#).unwrap();
        let report = validate_file(file.path(), &FieldContract::blog_posting());
        assert!(report.is_fatal());
        assert!(report.findings[0].message.starts_with("invalid JSON"));
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn validate_file_clean_fixture_passes() {
        let report = validate_file(
            Path::new("tests/fixtures/graph_clean.json"),
            &FieldContract::blog_posting(),
        );
        assert!(report.passed(), "{}", report.render_summary(5));
    }

    #[test]
    fn audit_page_validates_graph_blocks() {
        let contract = FieldContract::blog_posting();
        let audit = audit_page(html_page(fixture("blog_post.html")), &contract);
        assert!(audit.fetch_error.is_none());
        assert_eq!(audit.stats.parsed, 1);
        assert_eq!(audit.reports.len(), 1);
        assert_eq!(audit.reports[0].2.error_count, 1);
        assert!(!audit.passed());
    }

    #[test]
    fn single_object_block_counted_not_validated() {
        let html = format!(
            "{}<script type=\"application/ld+json\">{{\"@type\":\"Organization\"}}</script>",
            fixture("blog_post.html")
        );
        let audit = audit_page(html_page(html), &FieldContract::blog_posting());
        assert_eq!(audit.stats.parsed, 2);
        assert_eq!(audit.reports.len(), 1);
        assert_eq!(audit.without_graph, 1);
    }

    #[test]
    fn fetch_error_fails_page() {
        let outcome = FetchOutcome {
            url: "https://example.com/gone".into(),
            body: Err(FetchError::Status {
                url: "https://example.com/gone".into(),
                status: 404,
            }),
            latency_ms: 30,
        };
        let audit = audit_page(Page::from(outcome), &FieldContract::blog_posting());
        assert!(!audit.passed());
        assert_eq!(audit.latency_ms, Some(30));

        let results = audit.into_results();
        assert_eq!(results.len(), 1);
        assert!(results[0].report.is_fatal());
    }

    #[test]
    fn totals_count_blocks_failures_and_latency() {
        let contract = FieldContract::blog_posting();
        let mut failing = html_page(fixture("blog_post.html"));
        failing.latency_ms = Some(40);
        let mut empty = html_page("<html></html>".into());
        empty.latency_ms = Some(100);
        let gone = Page {
            source: "https://example.com/gone".into(),
            html: Err("status 404".into()),
            latency_ms: Some(10),
        };

        let audits = audit_pages(vec![failing, empty, gone], &contract);
        let totals = CrawlTotals::from_audits(&audits);
        assert_eq!(
            totals,
            CrawlTotals {
                pages: 3,
                fetch_errors: 1,
                blocks: 1,
                validated: 1,
                failed: 1,
                errors: 1,
                mean_latency_ms: 50,
                slowest_ms: 100,
            }
        );
        assert!(!totals.passed());
    }

    #[test]
    fn totals_pass_without_failures() {
        let contract = FieldContract::blog_posting();
        let audits = audit_pages(vec![html_page("<html></html>".into())], &contract);
        let totals = CrawlTotals::from_audits(&audits);
        assert!(totals.passed());
        assert_eq!(totals.mean_latency_ms, 0);
    }
}
