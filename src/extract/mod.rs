pub mod repair;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

pub use repair::repair_json;

// Non-greedy body so sequential blocks stay separate.
static LD_SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?is)<script\b[^>]*?\stype\s*=\s*"#,
        r#"(?:"application/ld\+json"|'application/ld\+json')"#,
        r#"[^>]*>(.*?)</script>"#,
    ))
    .unwrap()
});

/// One `<script type="application/ld+json">` payload that parsed.
#[derive(Debug, Clone, Serialize)]
pub struct StructuredDataBlock {
    pub raw_text: String,
    pub parsed: Value,
    /// Only parsed after trailing commas were stripped.
    pub repaired: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    pub scripts_found: usize,
    pub parsed: usize,
    pub repaired: usize,
    pub skipped: usize,
}

/// Best-effort scan of `html` for JSON-LD blocks, in document order.
///
/// Empty blocks and blocks that fail both the direct and the repaired parse
/// are dropped without error.
pub fn extract_json_ld(html: &str) -> Vec<StructuredDataBlock> {
    extract_with_stats(html).0
}

/// Same as [`extract_json_ld`], plus counts telling "no scripts" apart from
/// "scripts that could not be parsed".
pub fn extract_with_stats(html: &str) -> (Vec<StructuredDataBlock>, ExtractionStats) {
    let mut stats = ExtractionStats::default();
    let mut blocks = Vec::new();

    for caps in LD_SCRIPT_RE.captures_iter(html) {
        stats.scripts_found += 1;
        let raw = caps[1].trim();
        if raw.is_empty() {
            stats.skipped += 1;
            continue;
        }

        match parse_block(raw) {
            Some((parsed, repaired)) => {
                stats.parsed += 1;
                if repaired {
                    stats.repaired += 1;
                }
                blocks.push(StructuredDataBlock {
                    raw_text: raw.to_string(),
                    parsed,
                    repaired,
                });
            }
            None => {
                stats.skipped += 1;
                debug!(
                    index = stats.scripts_found - 1,
                    len = raw.len(),
                    "skipping unparsable JSON-LD block"
                );
            }
        }
    }

    (blocks, stats)
}

fn parse_block(raw: &str) -> Option<(Value, bool)> {
    if let Ok(v) = serde_json::from_str::<Value>(raw) {
        return Some((v, false));
    }
    let fixed = repair_json(raw);
    serde_json::from_str::<Value>(&fixed).ok().map(|v| (v, true))
}
