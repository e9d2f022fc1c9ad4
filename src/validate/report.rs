use std::fmt::{self, Write};

use itertools::Itertools;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingKind {
    Error,
    Warning,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Structure,
    Context,
    NoTargets,
    Missing,
    Forbidden,
    Shape,
    Format,
    Normalization,
    Pollution,
    Duplicate,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Structure => "invalid document structure",
            Category::Context => "unexpected @context",
            Category::NoTargets => "no target nodes",
            Category::Missing => "missing or empty required field",
            Category::Forbidden => "legacy/invalid property present",
            Category::Shape => "wrong embedded-object shape",
            Category::Format => "bad value format",
            Category::Normalization => "unnormalized value",
            Category::Pollution => "boilerplate in body text",
            Category::Duplicate => "duplicate url/@id",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub node_index: Option<usize>,
    pub node_ref: Option<String>,
    pub field: Option<String>,
    pub kind: FindingKind,
    pub category: Category,
    pub message: String,
}

impl Finding {
    pub fn error(category: Category, message: impl Into<String>) -> Self {
        Finding {
            node_index: None,
            node_ref: None,
            field: None,
            kind: FindingKind::Error,
            category,
            message: message.into(),
        }
    }

    pub fn warning(category: Category, message: impl Into<String>) -> Self {
        Finding {
            kind: FindingKind::Warning,
            ..Finding::error(category, message)
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Finding {
            kind: FindingKind::Fatal,
            ..Finding::error(Category::Structure, message)
        }
    }

    pub fn at(mut self, index: usize, node_ref: impl Into<String>) -> Self {
        self.node_index = Some(index);
        self.node_ref = Some(node_ref.into());
        self
    }

    pub fn on(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// Outcome of one validation run. Counts always match `findings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub error_count: usize,
    pub warning_count: usize,
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn from_findings(findings: Vec<Finding>) -> Self {
        let error_count = findings.iter().filter(|f| f.kind == FindingKind::Error).count();
        let warning_count = findings.iter().filter(|f| f.kind == FindingKind::Warning).count();
        ValidationReport {
            error_count,
            warning_count,
            findings,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.findings.iter().any(|f| f.kind == FindingKind::Fatal)
    }

    pub fn passed(&self) -> bool {
        self.error_count == 0 && !self.is_fatal()
    }

    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            0
        } else {
            1
        }
    }

    pub fn errors_for(&self, field: &str) -> Vec<&Finding> {
        self.findings
            .iter()
            .filter(|f| f.kind == FindingKind::Error && f.field.as_deref() == Some(field))
            .collect()
    }

    /// Human summary: per category a total and the first `sample` offending
    /// nodes, then a PASS/FAIL line.
    pub fn render_summary(&self, sample: usize) -> String {
        let mut out = String::new();

        if let Some(fatal) = self.findings.iter().find(|f| f.kind == FindingKind::Fatal) {
            let _ = writeln!(out, "FATAL: {}", fatal.message);
        }

        let groups = self
            .findings
            .iter()
            .filter(|f| f.kind != FindingKind::Fatal)
            .into_group_map_by(|f| (f.category, f.kind));

        for ((category, kind), items) in groups.into_iter().sorted_by_key(|(k, _)| *k) {
            let tag = match kind {
                FindingKind::Warning => "warning",
                _ => "error",
            };
            let _ = writeln!(out, "[{}] {}: {}", tag, category, items.len());
            for f in items.iter().take(sample) {
                let node = f.node_ref.as_deref().unwrap_or("-");
                match &f.field {
                    Some(field) => {
                        let _ = writeln!(out, "    {} ({}): {}", node, field, f.message);
                    }
                    None => {
                        let _ = writeln!(out, "    {}: {}", node, f.message);
                    }
                }
            }
            if items.len() > sample {
                let _ = writeln!(out, "    ... and {} more", items.len() - sample);
            }
        }

        let _ = writeln!(
            out,
            "{} ({} errors, {} warnings)",
            if self.passed() { "PASS" } else { "FAIL" },
            self.error_count,
            self.warning_count
        );
        out
    }
}
