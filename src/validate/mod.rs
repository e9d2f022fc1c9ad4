pub mod contract;
pub mod graph;
pub mod report;

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::debug;

pub use contract::{FieldContract, ShapeRule};
pub use graph::JsonLdGraph;
pub use report::{Category, Finding, FindingKind, ValidationReport};

use graph::{has_type, kind_of, node_label, SCHEMA_ORG};

/// Check every node of the contract's target type. Collects all problems;
/// nothing stops early.
pub fn validate(graph: &JsonLdGraph, contract: &FieldContract) -> ValidationReport {
    let mut findings = Vec::new();

    let targets: Vec<(usize, &Value)> = graph
        .graph
        .iter()
        .enumerate()
        .filter(|(_, n)| has_type(n, &contract.target_type))
        .collect();

    // Nothing to check: the no-target warning is the whole report.
    if targets.is_empty() {
        findings.push(Finding::warning(
            Category::NoTargets,
            format!("no nodes of type {}", contract.target_type),
        ));
        return ValidationReport::from_findings(findings);
    }

    if !graph.context_is_schema_org() {
        findings.push(Finding::warning(
            Category::Context,
            format!("@context is {:?}, expected {:?}", graph.context, SCHEMA_ORG),
        ));
    }

    for &(index, node) in &targets {
        let label = node_label(node, index);
        debug!(index, node = %label, "checking node");
        let missing = check_required(node, index, &label, contract, &mut findings);
        check_forbidden(node, index, &label, contract, &mut findings);
        for (field, rule) in &contract.shape_rules {
            if missing.contains(field.as_str()) {
                continue;
            }
            if let Some(value) = node.get(field) {
                if let Some(f) = check_shape(field, value, rule) {
                    findings.push(f.at(index, label.clone()));
                }
            }
        }
    }

    check_unique(&targets, "url", &mut findings);
    check_unique(&targets, "@id", &mut findings);

    ValidationReport::from_findings(findings)
}

/// Validate a raw JSON document. A document that is not a `@graph` yields a
/// single fatal finding and nothing else.
pub fn validate_value(doc: &Value, contract: &FieldContract) -> ValidationReport {
    match JsonLdGraph::from_value(doc) {
        Ok(graph) => validate(&graph, contract),
        Err(e) => ValidationReport::from_findings(vec![Finding::fatal(e.to_string())]),
    }
}

/// Returns the fields reported, so later rules do not count them again.
fn check_required<'c>(
    node: &Value,
    index: usize,
    label: &str,
    contract: &'c FieldContract,
    findings: &mut Vec<Finding>,
) -> HashSet<&'c str> {
    let mut missing = HashSet::new();
    for field in &contract.required {
        let allow_empty_array = contract.empty_allowed.contains(field);
        if !is_filled(node.get(field), allow_empty_array) {
            findings.push(
                Finding::error(Category::Missing, format!("{} is missing or empty", field))
                    .at(index, label)
                    .on(field),
            );
            missing.insert(field.as_str());
        }
    }
    missing
}

fn check_forbidden(
    node: &Value,
    index: usize,
    label: &str,
    contract: &FieldContract,
    findings: &mut Vec<Finding>,
) {
    for field in &contract.forbidden {
        if node.get(field).is_some() {
            findings.push(
                Finding::error(Category::Forbidden, format!("{} must not be present", field))
                    .at(index, label)
                    .on(field),
            );
        }
    }
}

fn is_filled(value: Option<&Value>, allow_empty_array: bool) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(a)) => allow_empty_array || !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(_) => true,
    }
}

/// At most one finding per field.
fn check_shape(field: &str, value: &Value, rule: &ShapeRule) -> Option<Finding> {
    let err = |category, msg: String| Some(Finding::error(category, msg).on(field));

    match rule {
        ShapeRule::EmbeddedObject { expected_type } => {
            let problem = match value {
                Value::Array(items) => items.iter().enumerate().find_map(|(i, v)| {
                    object_problem(v, expected_type.as_deref()).map(|p| format!("[{}] {}", i, p))
                }),
                v => object_problem(v, expected_type.as_deref()),
            }?;
            err(Category::Shape, format!("{} {}", field, problem))
        }
        ShapeRule::Pattern(re) => match value.as_str() {
            Some(s) if re.is_match(s) => None,
            Some(s) => err(
                Category::Format,
                format!("{} {:?} does not match {}", field, s, re.as_str()),
            ),
            None => err(
                Category::Format,
                format!("{} is {}, expected a string", field, kind_of(value)),
            ),
        },
        ShapeRule::NoTrailingSlash => match value.as_str() {
            Some(s) if s.ends_with('/') => {
                err(Category::Normalization, format!("{} {:?} ends with '/'", field, s))
            }
            Some(_) => None,
            None => err(
                Category::Normalization,
                format!("{} is {}, expected a string", field, kind_of(value)),
            ),
        },
        ShapeRule::Denylist(markers) => {
            let text = value.as_str()?;
            let hits: Vec<&str> = markers
                .iter()
                .filter(|m| text.contains(m.as_str()))
                .map(String::as_str)
                .collect();
            if hits.is_empty() {
                None
            } else {
                err(Category::Pollution, format!("{} contains {:?}", field, hits))
            }
        }
    }
}

fn object_problem(value: &Value, expected_type: Option<&str>) -> Option<String> {
    let obj = match value {
        Value::Object(o) => o,
        Value::String(_) => return Some("is a bare string, expected an embedded object".into()),
        v => return Some(format!("is {}, expected an embedded object", kind_of(v))),
    };

    let has_id = obj
        .get("@id")
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty());
    if !has_id {
        return Some("has no @id".into());
    }

    let ty = expected_type?;
    if has_type(value, ty) {
        None
    } else {
        let found = obj.get("@type").map(|t| t.to_string()).unwrap_or_else(|| "none".into());
        Some(format!("@type is {}, expected {:?}", found, ty))
    }
}

/// First occurrence of a value wins; every later one is an error.
fn check_unique(targets: &[(usize, &Value)], key: &str, findings: &mut Vec<Finding>) {
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    for &(index, node) in targets {
        let Some(value) = node.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()) else {
            continue;
        };
        match first_seen.get(value) {
            Some(&first) => findings.push(
                Finding::error(
                    Category::Duplicate,
                    format!("{} {:?} already used by node #{}", key, value, first),
                )
                .at(index, node_label(node, index))
                .on(key),
            ),
            None => {
                first_seen.insert(value, index);
            }
        }
    }
}
