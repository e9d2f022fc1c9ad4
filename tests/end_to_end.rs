use ldaudit::validate::{Category, FindingKind};
use ldaudit::{extract_json_ld, validate_value, FieldContract, JsonLdGraph, ValidationReport};
use serde_json::Value;

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

fn check_json(name: &str) -> ValidationReport {
    let doc: Value = serde_json::from_str(&fixture(name)).unwrap();
    validate_value(&doc, &FieldContract::blog_posting())
}

#[test]
fn scraped_post_with_genre_fails_once() {
    let blocks = extract_json_ld(&fixture("blog_post.html"));
    assert_eq!(blocks.len(), 1);
    assert!(!blocks[0].repaired);

    let report = validate_value(&blocks[0].parsed, &FieldContract::blog_posting());
    assert_eq!(report.error_count, 1);
    assert_eq!(report.warning_count, 0);
    let f = &report.findings[0];
    assert_eq!(f.category, Category::Forbidden);
    assert_eq!(f.field.as_deref(), Some("genre"));
    assert_eq!(f.node_index, Some(3));
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn repaired_block_still_validates() {
    let html = fixture("blog_post.html").replace(r#""mentions": [],"#, r#""mentions": [ , ],"#);
    let blocks = extract_json_ld(&html);
    assert_eq!(blocks.len(), 1);
    assert!(blocks[0].repaired);
    let report = validate_value(&blocks[0].parsed, &FieldContract::blog_posting());
    assert_eq!(report.error_count, 1);
}

#[test]
fn clean_graph_passes() {
    let report = check_json("graph_clean.json");
    assert!(report.passed(), "{}", report.render_summary(5));
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn broken_graph_reports_everything() {
    let report = check_json("graph_broken.json");
    assert_eq!(report.warning_count, 0);
    assert_eq!(report.error_count, 7, "{}", report.render_summary(10));

    let count = |c: Category| report.findings.iter().filter(|f| f.category == c).count();
    assert_eq!(count(Category::Normalization), 1);
    assert_eq!(count(Category::Shape), 1);
    assert_eq!(count(Category::Missing), 1);
    assert_eq!(count(Category::Forbidden), 1);
    assert_eq!(count(Category::Pollution), 1);
    assert_eq!(count(Category::Duplicate), 1);
    assert_eq!(count(Category::Format), 1);

    let dup = report
        .findings
        .iter()
        .find(|f| f.category == Category::Duplicate)
        .unwrap();
    assert_eq!(dup.node_index, Some(3));

    let summary = report.render_summary(5);
    assert!(summary.contains("[error] legacy/invalid property present: 1"));
    assert!(summary.ends_with("FAIL (7 errors, 0 warnings)\n"));
}

#[test]
fn document_without_graph_is_fatal() {
    let report = check_json("no_graph.json");
    assert!(report.is_fatal());
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].kind, FindingKind::Fatal);
    assert_eq!(report.error_count, 0);
}

#[test]
fn graphs_validate_independently_in_parallel() {
    use rayon::prelude::*;

    let docs: Vec<Value> = ["graph_clean.json", "graph_broken.json", "no_graph.json"]
        .iter()
        .map(|n| serde_json::from_str(&fixture(n)).unwrap())
        .collect();
    let contract = FieldContract::blog_posting();
    let parallel: Vec<ValidationReport> =
        docs.par_iter().map(|d| validate_value(d, &contract)).collect();
    let serial: Vec<ValidationReport> = docs.iter().map(|d| validate_value(d, &contract)).collect();
    assert_eq!(parallel, serial);
}

#[test]
fn typed_graph_entry_point() {
    let doc: Value = serde_json::from_str(&fixture("graph_clean.json")).unwrap();
    let graph = JsonLdGraph::from_value(&doc).unwrap();
    assert_eq!(graph.graph.len(), 3);
    assert!(ldaudit::validate(&graph, &FieldContract::blog_posting()).passed());
}
