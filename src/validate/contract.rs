//! Field contracts: what a node of a given `@type` must, must not, and how it
//! must look.
//!
//! One versioned table replaces the per-script required-field lists. A custom
//! contract can be loaded from JSON in the same shape as [`ContractDefinition`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ContractError;

static READING_TIME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^PT\d+[MH]$").unwrap());

/// Navigation / cart text that shows up when a page body is scraped wholesale.
pub const BOILERPLATE_MARKERS: &[&str] = &[
    "Sign In My Account",
    "/Cart",
    "Shopping Cart",
    "Skip to content",
    "Add to Cart",
];

#[derive(Debug, Clone)]
pub enum ShapeRule {
    /// Must be an embedded object (not a bare string reference) carrying
    /// `@id`, and `@type == expected_type` when one is given.
    EmbeddedObject { expected_type: Option<String> },
    /// String value must match.
    Pattern(Regex),
    /// String value must not end with `/`.
    NoTrailingSlash,
    /// String value must not contain any of these.
    Denylist(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct FieldContract {
    pub name: String,
    pub version: u32,
    pub target_type: String,
    pub required: Vec<String>,
    /// Required fields that may legitimately be an empty array.
    pub empty_allowed: BTreeSet<String>,
    pub forbidden: Vec<String>,
    pub shape_rules: Vec<(String, ShapeRule)>,
}

impl FieldContract {
    /// Built-in `BlogPosting` table, version 1.
    pub fn blog_posting() -> Self {
        let object = |ty: &str| ShapeRule::EmbeddedObject {
            expected_type: Some(ty.to_string()),
        };

        FieldContract {
            name: "blog-posting".into(),
            version: 1,
            target_type: "BlogPosting".into(),
            required: strings(&[
                "@id",
                "headline",
                "description",
                "url",
                "datePublished",
                "dateModified",
                "author",
                "publisher",
                "image",
                "mainEntityOfPage",
                "isPartOf",
                "inLanguage",
                "wordCount",
                "readingTime",
                "articleBody",
                "keywords",
                "about",
                "mentions",
            ]),
            empty_allowed: ["about", "mentions"].iter().map(|s| s.to_string()).collect(),
            forbidden: strings(&[
                "contentLocation",
                "genre",
                "locationCreated",
                "spatialCoverage",
                "articleSection",
            ]),
            shape_rules: vec![
                ("mainEntityOfPage".into(), object("WebPage")),
                ("isPartOf".into(), object("WebSite")),
                ("image".into(), object("ImageObject")),
                ("readingTime".into(), ShapeRule::Pattern(READING_TIME_RE.clone())),
                ("url".into(), ShapeRule::NoTrailingSlash),
                ("articleBody".into(), ShapeRule::Denylist(strings(BOILERPLATE_MARKERS))),
            ],
        }
    }

    pub fn from_definition(def: ContractDefinition) -> Result<Self, ContractError> {
        if def.target_type.trim().is_empty() {
            return Err(ContractError::NoTarget);
        }

        let mut shape_rules = Vec::with_capacity(def.shapes.len());
        for (field, shape) in def.shapes {
            let rule = match shape {
                ShapeDefinition::EmbeddedObject { expected_type } => {
                    ShapeRule::EmbeddedObject { expected_type }
                }
                ShapeDefinition::Pattern { pattern } => match Regex::new(&pattern) {
                    Ok(re) => ShapeRule::Pattern(re),
                    Err(source) => return Err(ContractError::Pattern { field, source }),
                },
                ShapeDefinition::NoTrailingSlash => ShapeRule::NoTrailingSlash,
                ShapeDefinition::Denylist { substrings } => ShapeRule::Denylist(substrings),
            };
            shape_rules.push((field, rule));
        }

        Ok(FieldContract {
            name: def.name,
            version: def.version,
            target_type: def.target_type,
            required: def.required.into_iter().unique().collect(),
            empty_allowed: def.empty_allowed,
            forbidden: def.forbidden.into_iter().unique().collect(),
            shape_rules,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ContractError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ContractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let def: ContractDefinition = serde_json::from_str(&raw)?;
        Self::from_definition(def)
    }

    pub fn to_definition(&self) -> ContractDefinition {
        let shapes = self
            .shape_rules
            .iter()
            .map(|(field, rule)| {
                let shape = match rule {
                    ShapeRule::EmbeddedObject { expected_type } => ShapeDefinition::EmbeddedObject {
                        expected_type: expected_type.clone(),
                    },
                    ShapeRule::Pattern(re) => ShapeDefinition::Pattern {
                        pattern: re.as_str().to_string(),
                    },
                    ShapeRule::NoTrailingSlash => ShapeDefinition::NoTrailingSlash,
                    ShapeRule::Denylist(s) => ShapeDefinition::Denylist {
                        substrings: s.clone(),
                    },
                };
                (field.clone(), shape)
            })
            .collect();

        ContractDefinition {
            name: self.name.clone(),
            version: self.version,
            target_type: self.target_type.clone(),
            required: self.required.clone(),
            empty_allowed: self.empty_allowed.clone(),
            forbidden: self.forbidden.clone(),
            shapes,
        }
    }

    pub fn label(&self) -> String {
        format!("{} v{} ({})", self.name, self.version, self.target_type)
    }
}

/// On-disk form of a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDefinition {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub target_type: String,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub empty_allowed: BTreeSet<String>,
    #[serde(default)]
    pub forbidden: Vec<String>,
    #[serde(default)]
    pub shapes: BTreeMap<String, ShapeDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ShapeDefinition {
    EmbeddedObject {
        #[serde(default)]
        expected_type: Option<String>,
    },
    Pattern {
        pattern: String,
    },
    NoTrailingSlash,
    Denylist {
        substrings: Vec<String>,
    },
}

fn default_version() -> u32 {
    1
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn blog_posting_table_is_consistent() {
        let c = FieldContract::blog_posting();
        assert_eq!(c.target_type, "BlogPosting");
        for f in &c.forbidden {
            assert!(!c.required.contains(f), "{} is both required and forbidden", f);
        }
        for f in &c.empty_allowed {
            assert!(c.required.contains(f));
        }
        for (f, _) in &c.shape_rules {
            assert!(c.required.contains(f), "shape rule on non-required {}", f);
        }
    }

    #[test]
    fn definition_survives_a_trip_through_json() {
        let c = FieldContract::blog_posting();
        let json = serde_json::to_string(&c.to_definition()).unwrap();
        let back: ContractDefinition = serde_json::from_str(&json).unwrap();
        let rebuilt = FieldContract::from_definition(back.clone()).unwrap();
        assert_eq!(rebuilt.to_definition(), back);
        assert_eq!(rebuilt.required, c.required);
    }

    #[test]
    fn loads_custom_contract_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{
                "name": "image-object",
                "target_type": "ImageObject",
                "required": ["@id", "url", "url", "width"],
                "forbidden": ["thumbnail"],
                "shapes": {{ "url": {{ "rule": "pattern", "pattern": "^https://" }} }}
            }}"#
        )
        .unwrap();

        let c = FieldContract::from_file(f.path()).unwrap();
        assert_eq!(c.version, 1);
        assert_eq!(c.required, vec!["@id", "url", "width"]);
        assert!(c.empty_allowed.is_empty());
        assert!(matches!(c.shape_rules[0].1, ShapeRule::Pattern(_)));
    }

    #[test]
    fn bad_pattern_is_a_load_error() {
        let def = ContractDefinition {
            name: "x".into(),
            version: 1,
            target_type: "Thing".into(),
            required: vec![],
            empty_allowed: BTreeSet::new(),
            forbidden: vec![],
            shapes: BTreeMap::from([(
                "name".to_string(),
                ShapeDefinition::Pattern { pattern: "(".into() },
            )]),
        };
        match FieldContract::from_definition(def) {
            Err(ContractError::Pattern { field, .. }) => assert_eq!(field, "name"),
            other => panic!("expected pattern error, got {:?}", other.map(|c| c.name)),
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = FieldContract::from_file(Path::new("tests/fixtures/nope.json")).unwrap_err();
        assert!(matches!(err, ContractError::Io { .. }));
    }
}
