//! JSON-LD extraction and structured-data validation.
//!
//! [`extract`] pulls `application/ld+json` blocks out of HTML, repairing
//! trailing commas when a block will not parse as-is. [`validate`] checks the
//! nodes of a `@graph` against a [`FieldContract`] and reports every problem
//! it finds.

pub mod audit;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod sitemap;
pub mod validate;

pub use extract::{extract_json_ld, extract_with_stats, ExtractionStats, StructuredDataBlock};
pub use validate::{validate, validate_value, FieldContract, JsonLdGraph, ValidationReport};
