pub mod config;
pub mod document;
pub mod eligibility;
pub mod entity;
pub mod environment;
pub mod logging;
pub mod stats;
pub mod util;

pub const TARGET_SEGMENT: &str = "segment";
pub const TARGET_REWRITE: &str = "rewrite";
pub const TARGET_ANNOTATION: &str = "annotation";

pub use config::{DomainConfig, ProcessorConfig};
pub use document::{
    CriteriaDocument, CriteriaInput, CriteriaProcessor, RelocatedCriteria, SegmentedDocument,
};
pub use eligibility::{segment, CriteriaSegmenter, EligibilityCriteria, SentenceCleaner};
pub use entity::{Concept, Entity, EntityAnnotator, PrecomputedAnnotator};
