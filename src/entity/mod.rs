pub mod aliases;
pub mod extraction;
pub mod negation;
pub mod types;

pub use aliases::{expand, expand_all};
pub use extraction::{
    annotate_side, validate_entities, AnnotationError, EntityAnnotator, PrecomputedAnnotator,
};
pub use negation::{relocate, Relocation, RelocationStats};
pub use types::*;

// Re-exports from crate root
pub use crate::TARGET_ANNOTATION;
pub use crate::TARGET_REWRITE;
