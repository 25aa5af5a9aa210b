//! Boundary to the external entity annotator.
//!
//! The rewriting algorithms trust their entity lists completely: offsets in
//! range and ascending by `start`. Those preconditions are checked here, once,
//! before any criterion reaches the rewriters.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, error, info};

use super::types::Entity;
use super::TARGET_ANNOTATION;
use crate::util::char_len;

/// Produces entity annotations for one criterion string.
///
/// Implementations must return entities ordered by ascending `start`, with
/// character offsets into exactly the string they were given.
pub trait EntityAnnotator {
    fn annotate(&self, criterion: &str) -> Result<Vec<Entity>>;
}

/// Violations of the entity-list preconditions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    /// An entity starts before its predecessor
    UnorderedEntities { index: usize, start: usize, previous_start: usize },
    /// An entity ends before it starts
    InvertedSpan { index: usize, start: usize, end: usize },
    /// An entity ends past the end of the criterion
    SpanOutOfBounds { index: usize, end: usize, text_len: usize },
}

impl fmt::Display for AnnotationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnorderedEntities {
                index,
                start,
                previous_start,
            } => write!(
                f,
                "entity {index} starts at {start}, before the previous entity at {previous_start}"
            ),
            Self::InvertedSpan { index, start, end } => {
                write!(f, "entity {index} ends at {end} before it starts at {start}")
            }
            Self::SpanOutOfBounds {
                index,
                end,
                text_len,
            } => write!(
                f,
                "entity {index} ends at {end}, past the criterion length {text_len}"
            ),
        }
    }
}

impl std::error::Error for AnnotationError {}

/// Checks that `entities` can be used to rewrite `text`.
pub fn validate_entities(text: &str, entities: &[Entity]) -> Result<(), AnnotationError> {
    let text_len = char_len(text);
    let mut previous_start = 0;

    for (index, entity) in entities.iter().enumerate() {
        if entity.end < entity.start {
            return Err(AnnotationError::InvertedSpan {
                index,
                start: entity.start,
                end: entity.end,
            });
        }
        if entity.end > text_len {
            return Err(AnnotationError::SpanOutOfBounds {
                index,
                end: entity.end,
                text_len,
            });
        }
        if index > 0 && entity.start < previous_start {
            return Err(AnnotationError::UnorderedEntities {
                index,
                start: entity.start,
                previous_start,
            });
        }
        previous_start = entity.start;
    }

    Ok(())
}

/// Annotates every criterion of one side, capping aliases at `max_aliases`
/// and validating each list before returning it.
pub fn annotate_side(
    annotator: &dyn EntityAnnotator,
    criteria: &[String],
    max_aliases: usize,
) -> Result<Vec<Vec<Entity>>> {
    criteria
        .iter()
        .map(|criterion| {
            let mut entities = annotator
                .annotate(criterion)
                .with_context(|| format!("Annotation failed for criterion '{}'", criterion))?;

            for entity in entities.iter_mut() {
                entity.cap_aliases(max_aliases);
            }

            if let Err(err) = validate_entities(criterion, &entities) {
                error!(
                    target: TARGET_ANNOTATION,
                    "Rejecting annotations for '{}': {}", criterion, err
                );
                return Err(anyhow::Error::new(err)
                    .context(format!("Invalid annotations for criterion '{}'", criterion)));
            }

            debug!(
                target: TARGET_ANNOTATION,
                "Annotated '{}' with {} entities", criterion, entities.len()
            );
            Ok(entities)
        })
        .collect()
}

/// Serves annotations recorded by an earlier NLP run, keyed by criterion text.
///
/// Criteria that were never annotated get an empty entity list.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedAnnotator {
    annotations: HashMap<String, Vec<Entity>>,
}

impl PrecomputedAnnotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, criterion: &str, entities: Vec<Entity>) {
        self.annotations.insert(criterion.to_string(), entities);
    }

    pub fn with_annotation(mut self, criterion: &str, entities: Vec<Entity>) -> Self {
        self.insert(criterion, entities);
        self
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Loads a JSON object mapping criterion text to its entity list.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json_data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read annotations {}", path.display()))?;
        let annotations: HashMap<String, Vec<Entity>> = serde_json::from_str(&json_data)
            .with_context(|| format!("Failed to parse annotations {}", path.display()))?;

        info!(
            target: TARGET_ANNOTATION,
            "Loaded annotations for {} criteria from {}",
            annotations.len(),
            path.display()
        );
        Ok(Self { annotations })
    }
}

impl EntityAnnotator for PrecomputedAnnotator {
    fn annotate(&self, criterion: &str) -> Result<Vec<Entity>> {
        Ok(self.annotations.get(criterion).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn entity(start: usize, end: usize) -> Entity {
        Entity::new("x", start, end)
    }

    #[test]
    fn test_validate_ok() {
        let text = "unexplained left ventricular hypertrophy";
        assert!(validate_entities(text, &[entity(0, 11), entity(12, 40)]).is_ok());
        assert!(validate_entities(text, &[]).is_ok());
        // Equal starts are allowed
        assert!(validate_entities(text, &[entity(12, 16), entity(12, 40)]).is_ok());
    }

    #[test]
    fn test_validate_unordered() {
        let text = "unexplained left ventricular hypertrophy";
        let err = validate_entities(text, &[entity(12, 40), entity(0, 11)]).unwrap_err();
        assert_eq!(
            err,
            AnnotationError::UnorderedEntities {
                index: 1,
                start: 0,
                previous_start: 12
            }
        );
    }

    #[test]
    fn test_validate_bounds() {
        let text = "Liver fat ≥ 10%";
        assert!(validate_entities(text, &[entity(10, 15)]).is_ok());
        assert_eq!(
            validate_entities(text, &[entity(10, 16)]).unwrap_err(),
            AnnotationError::SpanOutOfBounds {
                index: 0,
                end: 16,
                text_len: 15
            }
        );
        assert!(matches!(
            validate_entities(text, &[entity(5, 3)]),
            Err(AnnotationError::InvertedSpan { .. })
        ));
    }

    #[test]
    fn test_annotate_side_caps_and_validates() {
        let annotator = PrecomputedAnnotator::new()
            .with_annotation(
                "isolated septal hypertrophy",
                vec![Entity::new("septal hypertrophy", 9, 27).with_aliases(&["a", "b", "c"])],
            )
            .with_annotation("pregnant women", vec![entity(9, 99)]);

        let ents = annotate_side(&annotator, &["isolated septal hypertrophy".to_string()], 2)
            .unwrap();
        assert_eq!(ents[0][0].aliases, vec!["a", "b"]);

        let unknown = annotate_side(&annotator, &["children".to_string()], 2).unwrap();
        assert_eq!(unknown, vec![Vec::<Entity>::new()]);

        let err = annotate_side(&annotator, &["pregnant women".to_string()], 2).unwrap_err();
        assert!(err.to_string().contains("Invalid annotations"));
        assert!(err.downcast_ref::<AnnotationError>().is_some());
    }

    #[test]
    fn test_precomputed_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"coagulation disorders": [{{"raw_text": "coagulation disorders", "label": "ENTITY",
                "start": 0, "end": 21, "cui": {{"val": "C0005779", "score": 1.0}},
                "alias_expansion": ["Blood Coagulation Disorders"], "negation": false}}]}}"#
        )
        .unwrap();

        let annotator = PrecomputedAnnotator::from_file(file.path()).unwrap();
        assert_eq!(annotator.len(), 1);
        let ents = annotator.annotate("coagulation disorders").unwrap();
        assert_eq!(ents[0].concept.id, "C0005779");
        assert!(annotator.annotate("pregnant women").unwrap().is_empty());
    }
}
