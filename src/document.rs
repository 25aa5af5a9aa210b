//! Document assembly
//!
//! Ties segmentation, annotation and the two rewriters together for one trial
//! document, and fans a batch of documents out over the rayon thread pool.

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{DomainConfig, ProcessorConfig};
use crate::eligibility::EligibilityCriteria;
use crate::entity::{
    annotate_side, expand_all, relocate, Entity, EntityAnnotator, Relocation, RelocationStats,
};
use crate::TARGET_REWRITE;

/// One raw eligibility block as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaInput {
    pub id: String,
    pub criteria: String,
}

impl CriteriaInput {
    pub fn new(id: &str, criteria: &str) -> Self {
        Self {
            id: id.to_string(),
            criteria: criteria.to_string(),
        }
    }
}

/// Both sides after negated spans were moved across.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelocatedCriteria {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub include_entities: Vec<Vec<Entity>>,
    pub exclude_entities: Vec<Vec<Entity>>,
    pub stats: RelocationStats,
}

impl RelocatedCriteria {
    /// Combines the two scan directions: each side keeps what survived its own
    /// scan and receives what the other side moved out.
    pub fn combine(from_include: Relocation, from_exclude: Relocation) -> Self {
        let mut stats = from_include.stats;
        stats.merge(&from_exclude.stats);

        let mut include = from_include.kept;
        include.extend(from_exclude.moved);
        let mut include_entities = from_include.kept_entities;
        include_entities.extend(from_exclude.moved_entities);

        let mut exclude = from_exclude.kept;
        exclude.extend(from_include.moved);
        let mut exclude_entities = from_exclude.kept_entities;
        exclude_entities.extend(from_include.moved_entities);

        Self {
            include,
            exclude,
            include_entities,
            exclude_entities,
            stats,
        }
    }
}

/// Everything derived from one document's eligibility block.
///
/// Entity and rewritten lists stay empty when no annotator was supplied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriteriaDocument {
    pub id: String,
    pub criteria: EligibilityCriteria,
    pub include_entities: Vec<Vec<Entity>>,
    pub exclude_entities: Vec<Vec<Entity>>,
    pub include_aliased: Vec<String>,
    pub exclude_aliased: Vec<String>,
    pub relocated: Option<RelocatedCriteria>,
}

/// Segmentation-only output for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentedDocument {
    pub id: String,
    pub criteria: EligibilityCriteria,
}

impl From<CriteriaDocument> for SegmentedDocument {
    fn from(document: CriteriaDocument) -> Self {
        Self {
            id: document.id,
            criteria: document.criteria,
        }
    }
}

/// Runs the eligibility pipeline with a fixed vocabulary and set of switches.
#[derive(Debug, Clone, Default)]
pub struct CriteriaProcessor {
    pub config: ProcessorConfig,
    pub domain: DomainConfig,
}

impl CriteriaProcessor {
    pub fn new(config: ProcessorConfig, domain: DomainConfig) -> Self {
        Self { config, domain }
    }

    /// Segments, annotates, relocates and expands one eligibility block.
    pub fn process(
        &self,
        id: &str,
        raw: &str,
        annotator: Option<&dyn EntityAnnotator>,
    ) -> Result<CriteriaDocument> {
        let criteria = EligibilityCriteria::from_raw(raw, &self.domain);
        let mut document = CriteriaDocument {
            id: id.to_string(),
            ..Default::default()
        };

        let Some(annotator) = annotator else {
            document.criteria = criteria;
            return Ok(document);
        };

        document.include_entities =
            annotate_side(annotator, &criteria.include, self.config.max_aliases)
                .with_context(|| format!("Failed to annotate inclusion criteria of {}", id))?;
        document.exclude_entities =
            annotate_side(annotator, &criteria.exclude, self.config.max_aliases)
                .with_context(|| format!("Failed to annotate exclusion criteria of {}", id))?;

        if self.config.move_negations {
            let weak_endings = &self.domain.weak_endings;
            let from_include = relocate(&criteria.include, &document.include_entities, weak_endings);
            let from_exclude = relocate(&criteria.exclude, &document.exclude_entities, weak_endings);
            let relocated = RelocatedCriteria::combine(from_include, from_exclude);
            debug!(
                target: TARGET_REWRITE,
                "{}: relocated {} spans across {} criteria",
                id,
                relocated.stats.spans_relocated,
                relocated.stats.criteria_changed
            );
            document.relocated = Some(relocated);
        }

        if self.config.expand {
            let excluded = &self.domain.excluded_terms;
            document.include_aliased =
                expand_all(&criteria.include, &document.include_entities, excluded);
            document.exclude_aliased =
                expand_all(&criteria.exclude, &document.exclude_entities, excluded);
        }

        document.criteria = criteria;
        Ok(document)
    }

    /// Processes independent documents in parallel, preserving input order.
    pub fn process_batch(
        &self,
        inputs: &[CriteriaInput],
        annotator: Option<&(dyn EntityAnnotator + Sync)>,
    ) -> Vec<Result<CriteriaDocument>> {
        let results: Vec<Result<CriteriaDocument>> = inputs
            .par_iter()
            .map(|input| {
                let annotator = annotator.map(|a| a as &dyn EntityAnnotator);
                self.process(&input.id, &input.criteria, annotator)
                    .with_context(|| format!("Failed to process document {}", input.id))
            })
            .collect();

        let failed = results.iter().filter(|r| r.is_err()).count();
        info!("Processed {} documents ({} failed)", results.len(), failed);
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::PrecomputedAnnotator;

    const RAW: &str = "Inclusion Criteria:\n\n  - Adult patients with stable angina without diabetes hypertension and a normal ECG\n\nExclusion Criteria:\n\n  - No anemia or neutropenia\n  - isolated septal hypertrophy";

    const INCLUDE: &str =
        "Adult patients with stable angina without diabetes hypertension and a normal ECG";
    const ANEMIA: &str = "No anemia or neutropenia";
    const SEPTAL: &str = "isolated septal hypertrophy";

    fn find(text: &str, raw: &str) -> Entity {
        Entity::find_in(text, raw, 0).unwrap()
    }

    fn annotator() -> PrecomputedAnnotator {
        PrecomputedAnnotator::new()
            .with_annotation(
                INCLUDE,
                vec![
                    find(INCLUDE, "patients"),
                    find(INCLUDE, "stable angina"),
                    find(INCLUDE, "diabetes").negated(),
                    find(INCLUDE, "hypertension").negated(),
                    find(INCLUDE, "ECG").with_aliases(&["Electrocardiogram", "EKG", "Electrocardiography"]),
                ],
            )
            .with_annotation(
                ANEMIA,
                vec![
                    find(ANEMIA, "anemia").negated(),
                    find(ANEMIA, "neutropenia").negated(),
                ],
            )
            .with_annotation(
                SEPTAL,
                vec![
                    find(SEPTAL, "isolated").with_aliases(&["Isolated", "isolated"]),
                    find(SEPTAL, "septal hypertrophy")
                        .with_aliases(&["septal hypertrophy", "hypertrophy septal"]),
                ],
            )
    }

    #[test]
    fn test_process_without_annotator() {
        let processor = CriteriaProcessor::default();
        let document = processor.process("NCT00000001", RAW, None).unwrap();

        assert_eq!(document.id, "NCT00000001");
        assert_eq!(document.criteria.include, vec![INCLUDE]);
        assert_eq!(document.criteria.exclude, vec![ANEMIA, SEPTAL]);
        assert!(document.include_entities.is_empty());
        assert!(document.include_aliased.is_empty());
        assert!(document.relocated.is_none());
    }

    #[test]
    fn test_process_full_pipeline() {
        let processor = CriteriaProcessor::default();
        let annotator = annotator();
        let document = processor
            .process("NCT00000002", RAW, Some(&annotator))
            .unwrap();

        assert_eq!(document.include_entities[0].len(), 5);
        // Aliases are capped at two per entity
        assert_eq!(document.include_entities[0][4].aliases.len(), 2);

        let relocated = document.relocated.as_ref().unwrap();
        assert_eq!(
            relocated.include,
            vec![
                "Adult patients with stable angina without  and a normal ECG",
                "anemia or neutropenia",
            ]
        );
        assert_eq!(
            relocated.exclude,
            vec![SEPTAL, "without diabetes hypertension"]
        );
        assert_eq!(relocated.include_entities.len(), relocated.include.len());
        assert_eq!(relocated.exclude_entities.len(), relocated.exclude.len());
        assert_eq!(relocated.stats.criteria_changed, 2);
        assert_eq!(relocated.stats.spans_relocated, 2);

        assert_eq!(
            document.include_aliased,
            vec!["Adult patients with stable angina without diabetes hypertension and a normal electrocardiogram ekg ECG"]
        );
        assert_eq!(
            document.exclude_aliased,
            vec![ANEMIA, "isolated hypertrophy septal hypertrophy"]
        );
    }

    #[test]
    fn test_switches() {
        let config = ProcessorConfig {
            expand: false,
            move_negations: false,
            max_aliases: 2,
        };
        let processor = CriteriaProcessor::new(config, DomainConfig::default());
        let document = processor.process("NCT1", RAW, Some(&annotator())).unwrap();
        assert!(document.relocated.is_none());
        assert!(document.include_aliased.is_empty());
        assert_eq!(document.exclude_entities.len(), 2);
    }

    #[test]
    fn test_invalid_annotations_fail() {
        let bad = PrecomputedAnnotator::new().with_annotation(SEPTAL, vec![Entity::new("x", 20, 40)]);
        let processor = CriteriaProcessor::default();
        let err = processor.process("NCT2", RAW, Some(&bad)).unwrap_err();
        assert!(format!("{:#}", err).contains("exclusion criteria of NCT2"));
    }

    #[test]
    fn test_process_batch() {
        let processor = CriteriaProcessor::default();
        let bad = PrecomputedAnnotator::new().with_annotation(SEPTAL, vec![Entity::new("x", 20, 40)]);
        let inputs = vec![
            CriteriaInput::new("NCT3", "Inclusion Criteria:\n\n  - Healthy adults"),
            CriteriaInput::new("NCT4", RAW),
            CriteriaInput::new("NCT5", ""),
        ];

        let results = processor.process_batch(&inputs, Some(&bad));
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().criteria.include, vec!["Healthy adults"]);
        assert!(results[1].is_err());
        assert!(results[2].as_ref().unwrap().criteria.is_empty());

        let results = processor.process_batch(&inputs, None);
        assert!(results.iter().all(|r| r.is_ok()));
    }

    #[test]
    fn test_segmented_documents_keep_ids() {
        let processor = CriteriaProcessor::default();
        let inputs = vec![
            CriteriaInput::new("NCT7", "Inclusion Criteria:\n\n  - Healthy adults"),
            CriteriaInput::new("NCT8", RAW),
        ];
        let segmented: Vec<SegmentedDocument> = processor
            .process_batch(&inputs, None)
            .into_iter()
            .map(|result| SegmentedDocument::from(result.unwrap()))
            .collect();

        assert_eq!(segmented[0].id, "NCT7");
        assert_eq!(segmented[1].id, "NCT8");
        assert_eq!(segmented[1].criteria.exclude, vec![ANEMIA, SEPTAL]);

        let value = serde_json::to_value(&segmented[1]).unwrap();
        assert_eq!(value["id"], "NCT8");
        assert_eq!(value["criteria"]["include"][0], INCLUDE);
    }

    #[test]
    fn test_document_serializes() {
        let processor = CriteriaProcessor::default();
        let document = processor.process("NCT6", RAW, Some(&annotator())).unwrap();
        let value = serde_json::to_value(&document).unwrap();
        assert_eq!(value["criteria"]["exclude"][1], SEPTAL);
        assert_eq!(value["relocated"]["stats"]["spans_relocated"], 2);
    }
}
