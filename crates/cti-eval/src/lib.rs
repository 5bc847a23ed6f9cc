//! CTI Eval - Entity annotation alignment and scoring
//!
//! Compares two independently produced views of the entities in a CTI
//! report: a token-tagged gold file (BIO/BIOES) and the subject/object
//! mentions of triplets extracted by a language model. Both sides are placed
//! on the same character offsets of the report text, aligned, and reduced to
//! precision/recall/F1 plus error-category counts.
//!
//! Pipeline, per document pair:
//! 1. [`tagging`] turns the gold file into [`GoldEntity`] values
//! 2. [`annotation`] resolves triplet mentions into spans of the text
//! 3. [`align`] classifies every mention group and gold span
//! 4. [`metrics`] derives per-pair and corpus-wide scores
//!
//! [`batch`] runs the pipeline over a directory of pairs and [`report`]
//! writes the results.

pub mod align;
pub mod annotation;
pub mod batch;
pub mod metrics;
pub mod report;
pub mod span;
pub mod tagging;

pub use align::{
    align, anchor_gold, Alignment, GoldAnchors, GoldSpan, MentionOutcome, OutcomeCategory,
};
pub use annotation::{read_mentions, resolve_mentions, MentionIndex, ResolvedMention, Role};
pub use batch::{
    discover_pairs, evaluate_batch, evaluate_config, evaluate_pair, BatchOutcome, DocumentPair,
    PairReport,
};
pub use metrics::{CorpusMetrics, PairMetrics, ScoreRecord};
pub use report::{write_csv, write_csv_file, EvaluationReport, PairRecord};
pub use span::Span;
pub use tagging::{parse_tagged, parse_tagged_file, GoldEntity, TagParser};

use cti_core::{AnnotationDocument, GoldAnchoring};

/// Score one annotation document against its parsed gold entities
pub fn score_document(
    document: &AnnotationDocument,
    gold: &[GoldEntity],
    anchoring: GoldAnchoring,
) -> PairMetrics {
    let anchors = anchor_gold(&document.text, gold, anchoring);
    let mentions = read_mentions(document);

    align(&anchors, &mentions).metrics()
}
