//! Batch evaluation over directories of document pairs
//!
//! An annotation document `<stem>.json` is paired with the gold file
//! `<stem><suffix>` (by default `<stem>_bio.txt`). Each pair is scored
//! independently; pairs run on the rayon pool unless sequential execution is
//! requested, and results always come back in pair order.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use cti_core::{AnnotationDocument, CtiError, EvalConfig, GoldAnchoring, Result};

use crate::metrics::PairMetrics;
use crate::score_document;
use crate::tagging::parse_tagged_file;

/// An annotation document and its gold file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPair {
    /// Annotation file name, used as the report key
    pub name: String,
    pub annotation_path: PathBuf,
    pub gold_path: PathBuf,
}

/// Scores for one evaluated pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairReport {
    pub name: String,
    pub metrics: PairMetrics,
}

/// Result of a batch run
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Successfully scored pairs, in input order
    pub reports: Vec<PairReport>,
    /// Pairs that could not be read, with the reason
    pub failures: Vec<(String, CtiError)>,
}

impl BatchOutcome {
    pub fn metrics(&self) -> impl Iterator<Item = &PairMetrics> + '_ {
        self.reports.iter().map(|r| &r.metrics)
    }
}

/// Pair every `*.json` annotation with its gold file, sorted by name
pub fn discover_pairs(
    annotation_dir: &Path,
    gold_dir: &Path,
    gold_suffix: &str,
) -> Result<Vec<DocumentPair>> {
    let entries =
        std::fs::read_dir(annotation_dir).map_err(|e| CtiError::io(annotation_dir, e))?;

    let mut pairs = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| CtiError::io(annotation_dir, e))?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        let (Some(stem), Some(name)) = (
            path.file_stem().and_then(|s| s.to_str()),
            path.file_name().and_then(|s| s.to_str()),
        ) else {
            continue;
        };

        let gold_path = gold_dir.join(format!("{stem}{gold_suffix}"));
        if !gold_path.is_file() {
            warn!(
                annotation = %path.display(),
                gold = %gold_path.display(),
                "No gold file for annotation"
            );
            continue;
        }

        pairs.push(DocumentPair {
            name: name.to_string(),
            annotation_path: path.clone(),
            gold_path,
        });
    }

    pairs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(pairs)
}

/// Read and score one pair
pub fn evaluate_pair(pair: &DocumentPair, anchoring: GoldAnchoring) -> Result<PairReport> {
    let gold = parse_tagged_file(&pair.gold_path)?;
    let document = AnnotationDocument::from_path(&pair.annotation_path)?;

    Ok(PairReport {
        name: pair.name.clone(),
        metrics: score_document(&document, &gold, anchoring),
    })
}

/// Score a batch of pairs
///
/// A pair that fails to load is recorded in `failures` and does not stop
/// the batch.
pub fn evaluate_batch(
    pairs: &[DocumentPair],
    anchoring: GoldAnchoring,
    parallel: bool,
) -> BatchOutcome {
    let results: Vec<Result<PairReport>> = if parallel {
        pairs.par_iter().map(|p| evaluate_pair(p, anchoring)).collect()
    } else {
        pairs.iter().map(|p| evaluate_pair(p, anchoring)).collect()
    };

    let mut outcome = BatchOutcome::default();
    for (pair, result) in pairs.iter().zip(results) {
        match result {
            Ok(report) => outcome.reports.push(report),
            Err(e) => {
                warn!(pair = %pair.name, error = %e, "Skipping document pair");
                outcome.failures.push((pair.name.clone(), e));
            }
        }
    }

    info!(
        evaluated = outcome.reports.len(),
        failed = outcome.failures.len(),
        parallel,
        "Batch evaluation finished"
    );
    outcome
}

/// Discover and score all pairs named by an evaluation config
pub fn evaluate_config(config: &EvalConfig) -> Result<BatchOutcome> {
    let pairs = discover_pairs(&config.annotation_dir, &config.gold_dir, &config.gold_suffix)?;
    info!(
        pairs = pairs.len(),
        annotations = %config.annotation_dir.display(),
        gold = %config.gold_dir.display(),
        "Discovered document pairs"
    );

    Ok(evaluate_batch(&pairs, config.gold_anchoring, config.parallel))
}
