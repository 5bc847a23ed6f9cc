//! Quality Metrics module
//!
//! Per-pair outcome counts with derived precision, recall and F1, and the
//! unweighted corpus-wide means across a batch of pairs.

use serde::{Deserialize, Serialize};

use cti_core::{CtiError, Result};

// ============================================================================
// Pair Metrics
// ============================================================================

/// Outcome counts for one document pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairMetrics {
    /// Mentions whose span equals a gold span
    pub exact_match: usize,
    /// Exact matches whose role disagrees with the gold type
    pub type_mismatch: usize,
    /// Mentions contained in, but not equal to, a gold span
    pub partial_overlap: usize,
    /// Mentions with no gold counterpart (false positives)
    pub extra_mention: usize,
    /// Gold spans no mention falls inside (false negatives)
    pub missing_gold: usize,
}

impl PairMetrics {
    /// Calculate precision (exact / (exact + extra))
    pub fn precision(&self) -> f64 {
        ratio(self.exact_match, self.exact_match + self.extra_mention)
    }

    /// Calculate recall (exact / (exact + missing))
    pub fn recall(&self) -> f64 {
        ratio(self.exact_match, self.exact_match + self.missing_gold)
    }

    /// Calculate F1 score (2 * P * R / (P + R))
    pub fn f1_score(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    /// Mention groups that went through classification
    pub fn classified_groups(&self) -> usize {
        self.exact_match + self.partial_overlap + self.extra_mention
    }

    /// Output record for this pair
    pub fn record(&self) -> ScoreRecord<usize> {
        ScoreRecord {
            precision: self.precision(),
            recall: self.recall(),
            f1: self.f1_score(),
            exact_match_count: self.exact_match,
            extra_mention_count: self.extra_mention,
            missing_gold_count: self.missing_gold,
            partial_overlap_count: self.partial_overlap,
            type_mismatch_count: self.type_mismatch,
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Score record handed to report writers
///
/// Counts are integers for a single pair and means for a corpus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord<C> {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub exact_match_count: C,
    pub extra_mention_count: C,
    pub missing_gold_count: C,
    pub partial_overlap_count: C,
    pub type_mismatch_count: C,
}

// ============================================================================
// Corpus Metrics
// ============================================================================

/// Unweighted means over a batch of pair metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusMetrics {
    pub num_documents: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub exact_match: f64,
    pub extra_mention: f64,
    pub missing_gold: f64,
    pub partial_overlap: f64,
    pub type_mismatch: f64,
}

impl CorpusMetrics {
    /// Average a batch of pair metrics
    ///
    /// Fails with [`CtiError::EmptyBatch`] when there is nothing to average.
    pub fn aggregate<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a PairMetrics>,
    {
        let mut sum = Self::default();

        for pair in pairs {
            sum.num_documents += 1;
            sum.precision += pair.precision();
            sum.recall += pair.recall();
            sum.f1 += pair.f1_score();
            sum.exact_match += pair.exact_match as f64;
            sum.extra_mention += pair.extra_mention as f64;
            sum.missing_gold += pair.missing_gold as f64;
            sum.partial_overlap += pair.partial_overlap as f64;
            sum.type_mismatch += pair.type_mismatch as f64;
        }

        if sum.num_documents == 0 {
            return Err(CtiError::EmptyBatch);
        }

        let n = sum.num_documents as f64;
        Ok(Self {
            num_documents: sum.num_documents,
            precision: sum.precision / n,
            recall: sum.recall / n,
            f1: sum.f1 / n,
            exact_match: sum.exact_match / n,
            extra_mention: sum.extra_mention / n,
            missing_gold: sum.missing_gold / n,
            partial_overlap: sum.partial_overlap / n,
            type_mismatch: sum.type_mismatch / n,
        })
    }

    /// Output record for the batch
    pub fn record(&self) -> ScoreRecord<f64> {
        ScoreRecord {
            precision: self.precision,
            recall: self.recall,
            f1: self.f1,
            exact_match_count: self.exact_match,
            extra_mention_count: self.extra_mention,
            missing_gold_count: self.missing_gold,
            partial_overlap_count: self.partial_overlap,
            type_mismatch_count: self.type_mismatch,
        }
    }

    /// Print a summary report
    pub fn report(&self) -> String {
        format!(
            "=== Entity Alignment Report ===\n\n\
             Documents evaluated: {}\n\n\
             Mean scores:\n\
               Precision: {:.2}%\n\
               Recall:    {:.2}%\n\
               F1 Score:  {:.2}%\n\n\
             Mean counts per document:\n\
               Exact: {:.1} | Extra: {:.1} | Missing: {:.1} | Partial: {:.1} | Type errors: {:.1}\n",
            self.num_documents,
            self.precision * 100.0,
            self.recall * 100.0,
            self.f1 * 100.0,
            self.exact_match,
            self.extra_mention,
            self.missing_gold,
            self.partial_overlap,
            self.type_mismatch,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
