//! Span aligner and classifier
//!
//! Gold entities are anchored in the report text with the same search used
//! for system mentions. Each (text, role) mention group is then classified
//! once against the gold spans, walking its spans until one qualifies:
//!
//! - identical span: exact match (and a type mismatch when the role letter
//!   disagrees with the gold type's leading letter)
//! - contained in a gold span: partial overlap
//! - no span qualifies: extra mention
//!
//! A gold span is missing unless some mention span contains it. Candidate
//! gold spans are scanned in document order and the first one that
//! qualifies wins.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use cti_core::GoldAnchoring;

use crate::annotation::{MentionIndex, ResolvedMention, Role};
use crate::metrics::PairMetrics;
use crate::span::{find_case_insensitive, find_case_insensitive_from, normalize_whitespace, Span};
use crate::tagging::GoldEntity;

/// Outcome of aligning one mention or gold span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeCategory {
    ExactMatch,
    TypeMismatch,
    PartialOverlap,
    ExtraMention,
    MissingGold,
}

impl OutcomeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExactMatch => "exact_match",
            Self::TypeMismatch => "type_mismatch",
            Self::PartialOverlap => "partial_overlap",
            Self::ExtraMention => "extra_mention",
            Self::MissingGold => "missing_gold",
        }
    }
}

impl std::fmt::Display for OutcomeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Gold anchoring
// ============================================================================

/// A gold entity placed in the report text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldSpan {
    pub span: Span,
    pub entity_type: String,
}

/// Gold spans of one document, unique by span, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoldAnchors {
    spans: Vec<GoldSpan>,
    index: HashMap<Span, usize>,
    /// Gold entities whose text does not occur in the report
    unresolved: Vec<GoldEntity>,
}

impl GoldAnchors {
    fn push(&mut self, span: Span, entity_type: &str) {
        if self.index.contains_key(&span) {
            return;
        }
        self.index.insert(span, self.spans.len());
        self.spans.push(GoldSpan {
            span,
            entity_type: entity_type.to_string(),
        });
    }

    pub fn spans(&self) -> &[GoldSpan] {
        &self.spans
    }

    pub fn unresolved(&self) -> &[GoldEntity] {
        &self.unresolved
    }

    /// Gold span with exactly this extent
    pub fn get(&self, span: &Span) -> Option<&GoldSpan> {
        self.index.get(span).map(|&idx| &self.spans[idx])
    }

    /// First gold span containing `span`
    pub fn containing(&self, span: &Span) -> Option<&GoldSpan> {
        self.spans.iter().find(|gold| gold.span.contains(span))
    }

    /// Anchored spans plus unresolved entities
    pub fn len(&self) -> usize {
        self.spans.len() + self.unresolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Locate gold entities in the report text
pub fn anchor_gold(text: &str, entities: &[GoldEntity], anchoring: GoldAnchoring) -> GoldAnchors {
    let mut anchors = GoldAnchors::default();
    let mut cursor = 0;

    for entity in entities {
        let surface = normalize_whitespace(&entity.text);
        let found = match anchoring {
            GoldAnchoring::FirstMatch => find_case_insensitive(text, &surface),
            GoldAnchoring::Sequential => find_case_insensitive_from(text, &surface, cursor)
                .or_else(|| find_case_insensitive(text, &surface)),
        };

        match found {
            Some(span) => {
                cursor = cursor.max(span.end);
                anchors.push(span, &entity.entity_type);
            }
            None => {
                debug!(entity = %entity.text, "Gold entity not found in document text");
                anchors.unresolved.push(entity.clone());
            }
        }
    }

    anchors
}

// ============================================================================
// Classification
// ============================================================================

/// Classification of one (text, role) mention group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionOutcome {
    /// The group's deciding span, or its first span for an extra mention
    pub mention: ResolvedMention,
    /// `ExactMatch`, `PartialOverlap` or `ExtraMention`
    pub category: OutcomeCategory,
    /// Exact span match whose role disagrees with the gold type
    pub type_mismatch: bool,
}

/// Full alignment of one document pair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alignment {
    pub outcomes: Vec<MentionOutcome>,
    /// Gold spans no mention falls inside
    pub missing: Vec<GoldSpan>,
    /// Gold entities that could not be placed in the text
    pub unresolved: Vec<GoldEntity>,
}

impl Alignment {
    /// Reduce the alignment to category counts
    pub fn metrics(&self) -> PairMetrics {
        let mut metrics = PairMetrics::default();

        for outcome in &self.outcomes {
            match outcome.category {
                OutcomeCategory::ExactMatch => metrics.exact_match += 1,
                OutcomeCategory::PartialOverlap => metrics.partial_overlap += 1,
                OutcomeCategory::ExtraMention => metrics.extra_mention += 1,
                OutcomeCategory::TypeMismatch | OutcomeCategory::MissingGold => {}
            }
            if outcome.type_mismatch {
                metrics.type_mismatch += 1;
            }
        }
        metrics.missing_gold = self.missing.len() + self.unresolved.len();

        metrics
    }
}

/// Align resolved mentions against anchored gold spans
pub fn align(gold: &GoldAnchors, mentions: &MentionIndex) -> Alignment {
    let outcomes = mentions
        .groups()
        .filter_map(|(text, role, spans)| classify_group(gold, text, role, spans))
        .collect();

    let mention_spans: HashSet<&Span> = mentions.all_spans().collect();
    let missing = gold
        .spans()
        .iter()
        .filter(|g| !mention_spans.iter().any(|m| m.contains(&g.span)))
        .cloned()
        .collect();

    Alignment {
        outcomes,
        missing,
        unresolved: gold.unresolved().to_vec(),
    }
}

fn classify_group(
    gold: &GoldAnchors,
    text: &str,
    role: Role,
    spans: &[Span],
) -> Option<MentionOutcome> {
    let mention = |span: Span| ResolvedMention {
        text: text.to_string(),
        role,
        span,
    };

    for &span in spans {
        if let Some(exact) = gold.get(&span) {
            return Some(MentionOutcome {
                mention: mention(span),
                category: OutcomeCategory::ExactMatch,
                type_mismatch: !role_matches_type(role, &exact.entity_type),
            });
        }
        if gold.containing(&span).is_some() {
            return Some(MentionOutcome {
                mention: mention(span),
                category: OutcomeCategory::PartialOverlap,
                type_mismatch: false,
            });
        }
    }

    spans.first().map(|&span| MentionOutcome {
        mention: mention(span),
        category: OutcomeCategory::ExtraMention,
        type_mismatch: false,
    })
}

/// Case-insensitive comparison of the role letter with the type's first letter
fn role_matches_type(role: Role, entity_type: &str) -> bool {
    entity_type
        .chars()
        .next()
        .is_some_and(|c| c.to_lowercase().eq(std::iter::once(role.letter())))
}
