//! Triplet annotation reader
//!
//! Turns the subjects and objects of extracted triplets into mentions located
//! in the report text. A mention that cannot be found in the text is dropped:
//! it can be neither confirmed nor refuted by the gold annotation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use cti_core::{AnnotationDocument, Triplet, TripletRecord};

use crate::span::{find_case_insensitive, normalize_whitespace, Span};

/// Triplet slot a mention was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Subject,
    Object,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Subject, Role::Object];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subject => "subject",
            Self::Object => "object",
        }
    }

    /// Leading letter compared against gold entity types
    pub fn letter(&self) -> char {
        match self {
            Self::Subject => 's',
            Self::Object => 'o',
        }
    }

    fn field<'a>(&self, triplet: &'a Triplet) -> &'a str {
        match self {
            Self::Subject => &triplet.subject,
            Self::Object => &triplet.object,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A mention placed in the report text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedMention {
    pub text: String,
    pub role: Role,
    pub span: Span,
}

/// Resolved mentions grouped by normalized text and role
///
/// Every triplet naming the same text in the same role adds one span to the
/// group; resolution is deterministic so those spans are identical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionIndex {
    groups: BTreeMap<(String, Role), Vec<Span>>,
}

impl MentionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, text: String, role: Role, span: Span) {
        self.groups.entry((text, role)).or_default().push(span);
    }

    /// Spans recorded for a text/role pair
    pub fn spans(&self, text: &str, role: Role) -> &[Span] {
        self.groups
            .get(&(text.to_string(), role))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of distinct text/role groups
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Total number of resolved mentions
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Text, role and spans of each group, in stable order
    pub fn groups(&self) -> impl Iterator<Item = (&str, Role, &[Span])> + '_ {
        self.groups
            .iter()
            .map(|((text, role), spans)| (text.as_str(), *role, spans.as_slice()))
    }

    /// All mentions in stable group order
    pub fn iter(&self) -> impl Iterator<Item = ResolvedMention> + '_ {
        self.groups.iter().flat_map(|((text, role), spans)| {
            spans.iter().map(move |span| ResolvedMention {
                text: text.clone(),
                role: *role,
                span: *span,
            })
        })
    }

    /// All mention spans, ignoring text and role
    pub fn all_spans(&self) -> impl Iterator<Item = &Span> + '_ {
        self.groups.values().flatten()
    }
}

/// Resolve the subject and object of each triplet against `text`
pub fn resolve_mentions<I>(text: &str, triplets: I) -> MentionIndex
where
    I: IntoIterator<Item = Triplet>,
{
    let mut index = MentionIndex::new();

    for triplet in triplets {
        for role in Role::ALL {
            let surface = normalize_whitespace(role.field(&triplet));
            if surface.is_empty() {
                continue;
            }

            match find_case_insensitive(text, &surface) {
                Some(span) => index.insert(surface, role, span),
                None => debug!(mention = %surface, %role, "Mention not found in document text"),
            }
        }
    }

    index
}

/// Decode the document's triplet records and resolve their mentions
pub fn read_mentions(document: &AnnotationDocument) -> MentionIndex {
    let triplets = document.records.iter().filter_map(|record| {
        let decoded = TripletRecord::decode(record);
        if decoded.is_none() {
            debug!(%record, "Skipping undecodable triplet record");
        }
        decoded.map(TripletRecord::into_triplet)
    });

    resolve_mentions(&document.text, triplets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TEXT: &str = "Akira ransomware hit 4LEAF and Park-Rite in August 2017.";

    #[test]
    fn test_resolve_subject_and_object() {
        let index = resolve_mentions(TEXT, vec![Triplet::new("Akira", "hit", "4leaf")]);

        assert_eq!(index.len(), 2);
        assert_eq!(index.spans("Akira", Role::Subject), &[Span::new(0, 5)]);
        assert_eq!(index.spans("4leaf", Role::Object), &[Span::new(21, 26)]);
    }

    #[test]
    fn test_whitespace_is_normalized() {
        let index = resolve_mentions(
            TEXT,
            vec![Triplet::new("  Akira\n  ransomware ", "hit", "Park-Rite")],
        );

        assert_eq!(
            index.spans("Akira ransomware", Role::Subject),
            &[Span::new(0, 16)]
        );
    }

    #[test]
    fn test_unresolvable_and_empty_mentions_dropped() {
        let index = resolve_mentions(TEXT, vec![Triplet::new("LockBit", "hit", "   ")]);
        assert!(index.is_empty());
    }

    #[test]
    fn test_repeated_mentions_collapse_to_same_span() {
        let index = resolve_mentions(
            TEXT,
            vec![
                Triplet::new("Akira", "hit", "4LEAF"),
                Triplet::new("akira", "hit", "Park-Rite"),
                Triplet::new("Akira", "active in", "August 2017"),
            ],
        );

        assert_eq!(
            index.spans("Akira", Role::Subject),
            &[Span::new(0, 5), Span::new(0, 5)]
        );
        assert_eq!(index.spans("akira", Role::Subject), &[Span::new(0, 5)]);
        assert_eq!(index.len(), 6);
        assert_eq!(index.group_count(), 5);

        let groups: Vec<_> = index.groups().collect();
        assert_eq!(groups.len(), 5);
        let akira: &[Span] = &[Span::new(0, 5), Span::new(0, 5)];
        assert!(groups.contains(&("Akira", Role::Subject, akira)));
    }

    #[test]
    fn test_same_text_in_both_roles() {
        let index = resolve_mentions(TEXT, vec![Triplet::new("Akira", "is", "Akira")]);

        assert_eq!(index.group_count(), 2);
        assert_eq!(index.spans("Akira", Role::Object), &[Span::new(0, 5)]);
    }

    #[test]
    fn test_read_mentions_accepts_all_record_shapes() {
        let document = AnnotationDocument::new(
            TEXT,
            vec![
                json!({"subject": "Akira", "relation": "hit", "object": "4LEAF"}),
                json!(r#"{"subject": "Akira ransomware", "relation": "hit", "object": "Park-Rite"}"#),
                json!("Akira|active in|August 2017"),
                json!(17),
                json!({"relation": "orphan"}),
            ],
        );

        let index = read_mentions(&document);

        assert_eq!(index.len(), 6);
        assert_eq!(index.spans("August 2017", Role::Object), &[Span::new(44, 55)]);
    }

    #[test]
    fn test_iter_yields_every_mention() {
        let index = resolve_mentions(TEXT, vec![Triplet::new("Akira", "hit", "4LEAF")]);
        let mentions: Vec<ResolvedMention> = index.iter().collect();

        assert_eq!(mentions.len(), 2);
        assert!(mentions
            .iter()
            .any(|m| m.role == Role::Object && m.span == Span::new(21, 26)));
        assert_eq!(index.all_spans().count(), 2);
    }

    #[test]
    fn test_role_letters() {
        assert_eq!(Role::Subject.letter(), 's');
        assert_eq!(Role::Object.letter(), 'o');
        assert_eq!(Role::Object.to_string(), "object");
    }
}
