//! Annotation document model
//!
//! The extraction pipeline writes one JSON document per CTI report. The
//! document carries the original report text and the triplets the model
//! extracted from it. Triplet records arrive in several shapes depending on
//! how the model formatted its answer, so they are kept as raw JSON values
//! here and decoded on demand through [`TripletRecord::decode`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{CtiError, Result};

// ============================================================================
// Triplets
// ============================================================================

/// A (subject, relation, object) fact extracted from text
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triplet {
    pub subject: String,
    #[serde(default)]
    pub relation: String,
    pub object: String,
}

impl Triplet {
    /// Create a new triplet
    pub fn new(
        subject: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            relation: relation.into(),
            object: object.into(),
        }
    }

    /// True when subject, relation and object are all non-blank
    pub fn is_complete(&self) -> bool {
        !self.subject.trim().is_empty()
            && !self.relation.trim().is_empty()
            && !self.object.trim().is_empty()
    }
}

/// A triplet record after shape detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TripletRecord {
    /// Native JSON object with `subject`/`relation`/`object` fields
    Object(Triplet),
    /// JSON object serialized inside a string
    Encoded(Triplet),
    /// `subject|relation|object` fallback string
    Delimited(Triplet),
}

impl TripletRecord {
    /// Decode a raw record, returning `None` when the shape is unusable
    pub fn decode(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) => triplet_from_map(map).map(Self::Object),
            Value::String(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => triplet_from_map(&map).map(Self::Encoded),
                Ok(_) => None,
                Err(_) => Some(Self::Delimited(triplet_from_delimited(raw))),
            },
            _ => None,
        }
    }

    pub fn triplet(&self) -> &Triplet {
        match self {
            Self::Object(t) | Self::Encoded(t) | Self::Delimited(t) => t,
        }
    }

    pub fn into_triplet(self) -> Triplet {
        match self {
            Self::Object(t) | Self::Encoded(t) | Self::Delimited(t) => t,
        }
    }
}

fn triplet_from_map(map: &Map<String, Value>) -> Option<Triplet> {
    let subject = map.get("subject")?.as_str()?;
    let object = map.get("object")?.as_str()?;
    let relation = map.get("relation").and_then(Value::as_str).unwrap_or("");

    Some(Triplet::new(subject, relation, object))
}

fn triplet_from_delimited(raw: &str) -> Triplet {
    let mut parts = raw.splitn(3, '|');
    let subject = parts.next().unwrap_or("");
    let relation = parts.next().unwrap_or("");
    let object = parts.next().unwrap_or("");

    Triplet::new(subject, relation, object)
}

// ============================================================================
// Annotation Document
// ============================================================================

/// A CTI report together with the triplets extracted from it
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationDocument {
    /// Original report text
    pub text: String,
    /// Source link of the report, when recorded
    pub link: Option<String>,
    /// Undecoded triplet records
    pub records: Vec<Value>,
}

impl AnnotationDocument {
    /// Create a document from text and raw triplet records
    pub fn new(text: impl Into<String>, records: Vec<Value>) -> Self {
        Self {
            text: text.into(),
            link: None,
            records,
        }
    }

    /// Parse a document from its JSON representation
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: RawDocument = serde_json::from_str(content)
            .map_err(|e| CtiError::Parse(format!("Invalid annotation document: {e}")))?;
        Ok(raw.into())
    }

    /// Read and parse a document from disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| CtiError::io(path, e))?;

        Self::from_json_str(&content).map_err(|e| match e {
            CtiError::Parse(msg) => CtiError::Parse(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Decoded triplets, skipping records that cannot be decoded
    pub fn triplets(&self) -> impl Iterator<Item = Triplet> + '_ {
        self.records
            .iter()
            .filter_map(TripletRecord::decode)
            .map(TripletRecord::into_triplet)
    }
}

/// On-disk layouts accepted for annotation documents
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDocument {
    Pipeline {
        #[serde(rename = "CTI")]
        cti: CtiSection,
        #[serde(rename = "IE", default)]
        ie: IeSection,
    },
    Flat {
        text: String,
        #[serde(default)]
        triplets: TripletField,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CtiSection {
    Text(String),
    Record {
        text: String,
        #[serde(default)]
        link: Option<String>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct IeSection {
    #[serde(default)]
    triplets: TripletField,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TripletField {
    List(Vec<Value>),
    Nested { triplets: Vec<Value> },
}

impl Default for TripletField {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl From<TripletField> for Vec<Value> {
    fn from(field: TripletField) -> Self {
        match field {
            TripletField::List(records) | TripletField::Nested { triplets: records } => records,
        }
    }
}

impl From<RawDocument> for AnnotationDocument {
    fn from(raw: RawDocument) -> Self {
        match raw {
            RawDocument::Pipeline { cti, ie } => {
                let (text, link) = match cti {
                    CtiSection::Text(text) => (text, None),
                    CtiSection::Record { text, link } => (text, link),
                };
                Self {
                    text,
                    link,
                    records: ie.triplets.into(),
                }
            }
            RawDocument::Flat { text, triplets } => Self {
                text,
                link: None,
                records: triplets.into(),
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_object_record() {
        let record = json!({"subject": "Akira", "relation": "targets", "object": "4LEAF"});
        let decoded = TripletRecord::decode(&record).unwrap();

        assert!(matches!(decoded, TripletRecord::Object(_)));
        assert_eq!(decoded.triplet(), &Triplet::new("Akira", "targets", "4LEAF"));
    }

    #[test]
    fn test_decode_encoded_record() {
        let record = json!(r#"{"subject": "Akira", "relation": "uses", "object": ".akira"}"#);
        let decoded = TripletRecord::decode(&record).unwrap();

        assert!(matches!(decoded, TripletRecord::Encoded(_)));
        assert_eq!(decoded.triplet().object, ".akira");
    }

    #[test]
    fn test_decode_delimited_record() {
        let record = json!("Akira|leaks data on|WordPress sites");
        let decoded = TripletRecord::decode(&record).unwrap();

        assert!(matches!(decoded, TripletRecord::Delimited(_)));
        assert_eq!(
            decoded.into_triplet(),
            Triplet::new("Akira", "leaks data on", "WordPress sites")
        );
    }

    #[test]
    fn test_decode_short_delimited_record() {
        let decoded = TripletRecord::decode(&json!("Akira")).unwrap();
        let triplet = decoded.into_triplet();

        assert_eq!(triplet.subject, "Akira");
        assert!(triplet.relation.is_empty());
        assert!(triplet.object.is_empty());
        assert!(!triplet.is_complete());
    }

    #[test]
    fn test_decode_rejects_unusable_records() {
        assert!(TripletRecord::decode(&json!(42)).is_none());
        assert!(TripletRecord::decode(&json!(null)).is_none());
        assert!(TripletRecord::decode(&json!(["a", "b", "c"])).is_none());
        assert!(TripletRecord::decode(&json!({"subject": "Akira"})).is_none());
        assert!(TripletRecord::decode(&json!({"subject": 1, "object": "x"})).is_none());
        // Valid JSON, but not an object
        assert!(TripletRecord::decode(&json!("[1, 2]")).is_none());
    }

    #[test]
    fn test_missing_relation_defaults_to_empty() {
        let decoded = TripletRecord::decode(&json!({"subject": "a", "object": "b"})).unwrap();
        assert_eq!(decoded.triplet().relation, "");
    }

    #[test]
    fn test_parse_pipeline_document() {
        let content = json!({
            "CTI": {"text": "The Ford Fiesta was hacked.", "link": "https://example.com/a"},
            "IE": {"triplets": [{"subject": "Ford Fiesta", "relation": "was", "object": "hacked"}]}
        })
        .to_string();

        let doc = AnnotationDocument::from_json_str(&content).unwrap();
        assert_eq!(doc.text, "The Ford Fiesta was hacked.");
        assert_eq!(doc.link.as_deref(), Some("https://example.com/a"));
        assert_eq!(doc.triplets().count(), 1);
    }

    #[test]
    fn test_parse_nested_triplets() {
        let content = json!({
            "CTI": {"text": "x"},
            "IE": {"triplets": {"triplets": ["a|b|c", 7]}}
        })
        .to_string();

        let doc = AnnotationDocument::from_json_str(&content).unwrap();
        assert_eq!(doc.records.len(), 2);
        // The numeric record is skipped
        assert_eq!(doc.triplets().count(), 1);
    }

    #[test]
    fn test_parse_flat_document() {
        let content = json!({"text": "report", "triplets": []}).to_string();
        let doc = AnnotationDocument::from_json_str(&content).unwrap();

        assert_eq!(doc.text, "report");
        assert!(doc.records.is_empty());
        assert!(doc.link.is_none());
    }

    #[test]
    fn test_parse_document_without_ie_section() {
        let content = json!({"CTI": "plain report text"}).to_string();
        let doc = AnnotationDocument::from_json_str(&content).unwrap();

        assert_eq!(doc.text, "plain report text");
        assert!(doc.records.is_empty());
    }

    #[test]
    fn test_parse_invalid_document() {
        assert!(matches!(
            AnnotationDocument::from_json_str("{\"triplets\": []}"),
            Err(CtiError::Parse(_))
        ));
        assert!(AnnotationDocument::from_json_str("not json").is_err());
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = AnnotationDocument::from_path("/nonexistent/2017-2-1.json").unwrap_err();
        assert!(matches!(err, CtiError::Io { .. }));
    }

    #[test]
    fn test_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2017-2-1.json");
        std::fs::write(&path, r#"{"text": "report", "triplets": ["a|b|c"]}"#).unwrap();

        let doc = AnnotationDocument::from_path(&path).unwrap();
        assert_eq!(doc.triplets().next(), Some(Triplet::new("a", "b", "c")));
    }
}
