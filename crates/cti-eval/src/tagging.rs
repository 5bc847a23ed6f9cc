//! Tag sequence parser
//!
//! Reads gold annotations in the token-per-line format used by the CTI
//! datasets:
//!
//! ```text
//! Ford B_Veh
//! Fiesta E_Veh
//! was O
//!
//! Akira S-Att
//! ```
//!
//! Tags are `PREFIX[-_]TYPE` with `PREFIX` one of `B`, `I`, `E`, `S`, `O`.
//! Blank lines separate paragraphs and no entity crosses them. The parser
//! groups tokens into entities in document order; it does not track offsets.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use cti_core::{CtiError, Result};

/// Entity assembled from a run of gold tokens
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GoldEntity {
    /// Tokens joined by a single space
    pub text: String,
    /// Type suffix of the opening tag, e.g. `Veh` or `AP_M_1`
    pub entity_type: String,
}

impl GoldEntity {
    pub fn new(text: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            entity_type: entity_type.into(),
        }
    }
}

/// Position marker of a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagPrefix {
    Begin,
    Inside,
    End,
    Single,
    /// `O` and any unrecognised prefix
    Outside,
}

/// A parsed tag such as `B_Veh`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub prefix: TagPrefix,
    pub entity_type: String,
}

impl Tag {
    /// Parse a raw tag, treating `-` and `_` as the same separator
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.replace('-', "_");

        let prefix = match normalized.chars().next() {
            Some('B') => TagPrefix::Begin,
            Some('I') => TagPrefix::Inside,
            Some('E') => TagPrefix::End,
            Some('S') => TagPrefix::Single,
            _ => TagPrefix::Outside,
        };

        // Everything after the first separator keeps compound types intact
        let entity_type = match normalized.split_once('_') {
            Some((_, rest)) => rest.to_string(),
            None => normalized.chars().skip(2).collect(),
        };

        Self {
            prefix,
            entity_type,
        }
    }
}

/// Entity being assembled
#[derive(Debug)]
struct PendingEntity {
    tokens: Vec<String>,
    entity_type: String,
    /// Opened by `S` and not extended since
    single: bool,
}

impl PendingEntity {
    fn into_entity(self) -> GoldEntity {
        GoldEntity::new(self.tokens.join(" "), self.entity_type)
    }
}

/// Streaming state machine over tagged lines
#[derive(Debug, Default)]
pub struct TagParser {
    entities: Vec<GoldEntity>,
    pending: Option<PendingEntity>,
    discarded: usize,
}

impl TagParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line of the tagged file
    pub fn feed_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            self.flush();
            return;
        }

        let Some((token, raw_tag)) = line.split_once(char::is_whitespace) else {
            debug!(line, "Tagged line without a tag");
            self.reject();
            return;
        };

        let tag = Tag::parse(raw_tag.trim());
        match tag.prefix {
            TagPrefix::Begin | TagPrefix::Single => {
                self.flush();
                self.pending = Some(PendingEntity {
                    tokens: vec![token.to_string()],
                    entity_type: tag.entity_type,
                    single: tag.prefix == TagPrefix::Single,
                });
            }
            TagPrefix::Inside | TagPrefix::End if self.has_open_type() => {
                if let Some(pending) = self.pending.as_mut() {
                    pending.tokens.push(token.to_string());
                    pending.single = false;
                }
                if tag.prefix == TagPrefix::End {
                    self.flush();
                }
            }
            _ => self.reject(),
        }
    }

    /// Number of malformed spans dropped so far
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Flush any pending entity and return all entities in document order
    pub fn finish(mut self) -> Vec<GoldEntity> {
        self.flush();
        self.entities
    }

    fn has_open_type(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|p| !p.entity_type.is_empty())
    }

    fn flush(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.entities.push(pending.into_entity());
        }
    }

    /// Outside tag or malformed continuation
    ///
    /// A lone `S` entity is already complete and is kept; an unterminated
    /// multi-token run is dropped.
    fn reject(&mut self) {
        match self.pending.take() {
            Some(pending) if pending.single => self.entities.push(pending.into_entity()),
            Some(pending) => {
                debug!(
                    tokens = ?pending.tokens,
                    entity_type = %pending.entity_type,
                    "Dropping unterminated entity"
                );
                self.discarded += 1;
            }
            None => {}
        }
    }
}

/// Parse the contents of a tagged file
pub fn parse_tagged(content: &str) -> Vec<GoldEntity> {
    let mut parser = TagParser::new();
    for line in content.lines() {
        parser.feed_line(line);
    }
    parser.finish()
}

/// Read and parse a tagged file
pub fn parse_tagged_file(path: impl AsRef<Path>) -> Result<Vec<GoldEntity>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| CtiError::io(path, e))?;
    Ok(parse_tagged(&content))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(text: &str, entity_type: &str) -> GoldEntity {
        GoldEntity::new(text, entity_type)
    }

    #[test]
    fn test_tag_parse() {
        assert_eq!(
            Tag::parse("B_Veh"),
            Tag {
                prefix: TagPrefix::Begin,
                entity_type: "Veh".to_string()
            }
        );
        assert_eq!(Tag::parse("E-Att").entity_type, "Att");
        assert_eq!(Tag::parse("B-AP-M-1").entity_type, "AP_M_1");
        assert_eq!(Tag::parse("S_AP_M_1").prefix, TagPrefix::Single);
        assert_eq!(Tag::parse("O").prefix, TagPrefix::Outside);
        assert_eq!(Tag::parse("X_Veh").prefix, TagPrefix::Outside);
        // No separator: suffix after the two-character prefix
        assert_eq!(Tag::parse("BxVeh").entity_type, "Veh");
        assert_eq!(Tag::parse("B").entity_type, "");
    }

    #[test]
    fn test_parse_begin_end() {
        let entities = parse_tagged("Ford B_Veh\nFiesta E_Veh\nwas O\nhacked O\n");
        assert_eq!(entities, vec![entity("Ford Fiesta", "Veh")]);
    }

    #[test]
    fn test_parse_mixed_separators() {
        let entities = parse_tagged("Ford B-Veh\nFocus I_Veh\nST E-Veh\n");
        assert_eq!(entities, vec![entity("Ford Focus ST", "Veh")]);
    }

    #[test]
    fn test_parse_single_then_outside() {
        let entities = parse_tagged("Akira S_Att\nencrypted O\nfiles O\n");
        assert_eq!(entities, vec![entity("Akira", "Att")]);
    }

    #[test]
    fn test_parse_consecutive_singles() {
        let entities = parse_tagged("Akira S_Att\nLockBit S_Att\n");
        assert_eq!(
            entities,
            vec![entity("Akira", "Att"), entity("LockBit", "Att")]
        );
    }

    #[test]
    fn test_begin_flushes_pending() {
        // An unterminated B run is emitted when the next entity opens
        let entities = parse_tagged("Park B_Vic\nRite I_Vic\nAkira S_Att\n");
        assert_eq!(
            entities,
            vec![entity("Park Rite", "Vic"), entity("Akira", "Att")]
        );
    }

    #[test]
    fn test_blank_line_flushes_pending() {
        let entities = parse_tagged("Park B_Vic\nRite I_Vic\n\nAkira B_Att\n");
        assert_eq!(
            entities,
            vec![entity("Park Rite", "Vic"), entity("Akira", "Att")]
        );
    }

    #[test]
    fn test_paragraphs_never_merge() {
        let entities = parse_tagged("Ford B_Veh\n\nFiesta E_Veh\n");
        assert_eq!(entities, vec![entity("Ford", "Veh")]);
    }

    #[test]
    fn test_end_of_input_flushes_pending() {
        let entities = parse_tagged("Family B_Vic\nDay I_Vic\nCare I_Vic");
        assert_eq!(entities, vec![entity("Family Day Care", "Vic")]);
    }

    #[test]
    fn test_lone_continuation_contributes_nothing() {
        assert!(parse_tagged("Fiesta I_Veh\nhacked E_Veh\n").is_empty());
    }

    #[test]
    fn test_outside_discards_unterminated_run() {
        let mut parser = TagParser::new();
        for line in ["Ford B_Veh", "Fiesta I_Veh", "was O", "Akira S_Att"] {
            parser.feed_line(line);
        }
        assert_eq!(parser.discarded(), 1);
        assert_eq!(parser.finish(), vec![entity("Akira", "Att")]);
    }

    #[test]
    fn test_line_without_tag_is_malformed() {
        let entities = parse_tagged("Ford B_Veh\nFiesta\nAkira S_Att\n");
        assert_eq!(entities, vec![entity("Akira", "Att")]);
    }

    #[test]
    fn test_continuation_requires_type() {
        // `B` without a type opens nothing that `I`/`E` may extend
        let entities = parse_tagged("Ford B\nFiesta E_Veh\n");
        assert!(entities.is_empty());
    }

    #[test]
    fn test_single_extended_by_continuation() {
        let entities = parse_tagged("Ford S_Veh\nFiesta E_Veh\n");
        assert_eq!(entities, vec![entity("Ford Fiesta", "Veh")]);
    }

    #[test]
    fn test_compound_type() {
        let entities = parse_tagged("brake B_AP_M_1\npedal E_AP_M_1\n");
        assert_eq!(entities, vec![entity("brake pedal", "AP_M_1")]);
    }

    #[test]
    fn test_empty_file() {
        assert!(parse_tagged("").is_empty());
        assert!(parse_tagged("\n   \n\n").is_empty());
    }

    #[test]
    fn test_parse_tagged_file_missing() {
        assert!(matches!(
            parse_tagged_file("/nonexistent/2017-2-1_bio.txt"),
            Err(CtiError::Io { .. })
        ));
    }
}
