//! Backlinks - automatic links from names in prose to the entities they name.
//!
//! Resolution works in four steps:
//! 1. **Extract**: collect capitalized word runs from the text as candidates
//! 2. **Confirm**: ask the entity store, in one batched query, which exist
//! 3. **Match**: build one alternation pattern over the confirmed names
//! 4. **Split**: cut the text on that pattern, wrapping each match as a link

mod candidates;

pub use candidates::extract_candidates;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use saga_model::{Entity, EntityId, ProjectId, Result};

use crate::store::EntityStore;

/// Longest sub-run, in words, looked up from inside a capitalized run.
/// The whole run is always looked up as well.
pub const DEFAULT_MAX_NAME_WORDS: usize = 6;

/// Navigation target for an entity link.
pub fn entity_href(id: EntityId) -> String {
    format!("/world-forge?entity={}", id)
}

/// A piece of resolved text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TextSpan {
    /// Text left as-is.
    Text { text: String },
    /// An exact occurrence of an entity name.
    Link {
        text: String,
        #[serde(rename = "entityId")]
        entity_id: EntityId,
    },
}

impl TextSpan {
    pub fn text(&self) -> &str {
        match self {
            TextSpan::Text { text } | TextSpan::Link { text, .. } => text,
        }
    }
}

/// Text split into plain and linked spans, in original order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedText {
    pub spans: Vec<TextSpan>,
}

impl LinkedText {
    /// Wrap text with no links.
    pub fn plain(text: &str) -> Self {
        let spans = if text.is_empty() {
            Vec::new()
        } else {
            vec![TextSpan::Text {
                text: text.to_string(),
            }]
        };
        Self { spans }
    }

    /// All linked spans as `(text, entity)` pairs.
    pub fn links(&self) -> impl Iterator<Item = (&str, EntityId)> + '_ {
        self.spans.iter().filter_map(|span| match span {
            TextSpan::Link { text, entity_id } => Some((text.as_str(), *entity_id)),
            TextSpan::Text { .. } => None,
        })
    }

    /// The original text with links removed.
    pub fn to_plain_string(&self) -> String {
        self.spans.iter().map(TextSpan::text).collect()
    }

    /// Render as Markdown, with each link pointing at [`entity_href`].
    pub fn to_markdown(&self) -> String {
        self.spans
            .iter()
            .map(|span| match span {
                TextSpan::Text { text } => text.clone(),
                TextSpan::Link { text, entity_id } => {
                    format!("[{}]({})", text, entity_href(*entity_id))
                }
            })
            .collect()
    }
}

/// Resolves entity names in free text.
#[derive(Debug, Clone)]
pub struct BacklinkResolver {
    candidate_pattern: Regex,
    max_name_words: usize,
}

impl Default for BacklinkResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl BacklinkResolver {
    pub fn new() -> Self {
        Self::with_max_name_words(DEFAULT_MAX_NAME_WORDS)
    }

    pub fn with_max_name_words(max_name_words: usize) -> Self {
        Self {
            candidate_pattern: candidates::capitalized_run_pattern(),
            max_name_words: max_name_words.max(1),
        }
    }

    /// Candidate names found in `text`.
    pub fn candidates(&self, text: &str) -> Vec<String> {
        extract_candidates(&self.candidate_pattern, text, self.max_name_words)
    }

    /// Resolve `text` against the entities of `project`.
    ///
    /// Issues at most one `find_by_names` query.
    pub fn resolve(
        &self,
        store: &dyn EntityStore,
        project: ProjectId,
        text: &str,
    ) -> Result<LinkedText> {
        let candidates = self.candidates(text);
        if candidates.is_empty() {
            return Ok(LinkedText::plain(text));
        }

        let entities = store.find_by_names(project, &candidates)?;
        debug!(
            %project,
            candidates = candidates.len(),
            matched = entities.len(),
            "Resolved backlink candidates"
        );
        Ok(self.link(text, &entities))
    }

    /// Link every whole-word occurrence of an entity name in `text`.
    ///
    /// When several entities share a name, the first one in `entities` wins.
    /// Longer names are preferred where names overlap.
    pub fn link(&self, text: &str, entities: &[Entity]) -> LinkedText {
        let mut targets: HashMap<&str, EntityId> = HashMap::new();
        for entity in entities.iter().filter(|e| !e.name.trim().is_empty()) {
            targets.entry(entity.name.as_str()).or_insert(entity.id);
        }
        if targets.is_empty() {
            return LinkedText::plain(text);
        }

        let mut names: Vec<&str> = targets.keys().copied().collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let alternation = names
            .iter()
            .map(|name| regex::escape(name))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = match Regex::new(&format!(r"\b(?:{})\b", alternation)) {
            Ok(pattern) => pattern,
            Err(e) => {
                warn!(error = %e, names = names.len(), "Could not build backlink pattern");
                return LinkedText::plain(text);
            }
        };

        let mut spans = Vec::new();
        let mut cursor = 0;
        for found in pattern.find_iter(text) {
            let Some(entity_id) = targets.get(found.as_str()) else {
                continue;
            };
            if found.start() > cursor {
                spans.push(TextSpan::Text {
                    text: text[cursor..found.start()].to_string(),
                });
            }
            spans.push(TextSpan::Link {
                text: found.as_str().to_string(),
                entity_id: *entity_id,
            });
            cursor = found.end();
        }
        if cursor < text.len() {
            spans.push(TextSpan::Text {
                text: text[cursor..].to_string(),
            });
        }

        LinkedText { spans }
    }
}
