//! Core domain types for TalkMeta stages and conference catalogs.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current schema version of the persisted stage definition.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

// ---------------------------------------------------------------------------
// StageId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for stage identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageId(pub Uuid);

impl StageId {
    /// Generate a new time-sortable stage identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for StageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for StageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Column specs
// ---------------------------------------------------------------------------

/// Data type of a declared column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataType {
    /// Unicode string with a maximum length in characters.
    WideString { max_len: usize },
    /// Date and time without zone.
    Timestamp,
}

/// A declared column: its logical name, a human description, and its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub description: String,
    pub data_type: DataType,
}

impl ColumnSpec {
    /// Declare a wide-string column.
    pub fn wide_string(name: &str, description: &str, max_len: usize) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            data_type: DataType::WideString { max_len },
        }
    }

    /// Declare a timestamp column.
    pub fn timestamp(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            data_type: DataType::Timestamp,
        }
    }

    /// Maximum length in characters, for string columns.
    pub fn max_len(&self) -> Option<usize> {
        match self.data_type {
            DataType::WideString { max_len } => Some(max_len),
            DataType::Timestamp => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Talk / Catalog
// ---------------------------------------------------------------------------

/// A single entry of a conference program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Talk {
    /// Everyone presenting the talk, in program order.
    pub speaker_names: Vec<String>,
    pub title: String,
    pub description: String,
    pub begin: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Talk {
    /// Whether `speaker` occurs inside any of this talk's speaker names.
    ///
    /// Case-sensitive substring containment, so a partial name such as a
    /// first name alone still matches.
    pub fn has_speaker(&self, speaker: &str) -> bool {
        self.speaker_names.iter().any(|name| name.contains(speaker))
    }
}

/// Ordered, read-only collection of talks built once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    talks: Vec<Talk>,
}

impl Catalog {
    pub fn new(talks: Vec<Talk>) -> Self {
        Self { talks }
    }

    /// Talks in program order.
    pub fn talks(&self) -> &[Talk] {
        &self.talks
    }

    pub fn len(&self) -> usize {
        self.talks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.talks.is_empty()
    }

    /// First talk in catalog order presented by `speaker` (see [`Talk::has_speaker`]).
    pub fn find_by_speaker(&self, speaker: &str) -> Option<&Talk> {
        self.talks.iter().find(|talk| talk.has_speaker(speaker))
    }
}

impl From<Vec<Talk>> for Catalog {
    fn from(talks: Vec<Talk>) -> Self {
        Self::new(talks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 14)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn talk(title: &str, speakers: &[&str]) -> Talk {
        Talk {
            speaker_names: speakers.iter().map(|s| s.to_string()).collect(),
            title: title.into(),
            description: String::new(),
            begin: at(10, 0),
            end: at(10, 45),
        }
    }

    #[test]
    fn stage_id_roundtrip() {
        let id = StageId::new();
        let parsed: StageId = id.to_string().parse().expect("parse StageId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn speaker_match_is_substring_and_case_sensitive() {
        let t = talk("Ownership", &["Jane Doe", "Max Mustermann"]);
        assert!(t.has_speaker("Jane"));
        assert!(t.has_speaker("Mustermann"));
        assert!(!t.has_speaker("jane"));
        assert!(!t.has_speaker("Jane Doe Jr."));
    }

    #[test]
    fn find_by_speaker_prefers_catalog_order() {
        let catalog = Catalog::new(vec![
            talk("First", &["Anna Schmidt"]),
            talk("Second", &["Anna Schmidt", "Bob"]),
        ]);
        assert_eq!(catalog.find_by_speaker("Anna").unwrap().title, "First");
        assert_eq!(catalog.find_by_speaker("Bob").unwrap().title, "Second");
        assert!(catalog.find_by_speaker("Carol").is_none());
    }

    #[test]
    fn column_spec_serialization() {
        let spec = ColumnSpec::wide_string("Title", "The title of the talk.", 250);
        let json = serde_json::to_string(&spec).expect("serialize");
        assert!(json.contains(r#""kind":"wide_string""#));
        let parsed: ColumnSpec = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, spec);
        assert_eq!(parsed.max_len(), Some(250));
        assert_eq!(ColumnSpec::timestamp("Begin", "start").max_len(), None);
    }
}
