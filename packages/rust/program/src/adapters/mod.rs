//! Program layout trait and built-in layouts for talk extraction.
//!
//! Layouts detect how a program page marks up its talks (schema.org
//! microdata, plain CSS classes) and pull out the raw fields of each entry.

mod generic;
mod schema_org;

use scraper::{ElementRef, Html};
use talkmeta_shared::{Result, TalkMetaError, Talk};
use tracing::{debug, warn};

use crate::time::{parse_time_range, parse_timestamp};

pub use generic::GenericLayout;
pub use schema_org::SchemaOrgLayout;

// ---------------------------------------------------------------------------
// TalkEntry
// ---------------------------------------------------------------------------

/// Raw fields of one program entry, before validation.
#[derive(Debug, Clone, Default)]
pub struct TalkEntry {
    pub title: Option<String>,
    pub speakers: Vec<String>,
    pub description: String,
    pub begin: Option<String>,
    pub end: Option<String>,
    /// Combined `date HH:MM - HH:MM` text, used when begin/end are absent.
    pub time_range: Option<String>,
}

impl TalkEntry {
    /// Validate the raw fields and build a [`Talk`].
    pub fn into_talk(self) -> Result<Talk> {
        let title = self
            .title
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TalkMetaError::parse("program entry has no title"))?;

        let times = match (&self.begin, &self.end) {
            (Some(begin), Some(end)) => parse_timestamp(begin).zip(parse_timestamp(end)),
            _ => self.time_range.as_deref().and_then(parse_time_range),
        };
        let (begin, end) = times.ok_or_else(|| {
            TalkMetaError::parse(format!("talk '{title}' has missing or unreadable times"))
        })?;

        Ok(Talk {
            speaker_names: self.speakers,
            title,
            description: self.description,
            begin,
            end,
        })
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Trait for layout-specific talk extraction.
///
/// Layouts are tried in priority order; `GenericLayout` is the always-last fallback.
pub trait ProgramLayout: Send + Sync {
    /// Returns `true` if this layout should handle the document.
    fn detect(&self, doc: &Html) -> bool;

    /// Extract every program entry, in document order.
    fn extract_entries(&self, doc: &Html) -> Vec<TalkEntry>;

    /// Human-readable layout name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds registered layouts in priority order.
pub struct LayoutRegistry {
    layouts: Vec<Box<dyn ProgramLayout>>,
}

impl LayoutRegistry {
    /// Create a registry with all built-in layouts (specific first, generic last).
    pub fn new() -> Self {
        Self {
            layouts: vec![Box::new(SchemaOrgLayout), Box::new(GenericLayout)],
        }
    }

    /// Detect the best layout for the given HTML document.
    /// Always returns a layout (GenericLayout is the fallback).
    pub fn detect(&self, doc: &Html) -> &dyn ProgramLayout {
        for layout in &self.layouts {
            if layout.detect(doc) {
                return layout.as_ref();
            }
        }
        // Unreachable: GenericLayout always matches
        unreachable!("GenericLayout must always match");
    }

    /// Parse a program page into talks, keeping document order.
    ///
    /// Entries that cannot be read are skipped with a warning. A page whose
    /// entries are all unreadable is reported as a parse error; a page with
    /// no entries at all yields an empty program.
    pub fn parse_program(&self, html: &str) -> Result<Vec<Talk>> {
        let doc = Html::parse_document(html);
        let layout = self.detect(&doc);
        let entries = layout.extract_entries(&doc);
        let total = entries.len();

        debug!(layout = layout.name(), entries = total, "extracted program entries");

        let mut talks = Vec::with_capacity(total);
        for entry in entries {
            match entry.into_talk() {
                Ok(talk) => talks.push(talk),
                Err(e) => warn!(error = %e, "skipping program entry"),
            }
        }

        if total > 0 && talks.is_empty() {
            return Err(TalkMetaError::parse(format!(
                "none of the {total} program entries could be read"
            )));
        }

        Ok(talks)
    }
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Text content of an element with whitespace runs collapsed.
pub(crate) fn text_of(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a speaker line such as `"Anna & Bob, Carla"` into names.
pub(crate) fn split_speakers(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .flat_map(|part| part.split(" & "))
        .flat_map(|part| part.split(" and "))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}
