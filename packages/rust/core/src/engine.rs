//! Row enrichment: look up each row's speaker and write the talk fields.

use talkmeta_shared::{Catalog, Talk};
use tracing::debug;

use crate::binder::ColumnIndexMap;
use crate::buffer::BufferRow;
use crate::schema::{DESCRIPTION_MAX_LEN, TITLE_MAX_LEN};

/// Per-run enrichment state: bound positions plus the catalog snapshot.
/// Both stay fixed until the run ends.
#[derive(Debug, Clone)]
pub struct Enricher {
    columns: ColumnIndexMap,
    catalog: Catalog,
}

impl Enricher {
    pub fn new(columns: ColumnIndexMap, catalog: Catalog) -> Self {
        Self { columns, catalog }
    }

    pub fn columns(&self) -> &ColumnIndexMap {
        &self.columns
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Enrich `rows` in place and in order. Returns how many rows matched.
    pub fn process_batch<R: BufferRow>(&self, rows: &mut [R]) -> usize {
        let mut matched = 0;
        for row in rows.iter_mut() {
            if self.process_row(row) {
                matched += 1;
            }
        }
        debug!(rows = rows.len(), matched, "batch enriched");
        matched
    }

    /// Enrich one row. A row without a matching talk, or with a null
    /// speaker, is left untouched and `false` is returned.
    pub fn process_row<R: BufferRow>(&self, row: &mut R) -> bool {
        let Some(talk) = row
            .get_string(self.columns.speaker)
            .and_then(|speaker| self.catalog.find_by_speaker(speaker))
        else {
            return false;
        };

        write_talk(row, &self.columns, talk);
        true
    }
}

fn write_talk<R: BufferRow>(row: &mut R, columns: &ColumnIndexMap, talk: &Talk) {
    row.set_string(columns.title, truncate_chars(&talk.title, TITLE_MAX_LEN));
    row.set_string(
        columns.description,
        truncate_chars(&talk.description, DESCRIPTION_MAX_LEN),
    );
    row.set_timestamp(columns.begin, talk.begin);
    row.set_timestamp(columns.end, talk.end);
}

/// At most `max` characters of `s`.
fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => s[..cut].to_string(),
        None => s.to_string(),
    }
}
