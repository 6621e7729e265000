//! Resolves the stage's columns to buffer positions for one run.

use talkmeta_shared::{Result, TalkMetaError};
use tracing::debug;

use crate::buffer::BufferLayout;
use crate::metadata::StageMetadata;
use crate::schema::{BEGIN_COLUMN, DESCRIPTION_COLUMN, END_COLUMN, SPEAKER_COLUMN, TITLE_COLUMN};

/// Buffer positions of the five columns the engine touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndexMap {
    pub speaker: usize,
    pub title: usize,
    pub description: usize,
    pub begin: usize,
    pub end: usize,
}

/// Look up the mapped Speaker input column and the four output columns in
/// `layout`.
///
/// Validation already guarantees the mapping exists, so a failure here
/// means the host built a layout that disagrees with the stage definition.
pub fn bind_columns(meta: &StageMetadata, layout: &BufferLayout) -> Result<ColumnIndexMap> {
    let input = meta
        .inputs
        .first()
        .ok_or_else(|| TalkMetaError::binding("stage has no input"))?;
    let speaker = input
        .mapped_column(SPEAKER_COLUMN)
        .ok_or_else(|| TalkMetaError::binding("no input column mapped to Speaker"))?;
    let speaker = position(layout, speaker.lineage_id, SPEAKER_COLUMN)?;

    let output = meta
        .outputs
        .first()
        .ok_or_else(|| TalkMetaError::binding("stage has no output"))?;
    let output_position = |name: &str| -> Result<usize> {
        let column = output
            .column(name)
            .ok_or_else(|| TalkMetaError::binding(format!("output column {name} is not declared")))?;
        position(layout, column.lineage_id, name)
    };

    let map = ColumnIndexMap {
        speaker,
        title: output_position(TITLE_COLUMN)?,
        description: output_position(DESCRIPTION_COLUMN)?,
        begin: output_position(BEGIN_COLUMN)?,
        end: output_position(END_COLUMN)?,
    };
    debug!(?map, "columns bound");
    Ok(map)
}

fn position(layout: &BufferLayout, lineage_id: u32, name: &str) -> Result<usize> {
    layout.find_column_by_lineage_id(lineage_id).ok_or_else(|| {
        TalkMetaError::binding(format!(
            "column {name} (lineage {lineage_id}) is not in the buffer"
        ))
    })
}
