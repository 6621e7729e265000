//! Schema negotiation: the columns and setting the talk lookup stage declares.

use talkmeta_shared::{CURRENT_SCHEMA_VERSION, ColumnSpec};
use tracing::debug;

use crate::metadata::{ExternalColumn, OutputColumn, StageMetadata};

/// Property key of the program address, as shown to users.
pub const SOURCE_ADDRESS_PROPERTY: &str = "Website Address";

pub const SPEAKER_COLUMN: &str = "Speaker";
pub const TITLE_COLUMN: &str = "Title";
pub const DESCRIPTION_COLUMN: &str = "Description";
pub const BEGIN_COLUMN: &str = "Begin";
pub const END_COLUMN: &str = "End";

pub const SPEAKER_MAX_LEN: usize = 100;
pub const TITLE_MAX_LEN: usize = 250;
pub const DESCRIPTION_MAX_LEN: usize = 4000;

/// Name given to the stage's single input.
pub const INPUT_NAME: &str = "Input with speakers";

const COMPONENT_DESCRIPTION: &str =
    "Adds title, description, begin and end of a speaker's talk from a conference program.";
const CONTACT_INFO: &str = "TalkMeta maintainers";

/// The one column expected from upstream.
pub fn speaker_spec() -> ColumnSpec {
    ColumnSpec::wide_string(
        SPEAKER_COLUMN,
        "Speaker for which the talk should be looked up",
        SPEAKER_MAX_LEN,
    )
}

/// The four columns added to every row, in declaration order.
pub fn output_specs() -> [ColumnSpec; 4] {
    [
        ColumnSpec::wide_string(TITLE_COLUMN, "The title of the talk.", TITLE_MAX_LEN),
        ColumnSpec::wide_string(
            DESCRIPTION_COLUMN,
            "The description of the talk.",
            DESCRIPTION_MAX_LEN,
        ),
        ColumnSpec::timestamp(BEGIN_COLUMN, "The start time of the talk."),
        ColumnSpec::timestamp(END_COLUMN, "The end time of the talk."),
    ]
}

/// Declare the stage's setting, input and outputs, and stamp the current version.
///
/// Safe to call on an already-defined stage: existing columns keep their
/// identities and an existing website address is left untouched.
pub fn define_schema(meta: &mut StageMetadata) {
    meta.description = COMPONENT_DESCRIPTION.to_string();
    meta.contact_info = CONTACT_INFO.to_string();

    // The address defaults to empty through `StageConfig::default`; nothing
    // to register beyond keeping whatever the user already entered.
    debug!(
        property = SOURCE_ADDRESS_PROPERTY,
        set = !meta.config.source_address.is_empty(),
        "website address property declared"
    );

    init_input_and_output(meta);
    meta.version = CURRENT_SCHEMA_VERSION;
}

/// Declare the Speaker external column and the four synchronous outputs.
pub(crate) fn init_input_and_output(meta: &mut StageMetadata) {
    let input_id = init_input(meta);
    init_output(meta, input_id);
}

fn init_input(meta: &mut StageMetadata) -> u32 {
    if meta.inputs.is_empty() {
        meta.add_input(INPUT_NAME);
    }
    meta.inputs[0].name = INPUT_NAME.to_string();

    let spec = speaker_spec();
    let existing = meta.inputs[0]
        .external_columns
        .iter()
        .position(|c| c.spec.name == spec.name);
    match existing {
        Some(i) => meta.inputs[0].external_columns[i].spec = spec,
        None => {
            let id = meta.allocate_id();
            meta.inputs[0]
                .external_columns
                .push(ExternalColumn { id, spec });
        }
    }

    meta.inputs[0].id
}

fn init_output(meta: &mut StageMetadata, input_id: u32) {
    if meta.outputs.is_empty() {
        meta.add_output("Output");
    }
    meta.outputs[0].synchronous_input_id = Some(input_id);

    for spec in output_specs() {
        let existing = meta.outputs[0]
            .columns
            .iter()
            .position(|c| c.spec.name == spec.name);
        match existing {
            Some(i) => meta.outputs[0].columns[i].spec = spec,
            None => {
                let lineage_id = meta.allocate_id();
                meta.outputs[0].columns.push(OutputColumn { lineage_id, spec });
            }
        }
    }

    // Earlier releases could append a declared column twice; keep the first
    // so its lineage id survives.
    let declared = output_specs().map(|spec| spec.name);
    let mut seen: Vec<String> = Vec::with_capacity(declared.len());
    meta.outputs[0].columns.retain(|c| {
        if !declared.contains(&c.spec.name) {
            return true;
        }
        if seen.contains(&c.spec.name) {
            debug!(
                column = %c.spec.name,
                lineage_id = c.lineage_id,
                "dropping duplicate output column"
            );
            return false;
        }
        seen.push(c.spec.name.clone());
        true
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output_names(meta: &StageMetadata) -> Vec<&str> {
        meta.outputs[0]
            .columns
            .iter()
            .map(|c| c.spec.name.as_str())
            .collect()
    }

    #[test]
    fn defines_input_outputs_and_version() {
        let mut meta = StageMetadata::new("lookup");
        define_schema(&mut meta);

        assert_eq!(meta.version, CURRENT_SCHEMA_VERSION);
        assert_eq!(meta.inputs.len(), 1);
        assert_eq!(meta.inputs[0].name, INPUT_NAME);

        let speaker = meta.inputs[0].external_column(SPEAKER_COLUMN).unwrap();
        assert_eq!(speaker.spec.max_len(), Some(100));

        assert_eq!(output_names(&meta), vec!["Title", "Description", "Begin", "End"]);
        let output = &meta.outputs[0];
        assert_eq!(output.synchronous_input_id, Some(meta.inputs[0].id));
        assert_eq!(output.column(TITLE_COLUMN).unwrap().spec.max_len(), Some(250));
        assert_eq!(
            output.column(DESCRIPTION_COLUMN).unwrap().spec.max_len(),
            Some(4000)
        );
        assert!(!meta.description.is_empty());
    }

    #[test]
    fn redefining_is_a_no_op() {
        let mut meta = StageMetadata::new("lookup");
        meta.config.source_address = "https://conf.example.com".into();
        define_schema(&mut meta);
        let once = meta.clone();

        define_schema(&mut meta);
        assert_eq!(meta, once);
        assert_eq!(meta.config.source_address, "https://conf.example.com");
    }

    #[test]
    fn missing_collections_are_recreated() {
        let mut meta = StageMetadata::new("lookup");
        meta.inputs.clear();
        meta.outputs.clear();
        define_schema(&mut meta);

        assert_eq!(meta.inputs.len(), 1);
        assert_eq!(meta.outputs.len(), 1);
        assert_eq!(meta.outputs[0].columns.len(), 4);
    }

    #[test]
    fn duplicate_output_columns_are_collapsed() {
        let mut meta = StageMetadata::new("lookup");
        define_schema(&mut meta);
        let title = meta.outputs[0].column(TITLE_COLUMN).unwrap().lineage_id;
        let lineage_id = meta.allocate_id();
        meta.outputs[0].columns.push(OutputColumn {
            lineage_id,
            spec: ColumnSpec::wide_string(TITLE_COLUMN, "The title of the talk.", TITLE_MAX_LEN),
        });

        define_schema(&mut meta);
        assert_eq!(output_names(&meta), vec!["Title", "Description", "Begin", "End"]);
        assert_eq!(meta.outputs[0].column(TITLE_COLUMN).unwrap().lineage_id, title);
    }

    #[test]
    fn drifted_column_types_are_restored() {
        let mut meta = StageMetadata::new("lookup");
        define_schema(&mut meta);
        let lineage = meta.outputs[0].columns[0].lineage_id;
        meta.outputs[0].columns[0].spec = ColumnSpec::wide_string(TITLE_COLUMN, "old", 50);

        define_schema(&mut meta);
        let title = meta.outputs[0].column(TITLE_COLUMN).unwrap();
        assert_eq!(title.lineage_id, lineage);
        assert_eq!(title.spec.max_len(), Some(TITLE_MAX_LEN));
    }
}
