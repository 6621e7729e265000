//! Brings stages saved by older releases up to the current schema version.

use talkmeta_shared::CURRENT_SCHEMA_VERSION;
use tracing::{info, warn};

use crate::metadata::StageMetadata;
use crate::schema::init_input_and_output;

/// Upgrade `meta`, which was persisted with `persisted_version`.
///
/// Before version 2 the stage had no output columns; they are declared
/// now. Running the upgrade again changes nothing.
pub fn upgrade(meta: &mut StageMetadata, persisted_version: u32) {
    if persisted_version < CURRENT_SCHEMA_VERSION {
        init_input_and_output(meta);
        info!(
            stage = %meta.name,
            from = persisted_version,
            to = CURRENT_SCHEMA_VERSION,
            "stage upgraded"
        );
    } else if persisted_version > CURRENT_SCHEMA_VERSION {
        warn!(
            stage = %meta.name,
            persisted_version,
            current = CURRENT_SCHEMA_VERSION,
            "stage was saved by a newer release"
        );
    }

    meta.version = CURRENT_SCHEMA_VERSION;
}
