//! Configuration-edit port.
//!
//! A UI shows the current website address and hands back either an edited
//! value or a cancellation. The CLI prompt and the TUI dialog both implement
//! [`AddressEditor`].

use talkmeta_shared::Result;
use tracing::info;

use crate::metadata::StageMetadata;

/// What the user did with the address dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Accepted(String),
    Cancelled,
}

/// A UI that can edit the website address.
pub trait AddressEditor {
    /// Present `current` and wait for the user's decision.
    fn edit_address(&mut self, current: &str) -> Result<EditOutcome>;
}

/// Run `editor` against the stage's address.
///
/// An accepted value replaces the address; a cancellation leaves the stage
/// untouched. Returns whether the stage changed. Persisting the stage is the
/// caller's job.
pub fn edit_source_address(meta: &mut StageMetadata, editor: &mut dyn AddressEditor) -> Result<bool> {
    match editor.edit_address(&meta.config.source_address)? {
        EditOutcome::Accepted(address) => {
            let changed = address != meta.config.source_address;
            meta.config.source_address = address;
            info!(stage = %meta.name, changed, "website address accepted");
            Ok(changed)
        }
        EditOutcome::Cancelled => {
            info!(stage = %meta.name, "website address edit cancelled");
            Ok(false)
        }
    }
}
